//! The server-side collaborator that turns requests into responses.
//!
//! Implement [`Application`] directly, or wrap an async function with
//! [`make_application`]:
//!
//! ```
//! use std::convert::Infallible;
//! use quasi_http::application::make_application;
//! use quasi_http::protocol::{QuasiBody, QuasiRequest, QuasiResponse, status};
//!
//! async fn hello(_request: QuasiRequest) -> Result<QuasiResponse, Infallible> {
//!     Ok(QuasiResponse::new(status::OK).body(QuasiBody::from_bytes("hello")))
//! }
//!
//! let application = make_application(hello);
//! ```

use std::error::Error;

use async_trait::async_trait;

use crate::protocol::{QuasiRequest, QuasiResponse};

#[async_trait]
pub trait Application: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    /// Produces the response for `request`.
    ///
    /// `Ok(None)` means no response could be produced, which fails the exchange.
    async fn process_request(&self, request: QuasiRequest) -> Result<Option<QuasiResponse>, Self::Error>;
}

#[derive(Debug)]
pub struct ApplicationFn<F> {
    f: F,
}

#[async_trait]
impl<F, Fut, Resp, Err> Application for ApplicationFn<F>
where
    F: Fn(QuasiRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Resp, Err>> + Send,
    Resp: Into<Option<QuasiResponse>>,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    type Error = Err;

    async fn process_request(&self, request: QuasiRequest) -> Result<Option<QuasiResponse>, Self::Error> {
        (self.f)(request).await.map(Into::into)
    }
}

/// Builds an [`Application`] from an async function returning either a
/// [`QuasiResponse`] or an `Option<QuasiResponse>`.
pub fn make_application<F, Fut, Resp, Err>(f: F) -> ApplicationFn<F>
where
    F: Fn(QuasiRequest) -> Fut,
    Fut: Future<Output = Result<Resp, Err>>,
    Resp: Into<Option<QuasiResponse>>,
    Err: Into<Box<dyn Error + Send + Sync>>,
{
    ApplicationFn { f }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::status;

    async fn echo_target(request: QuasiRequest) -> Result<QuasiResponse, String> {
        Ok(QuasiResponse::new(status::OK).status_message(request.target))
    }

    async fn silent(_request: QuasiRequest) -> Result<Option<QuasiResponse>, String> {
        Ok(None)
    }

    #[tokio::test]
    async fn test_function_application() {
        let application = make_application(echo_target);
        let response = application.process_request(QuasiRequest::new("GET", "/a")).await.unwrap().unwrap();
        assert_eq!(response.status_code, 200);
        assert_eq!(response.status_message.as_deref(), Some("/a"));

        let application = make_application(silent);
        assert!(application.process_request(QuasiRequest::new("GET", "/")).await.unwrap().is_none());
    }
}
