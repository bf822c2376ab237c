use crate::protocol::{Environment, Headers, QuasiBody};

/// Well-known request methods.
pub mod method {
    pub const CONNECT: &str = "CONNECT";
    pub const DELETE: &str = "DELETE";
    pub const GET: &str = "GET";
    pub const HEAD: &str = "HEAD";
    pub const OPTIONS: &str = "OPTIONS";
    pub const PATCH: &str = "PATCH";
    pub const POST: &str = "POST";
    pub const PUT: &str = "PUT";
    pub const TRACE: &str = "TRACE";
}

/// A quasi-HTTP request.
///
/// `http_version` is informational only; nothing in the exchange depends on it.
#[derive(Debug, Default)]
pub struct QuasiRequest {
    pub method: String,
    pub target: String,
    pub http_version: Option<String>,
    pub headers: Headers,
    pub body: Option<QuasiBody>,
    /// Environment of the connection the request arrived on, empty on the sending side.
    pub environment: Environment,
}

impl QuasiRequest {
    pub fn new<M: Into<String>, T: Into<String>>(method: M, target: T) -> Self {
        Self { method: method.into(), target: target.into(), ..Default::default() }
    }

    /// Appends a header value, keeping any values already present under `name`.
    pub fn header<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn body(mut self, body: QuasiBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn http_version<V: Into<String>>(mut self, http_version: V) -> Self {
        self.http_version = Some(http_version.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_values_append_in_order() {
        let request = QuasiRequest::new(method::GET, "/").header("Accept", "a").header("Accept", "b").header("X", "1");
        assert_eq!(request.headers.get("Accept"), Some(&vec!["a".to_string(), "b".to_string()]));
        assert_eq!(request.headers.len(), 2);
    }
}
