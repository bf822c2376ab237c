use tokio_util::sync::CancellationToken;

use crate::protocol::{Environment, Headers, QuasiBody};

/// Well-known status codes.
pub mod status {
    pub const OK: i32 = 200;
    pub const BAD_REQUEST: i32 = 400;
    pub const UNAUTHORIZED: i32 = 401;
    pub const FORBIDDEN: i32 = 403;
    pub const NOT_FOUND: i32 = 404;
    pub const METHOD_NOT_ALLOWED: i32 = 405;
    pub const PAYLOAD_TOO_LARGE: i32 = 413;
    pub const URI_TOO_LONG: i32 = 414;
    pub const UNSUPPORTED_MEDIA_TYPE: i32 = 415;
    pub const UNPROCESSABLE_ENTITY: i32 = 422;
    pub const TOO_MANY_REQUESTS: i32 = 429;
    pub const INTERNAL_SERVER_ERROR: i32 = 500;
}

/// A quasi-HTTP response.
#[derive(Debug, Default)]
pub struct QuasiResponse {
    pub status_code: i32,
    pub status_message: Option<String>,
    pub http_version: Option<String>,
    pub headers: Headers,
    pub body: Option<QuasiBody>,
    /// Environment of the connection the response arrived on, empty on the sending side.
    pub environment: Environment,
    cancellation: Option<CancellationToken>,
}

impl QuasiResponse {
    pub fn new(status_code: i32) -> Self {
        Self { status_code, ..Default::default() }
    }

    pub fn status_message<S: Into<String>>(mut self, status_message: S) -> Self {
        self.status_message = Some(status_message.into());
        self
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

    pub(crate) fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.cancellation = Some(cancellation);
        self
    }

    /// Ends any in-flight read of a streamed body.
    ///
    /// Pending and later reads report end-of-data instead of an error. The
    /// underlying connection is released and its stream closed even when no
    /// read is in flight. A no-op for buffered bodies.
    pub fn cancel(&self) {
        if let Some(cancellation) = &self.cancellation {
            cancellation.cancel();
        }
    }
}
