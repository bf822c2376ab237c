use std::error::Error;
use std::io;
use thiserror::Error;

use crate::connection::ConnectionRole;

/// Coarse classification of a [`QuasiHttpError`], stable across variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    General,
    ProtocolViolation,
    Timeout,
    MessageLengthLimitExceeded,
    Configuration,
}

#[derive(Debug, Error)]
pub enum QuasiHttpError {
    #[error("protocol violation: {source}")]
    Codec {
        #[from]
        source: CodecError,
    },

    #[error("{message}")]
    Timeout { message: &'static str },

    #[error("message length limit exceeded: {reason}")]
    LengthLimitExceeded { reason: String },

    #[error("no response")]
    NoResponse,

    #[error("missing dependency: {name} must be set")]
    MissingDependency { name: &'static str },

    #[error("connection already released")]
    ConnectionReleased,

    #[error("processing error: {source}")]
    Processing { source: Box<dyn Error + Send + Sync> },
}

impl QuasiHttpError {
    pub fn timeout(role: ConnectionRole) -> Self {
        let message = match role {
            ConnectionRole::Client => "send timeout",
            ConnectionRole::Server => "receive timeout",
        };
        Self::Timeout { message }
    }

    pub fn length_limit_exceeded<S: ToString>(str: S) -> Self {
        Self::LengthLimitExceeded { reason: str.to_string() }
    }

    pub fn missing_dependency(name: &'static str) -> Self {
        Self::MissingDependency { name }
    }

    /// Wraps a foreign error as a processing error.
    ///
    /// Errors that already are a `QuasiHttpError` come back unchanged, so a
    /// failure never gets wrapped twice on its way up.
    pub fn processing<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        match e.into().downcast::<QuasiHttpError>() {
            Ok(typed) => *typed,
            Err(other) => match other.downcast::<CodecError>() {
                Ok(codec) => Self::Codec { source: *codec },
                Err(other) => Self::Processing { source: other },
            },
        }
    }

    pub fn reason(&self) -> ErrorReason {
        match self {
            Self::Codec { .. } | Self::NoResponse | Self::ConnectionReleased => ErrorReason::ProtocolViolation,
            Self::Timeout { .. } => ErrorReason::Timeout,
            Self::LengthLimitExceeded { .. } => ErrorReason::MessageLengthLimitExceeded,
            Self::MissingDependency { .. } => ErrorReason::Configuration,
            Self::Processing { .. } => ErrorReason::General,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.reason() == ErrorReason::Timeout
    }
}

/// Body adapters speak `io::Error`; anything they smuggled through is recovered here.
impl From<io::Error> for QuasiHttpError {
    fn from(e: io::Error) -> Self {
        let carries_typed = e.get_ref().is_some_and(|inner| inner.is::<CodecError>() || inner.is::<QuasiHttpError>());
        if carries_typed {
            if let Some(inner) = e.into_inner() {
                return Self::processing(inner);
            }
            return Self::Codec { source: CodecError::UnexpectedEof };
        }
        Self::Processing { source: Box::new(e) }
    }
}

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid chunk version: {0}")]
    InvalidVersion(u8),

    #[error("invalid chunk length: {reason}")]
    InvalidChunkLength { reason: String },

    #[error("headers size too large, current: {current_size} exceed the limit {max_size}")]
    HeadersTooLarge { current_size: usize, max_size: usize },

    #[error("invalid lead chunk: {reason}")]
    InvalidLeadChunk { reason: String },

    #[error("invalid csv: {reason}")]
    InvalidCsv { reason: String },

    #[error("content length not satisfied, expected {expected} bytes but received {received}")]
    ContentLengthNotSatisfied { expected: u64, received: u64 },

    #[error("unexpected end of read")]
    UnexpectedEof,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl CodecError {
    pub fn headers_too_large(current_size: usize, max_size: usize) -> Self {
        Self::HeadersTooLarge { current_size, max_size }
    }

    pub fn invalid_chunk_length<S: ToString>(str: S) -> Self {
        Self::InvalidChunkLength { reason: str.to_string() }
    }

    pub fn invalid_lead_chunk<S: ToString>(str: S) -> Self {
        Self::InvalidLeadChunk { reason: str.to_string() }
    }

    pub fn invalid_csv<S: ToString>(str: S) -> Self {
        Self::InvalidCsv { reason: str.to_string() }
    }

    pub fn content_length_not_satisfied(expected: u64, received: u64) -> Self {
        Self::ContentLengthNotSatisfied { expected, received }
    }
}

impl From<CodecError> for io::Error {
    fn from(e: CodecError) -> Self {
        if let CodecError::Io { source } = e {
            return source;
        }
        let kind = match e {
            CodecError::ContentLengthNotSatisfied { .. } | CodecError::UnexpectedEof => io::ErrorKind::UnexpectedEof,
            _ => io::ErrorKind::InvalidData,
        };
        io::Error::new(kind, e)
    }
}

impl From<QuasiHttpError> for io::Error {
    fn from(e: QuasiHttpError) -> Self {
        let kind = if e.is_timeout() { io::ErrorKind::TimedOut } else { io::ErrorKind::Other };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_does_not_double_wrap() {
        let original = QuasiHttpError::timeout(ConnectionRole::Client);
        let wrapped = QuasiHttpError::processing(original);
        assert!(matches!(wrapped, QuasiHttpError::Timeout { message: "send timeout" }));
    }

    #[test]
    fn test_processing_wraps_foreign_errors() {
        let wrapped = QuasiHttpError::processing("boom");
        assert_eq!(wrapped.reason(), ErrorReason::General);
        assert_eq!(wrapped.to_string(), "processing error: boom");
    }

    #[test]
    fn test_io_error_recovers_codec_error() {
        let io_error: io::Error = CodecError::content_length_not_satisfied(5, 2).into();
        assert_eq!(io_error.kind(), io::ErrorKind::UnexpectedEof);
        let error = QuasiHttpError::from(io_error);
        assert!(matches!(
            error,
            QuasiHttpError::Codec { source: CodecError::ContentLengthNotSatisfied { expected: 5, received: 2 } }
        ));
    }

    #[test]
    fn test_plain_io_error_becomes_processing_error() {
        let error = QuasiHttpError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"));
        assert!(matches!(error, QuasiHttpError::Processing { .. }));
    }

    #[test]
    fn test_timeout_messages_follow_role() {
        assert_eq!(QuasiHttpError::timeout(ConnectionRole::Client).to_string(), "send timeout");
        assert_eq!(QuasiHttpError::timeout(ConnectionRole::Server).to_string(), "receive timeout");
    }
}
