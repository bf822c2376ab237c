//! Core quasi-HTTP protocol abstractions.
//!
//! # Architecture
//!
//! - **Messages** ([`QuasiRequest`], [`QuasiResponse`]): what applications
//!   send and receive, with case-sensitive multi-valued [`Headers`]
//! - **Bodies** ([`QuasiBody`]): a byte source plus its content length and
//!   content type
//! - **Options** ([`ProcessingOptions`]): per-exchange tunables and how
//!   call-site values merge over client defaults
//! - **Errors** ([`QuasiHttpError`], [`CodecError`]): the error taxonomy
//!   shared by every layer

mod message;
pub use message::Environment;
pub use message::Headers;
pub use message::PayloadItem;

mod body;
pub use body::BoxReader;
pub use body::QuasiBody;

mod request;
pub use request::QuasiRequest;
pub use request::method;

mod response;
pub use response::QuasiResponse;
pub use response::status;

mod options;
pub use options::DEFAULT_MAX_CHUNK_SIZE;
pub use options::DEFAULT_MAX_HEADERS_SIZE;
pub use options::DEFAULT_RESPONSE_BODY_BUFFERING_SIZE_LIMIT;
pub use options::ProcessingOptions;

mod error;
pub use error::CodecError;
pub use error::ErrorReason;
pub use error::QuasiHttpError;
