//! Body framing for quasi-HTTP messages.
//!
//! Bodies travel right after their lead chunk, either as raw bytes of a
//! declared length or, when the length is unknown, as a sequence of body
//! chunks closed by a zero-length chunk. Everything here is a pull-based
//! [`AsyncRead`](tokio::io::AsyncRead) adapter so bodies stream without
//! being buffered.
//!
//! # Components
//!
//! ## Decoders
//! - [`ChunkDecodingReader`]: strips body chunk framing
//! - [`ContentLengthReader`]: enforces a declared length
//! - [`PayloadDecoder`]: picks one of the above from the content length
//!
//! ## Encoders
//! - [`ChunkEncodingReader`]: frames a source as body chunks
//! - [`PayloadEncoder`]: picks raw or chunked sending from the content length
//!
//! [`BodyChunkCodec`] is the in-memory [`tokio_util::codec`] form of the chunk framing.

mod body_chunk;
mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod payload_decoder;
mod payload_encoder;

pub use body_chunk::{BODY_CHUNK_HEADER_SIZE, BODY_CHUNK_LENGTH_PREFIX, BodyChunkCodec, HARD_MAX_BODY_CHUNK_SIZE};
pub use chunked_decoder::ChunkDecodingReader;
pub use chunked_encoder::ChunkEncodingReader;
pub use length_decoder::ContentLengthReader;
pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
