//! Wire codecs for quasi-HTTP messages.
//!
//! A message on the wire is a lead chunk followed by its body:
//!
//! - [`lead_chunk`]: length-prefixed request line or status line plus
//!   headers, serialized as CSV
//! - [`body`]: raw bytes of a declared length, or body chunks when the length
//!   is unknown
//!
//! Lead chunks go through a [`tokio_util::codec`] pair; bodies are
//! [`AsyncRead`](tokio::io::AsyncRead) adapters so they can stream.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use quasi_http::codec::{LeadChunk, LeadChunkCodec};
//! use quasi_http::protocol::QuasiRequest;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let request = QuasiRequest::new("GET", "/status");
//! let mut codec = LeadChunkCodec::new(8192);
//! let mut buf = BytesMut::new();
//! codec.encode(&LeadChunk::from_request(&request), &mut buf).unwrap();
//!
//! let decoded = codec.decode(&mut buf).unwrap().unwrap();
//! assert_eq!(decoded.method.as_deref(), Some("GET"));
//! ```

pub mod body;
mod csv;
mod lead_chunk;

pub use body::{ChunkDecodingReader, ChunkEncodingReader, ContentLengthReader, PayloadDecoder, PayloadEncoder};
pub use lead_chunk::{CHUNK_VERSION, HARD_MAX_LEAD_CHUNK_SIZE, LEAD_CHUNK_LENGTH_PREFIX, LeadChunk, LeadChunkCodec};
