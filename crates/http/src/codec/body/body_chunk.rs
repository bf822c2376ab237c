//! Body chunk framing for bodies of unknown length.
//!
//! ```text
//! +----------------------+---------+-------+------------------+
//! | length (10 digits)   | version | flags | length data bytes|
//! +----------------------+---------+-------+------------------+
//! ```
//!
//! A chunk with length zero terminates the body.

use std::cmp;

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::codec::lead_chunk::CHUNK_VERSION;
use crate::protocol::{CodecError, PayloadItem};
use crate::utils::ensure;
use crate::utils::number::parse_length_prefix;

/// Width of the ASCII length prefix in front of a body chunk.
pub const BODY_CHUNK_LENGTH_PREFIX: usize = 10;

/// Length prefix plus version and flags bytes.
pub const BODY_CHUNK_HEADER_SIZE: usize = BODY_CHUNK_LENGTH_PREFIX + 2;

/// Most data bytes a single body chunk may carry.
pub const HARD_MAX_BODY_CHUNK_SIZE: usize = 1_000_000_000;

pub(crate) fn encode_chunk_header(length: usize, dst: &mut BytesMut) {
    dst.reserve(BODY_CHUNK_HEADER_SIZE + length);
    dst.put_slice(format!("{length:0width$}", width = BODY_CHUNK_LENGTH_PREFIX).as_bytes());
    dst.put_u8(CHUNK_VERSION);
    dst.put_u8(0);
}

/// Validates a complete chunk header and returns the data length it announces.
pub(crate) fn decode_chunk_header(header: &[u8]) -> Result<u64, CodecError> {
    let length = parse_length_prefix(&header[..BODY_CHUNK_LENGTH_PREFIX], HARD_MAX_BODY_CHUNK_SIZE as u64)?;
    let version = header[BODY_CHUNK_LENGTH_PREFIX];
    ensure!(version != 0, CodecError::InvalidVersion(version));
    Ok(length)
}

/// Codec for body chunks held in memory.
///
/// Encoding frames every non-empty [`PayloadItem::Chunk`], splitting buffers
/// larger than [`HARD_MAX_BODY_CHUNK_SIZE`], and writes the terminating chunk
/// on [`PayloadItem::Eof`]; anything after that is ignored. Decoding yields
/// data as soon as it is buffered, then [`PayloadItem::Eof`] from the
/// terminating chunk on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BodyChunkCodec {
    eof: bool,
    remaining: u64,
}

impl BodyChunkCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_finish(&self) -> bool {
        self.eof
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for BodyChunkCodec {
    type Error = CodecError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if self.eof {
            return Ok(());
        }

        match item {
            PayloadItem::Chunk(mut bytes) => {
                while bytes.has_remaining() {
                    let length = cmp::min(bytes.remaining(), HARD_MAX_BODY_CHUNK_SIZE);
                    trace!(length, "encode body chunk");
                    encode_chunk_header(length, dst);
                    dst.put((&mut bytes).take(length));
                }
                Ok(())
            }
            PayloadItem::Eof => {
                self.eof = true;
                encode_chunk_header(0, dst);
                Ok(())
            }
        }
    }
}

impl Decoder for BodyChunkCodec {
    type Item = PayloadItem;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.eof {
            return Ok(Some(PayloadItem::Eof));
        }

        if self.remaining == 0 {
            if src.len() < BODY_CHUNK_HEADER_SIZE {
                return Ok(None);
            }
            let length = decode_chunk_header(&src[..BODY_CHUNK_HEADER_SIZE])?;
            src.advance(BODY_CHUNK_HEADER_SIZE);
            if length == 0 {
                trace!("finished reading body chunks");
                self.eof = true;
                return Ok(Some(PayloadItem::Eof));
            }
            self.remaining = length;
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = usize::try_from(self.remaining).map_or(src.len(), |remaining| cmp::min(remaining, src.len()));
        let bytes = src.split_to(len).freeze();
        self.remaining -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
