//! Body reader selection for outgoing messages.
//!
//! Mirrors [`PayloadDecoder`](super::PayloadDecoder): a known length sends the
//! body bytes as they are, capped to that length, while an unknown length
//! sends them as body chunks.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

use super::chunked_encoder::ChunkEncodingReader;
use super::length_decoder::ContentLengthReader;

pin_project! {
    /// Yields the wire bytes of an outgoing body, ready to be copied to the connection.
    #[derive(Debug)]
    pub struct PayloadEncoder<R> {
        #[pin]
        kind: Kind<R>,
    }
}

pin_project! {
    #[project = KindProj]
    #[derive(Debug)]
    enum Kind<R> {
        Length { #[pin] reader: ContentLengthReader<R> },
        Chunked { #[pin] reader: ChunkEncodingReader<R> },
    }
}

impl<R> PayloadEncoder<R> {
    /// Picks body chunks for a negative `content_length`, raw bytes otherwise.
    pub fn new(reader: R, content_length: i64, max_chunk_size: usize) -> Self {
        if content_length < 0 {
            Self::chunked(reader, max_chunk_size)
        } else {
            Self::fix_length(reader, content_length)
        }
    }

    /// Frames the source as body chunks of at most `max_chunk_size` data bytes.
    pub fn chunked(reader: R, max_chunk_size: usize) -> Self {
        Self { kind: Kind::Chunked { reader: ChunkEncodingReader::new(reader, max_chunk_size) } }
    }

    /// Passes the source through, failing when it holds fewer than `content_length` bytes.
    pub fn fix_length(reader: R, content_length: i64) -> Self {
        Self { kind: Kind::Length { reader: ContentLengthReader::new(reader, content_length) } }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked { .. })
    }
}

impl<R: AsyncRead> AsyncRead for PayloadEncoder<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.project().kind.project() {
            KindProj::Length { reader } => reader.poll_read(cx, buf),
            KindProj::Chunked { reader } => reader.poll_read(cx, buf),
        }
    }
}
