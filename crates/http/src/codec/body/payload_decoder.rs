//! Body reader selection for incoming messages.
//!
//! The declared content length decides how the bytes following a lead chunk
//! are read:
//! - a non-negative length is read as raw bytes through [`ContentLengthReader`]
//! - a negative length means body chunk framing, read through [`ChunkDecodingReader`]

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};

use super::chunked_decoder::ChunkDecodingReader;
use super::length_decoder::ContentLengthReader;

pin_project! {
    /// Reads the body of an incoming message off the connection.
    #[derive(Debug)]
    pub struct PayloadDecoder<R> {
        #[pin]
        kind: Kind<R>,
    }
}

pin_project! {
    #[project = KindProj]
    #[derive(Debug)]
    enum Kind<R> {
        // raw bytes, exactly the declared length
        Length { #[pin] reader: ContentLengthReader<R> },

        // body chunks up to the terminating chunk
        Chunked { #[pin] reader: ChunkDecodingReader<R> },
    }
}

impl<R> PayloadDecoder<R> {
    /// Picks body chunks for a negative `content_length`, an exact count otherwise.
    pub fn new(reader: R, content_length: i64) -> Self {
        if content_length < 0 { Self::chunked(reader) } else { Self::fix_length(reader, content_length) }
    }

    /// Reads body chunks until the terminating empty chunk.
    pub fn chunked(reader: R) -> Self {
        Self { kind: Kind::Chunked { reader: ChunkDecodingReader::new(reader) } }
    }

    /// Reads exactly `content_length` raw bytes.
    pub fn fix_length(reader: R, content_length: i64) -> Self {
        Self { kind: Kind::Length { reader: ContentLengthReader::new(reader, content_length) } }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked { .. })
    }
}

impl<R: AsyncRead> AsyncRead for PayloadDecoder<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.project().kind.project() {
            KindProj::Length { reader } => reader.poll_read(cx, buf),
            KindProj::Chunked { reader } => reader.poll_read(cx, buf),
        }
    }
}
