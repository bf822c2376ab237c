//! Pull-based reader that strips body chunk framing.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::trace;

use super::body_chunk::{BODY_CHUNK_HEADER_SIZE, decode_chunk_header};
use crate::protocol::CodecError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecodeState {
    /// Read the next chunk header
    Header,
    /// Read chunk data
    Data,
    /// Terminating chunk seen, the source is never touched again
    Done,
}

pin_project! {
    /// Reads the data carried by a sequence of body chunks.
    ///
    /// Every read first makes sure a chunk header has been consumed, even when
    /// the caller's buffer is empty, so errors of the underlying source show
    /// up on the very first read. Reads never cross a chunk boundary. Once the
    /// terminating chunk has been read, every read returns end-of-data.
    #[derive(Debug)]
    pub struct ChunkDecodingReader<R> {
        #[pin]
        inner: R,
        header: [u8; BODY_CHUNK_HEADER_SIZE],
        header_filled: usize,
        remaining: u64,
        state: DecodeState,
    }
}

impl<R> ChunkDecodingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, header: [0; BODY_CHUNK_HEADER_SIZE], header_filled: 0, remaining: 0, state: DecodeState::Header }
    }

    /// Whether the terminating chunk has been read.
    pub fn is_finish(&self) -> bool {
        self.state == DecodeState::Done
    }
}

impl<R: AsyncRead> AsyncRead for ChunkDecodingReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut this = self.project();
        loop {
            match *this.state {
                DecodeState::Done => return Poll::Ready(Ok(())),

                DecodeState::Header => {
                    while *this.header_filled < BODY_CHUNK_HEADER_SIZE {
                        let mut header_buf = ReadBuf::new(&mut this.header[*this.header_filled..]);
                        ready!(this.inner.as_mut().poll_read(cx, &mut header_buf))?;
                        let n = header_buf.filled().len();
                        if n == 0 {
                            return Poll::Ready(Err(CodecError::UnexpectedEof.into()));
                        }
                        *this.header_filled += n;
                    }

                    *this.header_filled = 0;
                    let length = decode_chunk_header(&this.header[..])?;
                    if length == 0 {
                        trace!("read terminating body chunk");
                        *this.state = DecodeState::Done;
                    } else {
                        trace!(length, "read body chunk header");
                        *this.remaining = length;
                        *this.state = DecodeState::Data;
                    }
                }

                DecodeState::Data => {
                    if buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }

                    let max = usize::try_from(*this.remaining).map_or(buf.remaining(), |r| r.min(buf.remaining()));
                    let mut data_buf = ReadBuf::new(buf.initialize_unfilled_to(max));
                    ready!(this.inner.as_mut().poll_read(cx, &mut data_buf))?;
                    let n = data_buf.filled().len();
                    if n == 0 {
                        return Poll::Ready(Err(CodecError::UnexpectedEof.into()));
                    }

                    buf.advance(n);
                    *this.remaining -= n as u64;
                    if *this.remaining == 0 {
                        *this.state = DecodeState::Header;
                    }
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::QuasiHttpError;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_basic() {
        let wire: &[u8] = b"0000000005\x01\x00hello0000000001\x01\x00!0000000000\x01\x00trailing";
        let mut reader = ChunkDecodingReader::new(wire);

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello!");
        assert!(reader.is_finish());

        // the terminating chunk ends reading, leftover source bytes stay put
        let mut buf = [0u8; 4];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
        assert_eq!(reader.inner, b"trailing");
    }

    #[tokio::test]
    async fn test_reads_do_not_cross_chunks() {
        let wire: &[u8] = b"0000000002\x01\x00ab0000000003\x01\x00cde0000000000\x01\x00";
        let mut reader = ChunkDecodingReader::new(wire);
        let mut buf = [0u8; 16];
        assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ab");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 3);
        assert_eq!(&buf[..3], b"cde");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_length_probe_reads_header() {
        let wire: &[u8] = b"0000000000\x01\x00";
        let mut reader = ChunkDecodingReader::new(wire);
        assert_eq!(reader.read(&mut []).await.unwrap(), 0);
        assert!(reader.is_finish());
    }

    #[tokio::test]
    async fn test_truncated_source() {
        let wire: &[u8] = b"0000000005\x01\x00hel";
        let mut reader = ChunkDecodingReader::new(wire);
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert!(matches!(QuasiHttpError::from(err), QuasiHttpError::Codec { source: CodecError::UnexpectedEof }));
    }

    #[tokio::test]
    async fn test_invalid_version() {
        let wire: &[u8] = b"0000000001\x00\x00a";
        let mut reader = ChunkDecodingReader::new(wire);
        let err = reader.read(&mut [0u8; 4]).await.unwrap_err();
        assert!(matches!(QuasiHttpError::from(err), QuasiHttpError::Codec { source: CodecError::InvalidVersion(0) }));
    }
}
