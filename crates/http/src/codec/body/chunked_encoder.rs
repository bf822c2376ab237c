//! Pull-based reader that frames a source as body chunks.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::{Bytes, BytesMut};
use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::codec::Encoder;

use super::body_chunk::{BodyChunkCodec, HARD_MAX_BODY_CHUNK_SIZE};
use crate::protocol::PayloadItem;

pin_project! {
    /// Produces the body chunk encoding of everything read from `inner`.
    ///
    /// Each non-empty read of the source becomes one chunk of at most
    /// `max_chunk_size` data bytes. End of the source yields the terminating
    /// chunk, after which the reader reports end-of-data.
    #[derive(Debug)]
    pub struct ChunkEncodingReader<R> {
        #[pin]
        inner: R,
        codec: BodyChunkCodec,
        chunk_buf: Box<[u8]>,
        pending: BytesMut,
    }
}

impl<R> ChunkEncodingReader<R> {
    /// `max_chunk_size` is clamped to `1..=HARD_MAX_BODY_CHUNK_SIZE`.
    pub fn new(inner: R, max_chunk_size: usize) -> Self {
        let size = max_chunk_size.clamp(1, HARD_MAX_BODY_CHUNK_SIZE);
        Self { inner, codec: BodyChunkCodec::new(), chunk_buf: vec![0; size].into_boxed_slice(), pending: BytesMut::new() }
    }
}

impl<R: AsyncRead> AsyncRead for ChunkEncodingReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut this = self.project();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending.split_to(n));
                return Poll::Ready(Ok(()));
            }

            if this.codec.is_finish() {
                return Poll::Ready(Ok(()));
            }

            let mut chunk_buf = ReadBuf::new(&mut this.chunk_buf[..]);
            ready!(this.inner.as_mut().poll_read(cx, &mut chunk_buf))?;
            let data = chunk_buf.filled();
            if data.is_empty() {
                this.codec.encode(PayloadItem::<Bytes>::Eof, this.pending)?;
            } else {
                this.codec.encode(PayloadItem::Chunk(data), this.pending)?;
            }
        }
    }
}
