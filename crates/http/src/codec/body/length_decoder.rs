//! Reader enforcing a declared content length.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::warn;

use crate::protocol::CodecError;

pin_project! {
    /// Wraps a source and delivers exactly `content_length` bytes from it.
    ///
    /// A negative length disables enforcement and every read passes through.
    /// Otherwise reads are capped to the bytes still expected, and running out
    /// of source data early fails with
    /// [`CodecError::ContentLengthNotSatisfied`] on that read and every later
    /// one. Once the length is met, the first non-empty read probes the source
    /// with an empty buffer so a failing source still surfaces its error;
    /// after that, reads return end-of-data without touching the source.
    #[derive(Debug)]
    pub struct ContentLengthReader<R> {
        #[pin]
        inner: R,
        content_length: i64,
        remaining: u64,
        faulted: bool,
        probed: bool,
    }
}

impl<R> ContentLengthReader<R> {
    /// A negative `content_length` passes the source through unchecked.
    pub fn new(inner: R, content_length: i64) -> Self {
        let remaining = u64::try_from(content_length).unwrap_or(0);
        Self { inner, content_length, remaining, faulted: false, probed: false }
    }

    pub fn content_length(&self) -> i64 {
        self.content_length
    }

    /// Bytes still owed by the source.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead> AsyncRead for ContentLengthReader<R> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let mut this = self.project();
        let Ok(expected) = u64::try_from(*this.content_length) else {
            return this.inner.poll_read(cx, buf);
        };

        if *this.faulted {
            return Poll::Ready(Err(CodecError::content_length_not_satisfied(expected, expected - *this.remaining).into()));
        }

        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if *this.remaining == 0 {
            if !*this.probed {
                *this.probed = true;
                let mut empty = ReadBuf::new(&mut []);
                // a pending source has nothing to report
                if let Poll::Ready(Err(e)) = this.inner.as_mut().poll_read(cx, &mut empty) {
                    return Poll::Ready(Err(e));
                }
            }
            return Poll::Ready(Ok(()));
        }

        let max = usize::try_from(*this.remaining).map_or(buf.remaining(), |r| r.min(buf.remaining()));
        let mut limited = ReadBuf::new(buf.initialize_unfilled_to(max));
        ready!(this.inner.as_mut().poll_read(cx, &mut limited))?;
        let n = limited.filled().len();

        if n == 0 {
            *this.faulted = true;
            let received = expected - *this.remaining;
            warn!(expected, received, "source ended before content length was reached");
            return Poll::Ready(Err(CodecError::content_length_not_satisfied(expected, received).into()));
        }

        buf.advance(n);
        *this.remaining -= n as u64;
        Poll::Ready(Ok(()))
    }
}
