use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, ready};

use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf, ReadHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};
use tracing::debug;

use crate::codec::PayloadDecoder;
use crate::connection::QuasiConnection;
use crate::protocol::QuasiHttpError;

struct BodyStream<S> {
    payload: PayloadDecoder<ReadHalf<S>>,
    connection: QuasiConnection<S>,
}

/// Streams a response body off the connection that carried it.
///
/// The connection and both stream halves are dropped once the body ends,
/// fails, or is cancelled through its token, which closes the stream for
/// the peer. Cancellation takes effect without a pending read, and a
/// cancelled body reports end-of-data. After a failure every read reports
/// the same error kind.
pub(crate) struct ResponseBodyReader<S> {
    stream: Arc<Mutex<Option<BodyStream<S>>>>,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
    watcher: JoinHandle<()>,
    failure: Option<(io::ErrorKind, String)>,
}

impl<S: AsyncRead + Send + 'static> ResponseBodyReader<S> {
    pub(crate) fn new(
        mut connection: QuasiConnection<S>,
        content_length: i64,
        cancellation: &CancellationToken,
    ) -> Result<Self, QuasiHttpError> {
        let reader = connection.take_reader()?;
        let stream = Arc::new(Mutex::new(Some(BodyStream { payload: PayloadDecoder::new(reader, content_length), connection })));

        let watched = Arc::clone(&stream);
        let cancelled = cancellation.clone();
        let watcher = tokio::spawn(async move {
            cancelled.cancelled().await;
            if watched.lock().take().is_some() {
                debug!("response body cancelled");
            }
        });

        Ok(Self { stream, cancelled: Box::pin(cancellation.clone().cancelled_owned()), watcher, failure: None })
    }
}

impl<S> ResponseBodyReader<S> {
    pub(crate) fn is_released(&self) -> bool {
        self.stream.lock().is_none()
    }
}

impl<S: AsyncRead> AsyncRead for ResponseBodyReader<S> {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some((kind, message)) = &this.failure {
            return Poll::Ready(Err(io::Error::new(*kind, message.clone())));
        }

        let mut stream = this.stream.lock();
        // also wakes a read left pending when the watcher drops the stream
        if this.cancelled.as_mut().poll(cx).is_ready() {
            *stream = None;
            return Poll::Ready(Ok(()));
        }
        let Some(body) = stream.as_mut() else {
            return Poll::Ready(Ok(()));
        };

        let wants_data = buf.remaining() > 0;
        let before = buf.filled().len();
        let result = ready!(Pin::new(&mut body.payload).poll_read(cx, buf));
        match &result {
            Ok(()) if wants_data && buf.filled().len() == before => {
                *stream = None;
            }
            Ok(()) => {}
            Err(e) => {
                this.failure = Some((e.kind(), e.to_string()));
                *stream = None;
            }
        }
        Poll::Ready(result)
    }
}

impl<S> Drop for ResponseBodyReader<S> {
    fn drop(&mut self) {
        self.watcher.abort();
        self.stream.lock().take();
    }
}

impl<S> std::fmt::Debug for ResponseBodyReader<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseBodyReader")
            .field("released", &self.is_released())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
