use std::fmt;

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use super::ExchangeTimer;
use crate::codec::{LEAD_CHUNK_LENGTH_PREFIX, LeadChunk, LeadChunkCodec, PayloadDecoder, PayloadEncoder};
use crate::protocol::{CodecError, Environment, ProcessingOptions, QuasiBody, QuasiHttpError};
use crate::utils::io::{read_all_bytes, read_exact};

/// Which end of an exchange a connection serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionRole {
    Client,
    Server,
}

/// A duplex byte stream dedicated to a single exchange.
///
/// The connection owns the effective [`ProcessingOptions`] of the exchange,
/// the environment supplied by the transport, and the exchange deadline.
/// Every [`read`](Self::read) and [`write`](Self::write) races that deadline.
///
/// [`release`](Self::release) stops the deadline and closes the stream. It
/// runs at most once, and dropping the connection releases it too.
pub struct QuasiConnection<S> {
    reader: Option<ReadHalf<S>>,
    writer: Option<WriteHalf<S>>,
    options: ProcessingOptions,
    environment: Environment,
    codec: LeadChunkCodec,
    timer: ExchangeTimer,
    timer_task: Option<JoinHandle<()>>,
    released: bool,
}

impl<S> QuasiConnection<S>
where
    S: AsyncRead + AsyncWrite,
{
    /// Wraps `stream`, filling every option `options` leaves unset with its hard default.
    ///
    /// A positive timeout starts the exchange deadline right away, which
    /// requires a running tokio runtime.
    pub fn new(stream: S, role: ConnectionRole, options: &ProcessingOptions, environment: Environment) -> Self {
        let options = options.effective();
        let (timer, timer_task) = match options.timeout() {
            Some(timeout) => {
                let (timer, task) = ExchangeTimer::start(role, timeout);
                (timer, Some(task))
            }
            None => (ExchangeTimer::disabled(role), None),
        };

        debug!(?role, timeout_millis = options.timeout_millis, "connection created");
        let (reader, writer) = tokio::io::split(stream);
        Self {
            reader: Some(reader),
            writer: Some(writer),
            codec: LeadChunkCodec::new(options.max_headers_size),
            options,
            environment,
            timer,
            timer_task,
            released: false,
        }
    }

    /// Writes a lead chunk followed by its body.
    pub async fn write(
        &mut self,
        is_response: bool,
        lead_chunk: &LeadChunk,
        body: Option<&mut QuasiBody>,
    ) -> Result<(), QuasiHttpError> {
        let (mut writer, _reader) = self.split_mut();
        writer.write(is_response, lead_chunk, body).await
    }

    /// Reads a lead chunk, plus the whole body when it is a response to be buffered.
    pub async fn read(&mut self, is_response: bool) -> Result<(LeadChunk, Option<Bytes>), QuasiHttpError> {
        let (_writer, mut reader) = self.split_mut();
        reader.read(is_response).await
    }
}

impl<S> QuasiConnection<S> {
    /// Borrows the two directions of the stream separately, so a write and a
    /// read may be in flight at the same time.
    pub fn split_mut(&mut self) -> (ConnectionWriter<'_, S>, ConnectionReader<'_, S>) {
        let writer = ConnectionWriter {
            writer: self.writer.as_mut(),
            codec: self.codec,
            timer: &self.timer,
            max_chunk_size: self.options.max_chunk_size,
        };
        let reader =
            ConnectionReader { reader: self.reader.as_mut(), codec: self.codec, timer: &self.timer, options: &self.options };
        (writer, reader)
    }

    /// Hands the read direction over to a body that outlives this borrow.
    pub fn take_reader(&mut self) -> Result<ReadHalf<S>, QuasiHttpError> {
        self.reader.take().ok_or(QuasiHttpError::ConnectionReleased)
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn timer(&self) -> &ExchangeTimer {
        &self.timer
    }

    pub fn role(&self) -> ConnectionRole {
        self.timer.role()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stops the deadline and closes the stream; later calls do nothing.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        if let Some(task) = self.timer_task.take() {
            task.abort();
        }
        self.reader = None;
        self.writer = None;
        debug!(role = ?self.role(), "connection released");
    }
}

impl<S> Drop for QuasiConnection<S> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S> fmt::Debug for QuasiConnection<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuasiConnection")
            .field("role", &self.role())
            .field("options", &self.options)
            .field("environment", &self.environment)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

/// Write direction of a [`QuasiConnection`].
pub struct ConnectionWriter<'a, S> {
    writer: Option<&'a mut WriteHalf<S>>,
    codec: LeadChunkCodec,
    timer: &'a ExchangeTimer,
    max_chunk_size: usize,
}

impl<S: AsyncWrite> ConnectionWriter<'_, S> {
    /// Writes `lead_chunk`, then `body` framed according to the lead chunk's content length.
    ///
    /// The lead chunk is size-checked before anything reaches the stream. A
    /// body is only sent when the content length is non-zero.
    pub async fn write(
        &mut self,
        is_response: bool,
        lead_chunk: &LeadChunk,
        body: Option<&mut QuasiBody>,
    ) -> Result<(), QuasiHttpError> {
        let writer = self.writer.as_deref_mut().ok_or(QuasiHttpError::ConnectionReleased)?;
        let mut codec = self.codec;
        let max_chunk_size = self.max_chunk_size;

        self.timer
            .race(async move {
                let mut buf = BytesMut::new();
                codec.encode(lead_chunk, &mut buf)?;
                trace!(is_response, length = buf.len(), "write lead chunk");
                writer.write_all(&buf).await?;

                if let Some(body) = body.filter(|_| lead_chunk.content_length != 0) {
                    let mut payload = PayloadEncoder::new(body, lead_chunk.content_length, max_chunk_size);
                    let written = tokio::io::copy(&mut payload, &mut *writer).await?;
                    trace!(is_response, written, "write body");
                }

                writer.flush().await?;
                Ok::<_, QuasiHttpError>(())
            })
            .await
    }
}

impl<S> fmt::Debug for ConnectionWriter<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionWriter").field("max_chunk_size", &self.max_chunk_size).finish_non_exhaustive()
    }
}

/// Read direction of a [`QuasiConnection`].
pub struct ConnectionReader<'a, S> {
    reader: Option<&'a mut ReadHalf<S>>,
    codec: LeadChunkCodec,
    timer: &'a ExchangeTimer,
    options: &'a ProcessingOptions,
}

impl<S: AsyncRead> ConnectionReader<'_, S> {
    /// Reads the next lead chunk.
    ///
    /// For a response with buffering enabled, a non-empty body is read into
    /// memory as well, up to the buffering size limit. Otherwise the body is
    /// left on the stream for the caller.
    pub async fn read(&mut self, is_response: bool) -> Result<(LeadChunk, Option<Bytes>), QuasiHttpError> {
        let reader = self.reader.as_deref_mut().ok_or(QuasiHttpError::ConnectionReleased)?;
        let mut codec = self.codec;
        let buffering_limit =
            (is_response && self.options.response_buffering_enabled()).then_some(self.options.response_body_buffering_size_limit);

        self.timer
            .race(async move {
                let lead_chunk = read_lead_chunk(reader, &mut codec).await?;
                trace!(is_response, content_length = lead_chunk.content_length, "read lead chunk");

                let body = match buffering_limit {
                    Some(limit) if lead_chunk.content_length != 0 => {
                        Some(buffer_body(reader, lead_chunk.content_length, limit).await?)
                    }
                    _ => None,
                };
                Ok::<_, QuasiHttpError>((lead_chunk, body))
            })
            .await
    }
}

impl<S> fmt::Debug for ConnectionReader<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionReader").field("options", self.options).finish_non_exhaustive()
    }
}

async fn read_lead_chunk<R>(reader: &mut R, codec: &mut LeadChunkCodec) -> Result<LeadChunk, QuasiHttpError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = BytesMut::zeroed(LEAD_CHUNK_LENGTH_PREFIX);
    read_exact(reader, &mut buf).await?;

    // checked before the payload is pulled off the stream
    let length = codec.decode_length(&buf)?;
    buf.resize(LEAD_CHUNK_LENGTH_PREFIX + length, 0);
    read_exact(reader, &mut buf[LEAD_CHUNK_LENGTH_PREFIX..]).await?;

    codec.decode(&mut buf)?.ok_or_else(|| CodecError::UnexpectedEof.into())
}

async fn buffer_body<R>(reader: &mut R, content_length: i64, limit: usize) -> Result<Bytes, QuasiHttpError>
where
    R: AsyncRead + Unpin,
{
    if u64::try_from(content_length).is_ok_and(|length| length > limit as u64) {
        return Err(QuasiHttpError::length_limit_exceeded(format!(
            "content length of {content_length} bytes exceeds buffering limit of {limit} bytes"
        )));
    }

    let mut payload = PayloadDecoder::new(reader, content_length);
    read_all_bytes(&mut payload, limit).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ErrorReason, QuasiRequest, QuasiResponse};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, DuplexStream, duplex};

    fn pair(client_options: &ProcessingOptions, server_options: &ProcessingOptions) -> (QuasiConnection<DuplexStream>, QuasiConnection<DuplexStream>) {
        let (client, server) = duplex(64 * 1024);
        (
            QuasiConnection::new(client, ConnectionRole::Client, client_options, Environment::new()),
            QuasiConnection::new(server, ConnectionRole::Server, server_options, Environment::new()),
        )
    }

    #[tokio::test]
    async fn test_request_travels_with_body() {
        let (mut client, mut server) = pair(&ProcessingOptions::default(), &ProcessingOptions::default());
        let mut request = QuasiRequest::new("POST", "/x").header("A", "1").body(QuasiBody::from_bytes("hello"));
        let lead_chunk = LeadChunk::from_request(&request);
        client.write(false, &lead_chunk, request.body.as_mut()).await.unwrap();

        let (received, buffered) = server.read(false).await.unwrap();
        assert!(buffered.is_none());
        assert_eq!(received, lead_chunk);

        let mut body = PayloadDecoder::new(server.take_reader().unwrap(), received.content_length);
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello");
    }

    #[tokio::test]
    async fn test_response_is_buffered() {
        let (mut client, mut server) = pair(&ProcessingOptions::default(), &ProcessingOptions::default());
        let mut response = QuasiResponse::new(200).body(QuasiBody::streaming(&b"HELLO"[..]));
        let lead_chunk = LeadChunk::from_response(&response);
        server.write(true, &lead_chunk, response.body.as_mut()).await.unwrap();

        let (received, buffered) = client.read(true).await.unwrap();
        assert_eq!(received.status_code, 200);
        assert_eq!(received.content_length, -1);
        assert_eq!(buffered, Some(Bytes::from_static(b"HELLO")));
    }

    #[tokio::test]
    async fn test_buffering_disabled_leaves_body_on_stream() {
        let options = ProcessingOptions::default().with_response_buffering(false);
        let (mut client, mut server) = pair(&options, &ProcessingOptions::default());
        let mut response = QuasiResponse::new(200).body(QuasiBody::from_bytes("HELLO"));
        server.write(true, &LeadChunk::from_response(&response), response.body.as_mut()).await.unwrap();

        let (received, buffered) = client.read(true).await.unwrap();
        assert!(buffered.is_none());
        let mut body = PayloadDecoder::new(client.take_reader().unwrap(), received.content_length);
        let mut out = Vec::new();
        body.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"HELLO");
    }

    #[tokio::test]
    async fn test_buffering_limit() {
        let options = ProcessingOptions::default().with_response_body_buffering_size_limit(4);
        let (mut client, mut server) = pair(&options, &ProcessingOptions::default());
        let mut response = QuasiResponse::new(200).body(QuasiBody::from_bytes("HELLO"));
        server.write(true, &LeadChunk::from_response(&response), response.body.as_mut()).await.unwrap();

        let err = client.read(true).await.unwrap_err();
        assert_eq!(err.reason(), ErrorReason::MessageLengthLimitExceeded);
    }

    #[tokio::test]
    async fn test_buffering_limit_for_unknown_length() {
        let options = ProcessingOptions::default().with_response_body_buffering_size_limit(4);
        let (mut client, mut server) = pair(&options, &ProcessingOptions::default());
        let mut response = QuasiResponse::new(200).body(QuasiBody::streaming(&b"HELLO"[..]));
        server.write(true, &LeadChunk::from_response(&response), response.body.as_mut()).await.unwrap();

        let err = client.read(true).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::LengthLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_oversized_lead_chunk_is_never_written() {
        let options = ProcessingOptions::default().with_max_headers_size(32);
        let (mut client, mut server) = pair(&options, &ProcessingOptions::default());
        let request = QuasiRequest::new("GET", "/").header("X-Large", "v".repeat(64));

        let err = client.write(false, &LeadChunk::from_request(&request), None).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::Codec { source: CodecError::HeadersTooLarge { max_size: 32, .. } }));

        client.release();
        let err = server.read(false).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::Codec { source: CodecError::UnexpectedEof }));
    }

    #[tokio::test]
    async fn test_oversized_lead_chunk_is_rejected_by_reader() {
        let server_options = ProcessingOptions::default().with_max_headers_size(32);
        let (mut client, mut server) = pair(&ProcessingOptions::default(), &server_options);
        let request = QuasiRequest::new("GET", "/").header("X-Large", "v".repeat(64));
        client.write(false, &LeadChunk::from_request(&request), None).await.unwrap();

        let err = server.read(false).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::Codec { source: CodecError::HeadersTooLarge { max_size: 32, .. } }));
    }

    #[tokio::test]
    async fn test_read_times_out() {
        let options = ProcessingOptions::default().with_timeout(Duration::from_millis(50));
        let (mut client, _server) = pair(&options, &ProcessingOptions::default());

        let err = client.read(true).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "send timeout");
    }

    #[tokio::test]
    async fn test_concurrent_write_and_read() {
        let (mut client, mut server) = pair(&ProcessingOptions::default(), &ProcessingOptions::default());
        let request = QuasiRequest::new("GET", "/ping");
        let lead_chunk = LeadChunk::from_request(&request);

        let (mut writer, mut reader) = client.split_mut();
        let peer = async {
            let (received, _) = server.read(false).await?;
            let response = QuasiResponse::new(204).status_message(received.request_target.unwrap_or_default());
            server.write(true, &LeadChunk::from_response(&response), None).await
        };
        let (written, read, served) = tokio::join!(writer.write(false, &lead_chunk, None), reader.read(true), peer);
        written.unwrap();
        served.unwrap();

        let (response, buffered) = read.unwrap();
        assert_eq!(response.status_code, 204);
        assert_eq!(response.status_message.as_deref(), Some("/ping"));
        assert!(buffered.is_none());
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (mut client, _server) = pair(&ProcessingOptions::default(), &ProcessingOptions::default());
        client.release();
        client.release();
        assert!(client.is_released());

        let err = client.read(true).await.unwrap_err();
        assert!(matches!(err, QuasiHttpError::ConnectionReleased));
        assert!(client.take_reader().is_err());
    }
}
