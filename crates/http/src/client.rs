//! Client façade: options merging, connection allocation and response assembly.

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::connection::QuasiConnection;
use crate::exchange::{ResponseBodyReader, response_from_lead_chunk, send};
use crate::protocol::{Environment, ProcessingOptions, QuasiBody, QuasiHttpError, QuasiRequest, QuasiResponse};
use crate::transport::ClientTransport;

/// Sends quasi-HTTP requests through a [`ClientTransport`].
///
/// Each call to [`send`](Self::send) allocates a fresh connection for one
/// exchange. The connection is always released: right away when the response
/// has no body or was buffered, otherwise once the streamed body ends, fails,
/// is cancelled or dropped.
#[derive(Debug)]
pub struct QuasiClient<T> {
    transport: T,
    default_options: ProcessingOptions,
}

impl<T: ClientTransport> QuasiClient<T> {
    pub fn new(transport: T) -> Self {
        Self { transport, default_options: ProcessingOptions::default() }
    }

    pub fn builder() -> QuasiClientBuilder<T> {
        QuasiClientBuilder { transport: None, default_options: ProcessingOptions::default() }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn default_options(&self) -> &ProcessingOptions {
        &self.default_options
    }

    /// Sends `request` to `endpoint`.
    ///
    /// `options` takes precedence over the client's default options field by field.
    pub async fn send(
        &self,
        endpoint: &T::Endpoint,
        request: QuasiRequest,
        options: Option<&ProcessingOptions>,
    ) -> Result<QuasiResponse, QuasiHttpError> {
        self.send_with(endpoint, |_environment| request, options).await
    }

    /// Like [`send`](Self::send), but builds the request once the connection
    /// is allocated, from the connection's environment.
    pub async fn send_with<F>(
        &self,
        endpoint: &T::Endpoint,
        request_fn: F,
        options: Option<&ProcessingOptions>,
    ) -> Result<QuasiResponse, QuasiHttpError>
    where
        F: FnOnce(&Environment) -> QuasiRequest,
    {
        let options = ProcessingOptions::merge(options, Some(&self.default_options));
        let mut connection = self.transport.allocate_connection(endpoint, &options).await?;

        let mut request = request_fn(connection.environment());
        debug!(method = %request.method, target = %request.target, "sending request");

        let (lead_chunk, buffered) = match send(&mut connection, &mut request).await {
            Ok(exchanged) => exchanged,
            Err(e) => {
                self.abort(&mut connection, &e).await;
                return Err(e);
            }
        };

        let environment = connection.environment().clone();
        let content_length = lead_chunk.content_length;
        let streaming = buffered.is_none() && content_length != 0;
        if let Err(e) = self.transport.release_connection(&mut connection, streaming).await {
            // the transport already had its release call
            warn!(cause = %e, "transport failed to release connection");
            connection.release();
            return Err(e);
        }

        if streaming {
            let cancellation = CancellationToken::new();
            let reader = ResponseBodyReader::new(connection, content_length, &cancellation)?;
            let body = QuasiBody::new(content_length, reader);
            return Ok(response_from_lead_chunk(lead_chunk, Some(body), environment).with_cancellation(cancellation));
        }

        connection.release();
        let body = buffered.map(QuasiBody::from_bytes);
        Ok(response_from_lead_chunk(lead_chunk, body, environment))
    }

    async fn abort(&self, connection: &mut QuasiConnection<T::Stream>, cause: &QuasiHttpError) {
        warn!(cause = %cause, "exchange failed, aborting connection");
        if let Err(e) = self.transport.release_connection(connection, false).await {
            warn!(cause = %e, "connection release failed while aborting");
        }
        connection.release();
    }
}

#[derive(Debug)]
pub struct QuasiClientBuilder<T> {
    transport: Option<T>,
    default_options: ProcessingOptions,
}

impl<T: ClientTransport> QuasiClientBuilder<T> {
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn default_options(mut self, default_options: ProcessingOptions) -> Self {
        self.default_options = default_options;
        self
    }

    pub fn build(self) -> Result<QuasiClient<T>, QuasiHttpError> {
        let transport = self.transport.ok_or_else(|| QuasiHttpError::missing_dependency("transport"))?;
        Ok(QuasiClient { transport, default_options: self.default_options })
    }
}
