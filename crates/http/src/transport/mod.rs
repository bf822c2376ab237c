//! Where connections come from.
//!
//! Transports turn whatever carries bytes (sockets, pipes, in-memory
//! streams) into [`QuasiConnection`]s. The client side allocates a
//! connection per request; the server side accepts them one by one.
//! [`memory`] provides an in-process pair useful for tests and embedding.

pub mod memory;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::connection::QuasiConnection;
use crate::protocol::{ProcessingOptions, QuasiHttpError};

#[async_trait]
pub trait ClientTransport: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Send + 'static;
    type Endpoint: Sync + ?Sized;

    /// Opens a connection to `endpoint`, built with `options`.
    async fn allocate_connection(
        &self,
        endpoint: &Self::Endpoint,
        options: &ProcessingOptions,
    ) -> Result<QuasiConnection<Self::Stream>, QuasiHttpError>;

    /// Called once the exchange no longer needs the transport's help with `connection`.
    ///
    /// With `response_streaming_in_progress` set, the response body still
    /// reads from the connection and takes care of releasing it.
    async fn release_connection(
        &self,
        connection: &mut QuasiConnection<Self::Stream>,
        response_streaming_in_progress: bool,
    ) -> Result<(), QuasiHttpError> {
        if !response_streaming_in_progress {
            connection.release();
        }
        Ok(())
    }
}

#[async_trait]
pub trait ServerTransport: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Send + 'static;

    /// Waits for the next incoming connection, `None` once the transport is closed.
    async fn receive_connection(&self) -> Result<Option<QuasiConnection<Self::Stream>>, QuasiHttpError>;

    async fn release_connection(&self, connection: &mut QuasiConnection<Self::Stream>) -> Result<(), QuasiHttpError> {
        connection.release();
        Ok(())
    }
}
