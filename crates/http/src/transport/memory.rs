//! In-process transport over [`tokio::io::duplex`] pipes.
//!
//! ```
//! use quasi_http::protocol::ProcessingOptions;
//! use quasi_http::transport::memory::{MemoryClientTransport, MemoryServerTransport};
//!
//! let (server_transport, connector) = MemoryServerTransport::channel(ProcessingOptions::default());
//! let client_transport = MemoryClientTransport::new().with_endpoint("echo", connector);
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, trace};

use super::{ClientTransport, ServerTransport};
use crate::connection::{ConnectionRole, QuasiConnection};
use crate::protocol::{Environment, ProcessingOptions, QuasiHttpError};

/// Environment key holding the endpoint name a connection was made for.
pub const ENDPOINT_ENV_KEY: &str = "endpoint";

const PIPE_CAPACITY: usize = 64 * 1024;
const PENDING_CONNECTIONS: usize = 64;

/// Hands pipe ends to a [`MemoryServerTransport`]; cheap to clone.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    sender: mpsc::Sender<(DuplexStream, String)>,
}

#[derive(Debug)]
pub struct MemoryServerTransport {
    incoming: Mutex<mpsc::Receiver<(DuplexStream, String)>>,
    options: ProcessingOptions,
}

impl MemoryServerTransport {
    /// Creates a server transport whose connections use `options`, and the
    /// connector clients reach it through.
    ///
    /// The transport closes once every connector is dropped.
    pub fn channel(options: ProcessingOptions) -> (Self, MemoryConnector) {
        let (sender, receiver) = mpsc::channel(PENDING_CONNECTIONS);
        (Self { incoming: Mutex::new(receiver), options }, MemoryConnector { sender })
    }
}

#[async_trait]
impl ServerTransport for MemoryServerTransport {
    type Stream = DuplexStream;

    async fn receive_connection(&self) -> Result<Option<QuasiConnection<DuplexStream>>, QuasiHttpError> {
        let Some((stream, endpoint)) = self.incoming.lock().await.recv().await else {
            debug!("memory transport closed");
            return Ok(None);
        };

        trace!(endpoint = %endpoint, "accepted memory connection");
        let environment = Environment::from([(ENDPOINT_ENV_KEY.to_string(), endpoint.into())]);
        Ok(Some(QuasiConnection::new(stream, ConnectionRole::Server, &self.options, environment)))
    }
}

/// Client transport resolving endpoint names to registered servers.
#[derive(Debug, Default, Clone)]
pub struct MemoryClientTransport {
    endpoints: HashMap<String, MemoryConnector>,
}

impl MemoryClientTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_endpoint<N: Into<String>>(mut self, name: N, connector: MemoryConnector) -> Self {
        self.endpoints.insert(name.into(), connector);
        self
    }
}

#[async_trait]
impl ClientTransport for MemoryClientTransport {
    type Stream = DuplexStream;
    type Endpoint = str;

    async fn allocate_connection(
        &self,
        endpoint: &str,
        options: &ProcessingOptions,
    ) -> Result<QuasiConnection<DuplexStream>, QuasiHttpError> {
        let connector = self
            .endpoints
            .get(endpoint)
            .ok_or_else(|| QuasiHttpError::processing(format!("unknown memory endpoint: {endpoint}")))?;

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        connector
            .sender
            .send((server, endpoint.to_string()))
            .await
            .map_err(|_closed| QuasiHttpError::processing(format!("memory endpoint {endpoint} is closed")))?;

        trace!(endpoint = %endpoint, "allocated memory connection");
        let environment = Environment::from([(ENDPOINT_ENV_KEY.to_string(), endpoint.into())]);
        Ok(QuasiConnection::new(client, ConnectionRole::Client, options, environment))
    }
}
