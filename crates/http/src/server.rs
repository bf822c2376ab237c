//! Server façade: accepts connections and runs one exchange on each.

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::application::Application;
use crate::connection::QuasiConnection;
use crate::exchange::receive;
use crate::protocol::QuasiHttpError;
use crate::transport::ServerTransport;

/// Serves quasi-HTTP requests arriving through a [`ServerTransport`] with an [`Application`].
///
/// The whole exchange, from reading the request to writing the response,
/// runs against the connection's deadline. The connection is released on
/// every path; a release failure while aborting is logged, never returned
/// in place of the original error.
#[derive(Debug)]
pub struct QuasiServer<T, A> {
    transport: Arc<T>,
    application: Arc<A>,
}

impl<T, A> Clone for QuasiServer<T, A> {
    fn clone(&self) -> Self {
        Self { transport: Arc::clone(&self.transport), application: Arc::clone(&self.application) }
    }
}

impl<T, A> QuasiServer<T, A>
where
    T: ServerTransport + 'static,
    A: Application + 'static,
{
    pub fn new(transport: T, application: A) -> Self {
        Self { transport: Arc::new(transport), application: Arc::new(application) }
    }

    pub fn builder() -> QuasiServerBuilder<T, A> {
        QuasiServerBuilder { transport: None, application: None }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn application(&self) -> &A {
        &self.application
    }

    /// Runs a single exchange on `connection`.
    pub async fn accept_connection(&self, mut connection: QuasiConnection<T::Stream>) -> Result<(), QuasiHttpError> {
        let timer = connection.timer().clone();
        match timer.race(receive(&mut connection, self.application.as_ref())).await {
            Ok(()) => {
                let released = self.transport.release_connection(&mut connection).await;
                connection.release();
                released
            }
            Err(e) => {
                warn!(cause = %e, "exchange failed, aborting connection");
                if let Err(release_error) = self.transport.release_connection(&mut connection).await {
                    warn!(cause = %release_error, "connection release failed while aborting");
                }
                connection.release();
                Err(e)
            }
        }
    }

    /// Accepts connections until the transport closes, serving each on its own task.
    pub async fn serve(&self) -> Result<(), QuasiHttpError> {
        info!("server started");
        while let Some(connection) = self.transport.receive_connection().await? {
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.accept_connection(connection).await {
                    error!(cause = %e, "failed to serve connection");
                }
            });
        }
        info!("transport closed, server stopped");
        Ok(())
    }
}

#[derive(Debug)]
pub struct QuasiServerBuilder<T, A> {
    transport: Option<T>,
    application: Option<A>,
}

impl<T, A> QuasiServerBuilder<T, A>
where
    T: ServerTransport + 'static,
    A: Application + 'static,
{
    pub fn transport(mut self, transport: T) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn application(mut self, application: A) -> Self {
        self.application = Some(application);
        self
    }

    pub fn build(self) -> Result<QuasiServer<T, A>, QuasiHttpError> {
        let transport = self.transport.ok_or_else(|| QuasiHttpError::missing_dependency("transport"))?;
        let application = self.application.ok_or_else(|| QuasiHttpError::missing_dependency("application"))?;
        Ok(QuasiServer::new(transport, application))
    }
}
