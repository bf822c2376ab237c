use std::time::Duration;

use tokio::select;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::ConnectionRole;
use crate::protocol::QuasiHttpError;

/// Deadline shared by every operation of one exchange.
///
/// Cloning yields another handle on the same deadline. A disabled timer never
/// expires, so [`race`](Self::race) simply awaits the operation.
#[derive(Debug, Clone)]
pub struct ExchangeTimer {
    role: ConnectionRole,
    expired: Option<CancellationToken>,
}

impl ExchangeTimer {
    pub fn disabled(role: ConnectionRole) -> Self {
        Self { role, expired: None }
    }

    /// Starts the countdown on a background task which fires the deadline.
    ///
    /// Aborting the returned handle stops the countdown without expiring the timer.
    pub fn start(role: ConnectionRole, timeout: Duration) -> (Self, JoinHandle<()>) {
        let expired = CancellationToken::new();
        let fire = expired.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            debug!(?role, ?timeout, "exchange deadline reached");
            fire.cancel();
        });
        (Self { role, expired: Some(expired) }, task)
    }

    pub fn role(&self) -> ConnectionRole {
        self.role
    }

    pub fn is_expired(&self) -> bool {
        self.expired.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Runs `operation` until it settles or the deadline passes, whichever is first.
    ///
    /// On expiry the operation is dropped mid-flight and a timeout error is
    /// returned, "send timeout" for clients and "receive timeout" for servers.
    pub async fn race<F, T>(&self, operation: F) -> Result<T, QuasiHttpError>
    where
        F: Future<Output = Result<T, QuasiHttpError>>,
    {
        let Some(expired) = &self.expired else {
            return operation.await;
        };

        select! {
            biased;
            result = operation => result,
            () = expired.cancelled() => {
                warn!(role = ?self.role, "exchange timed out");
                Err(QuasiHttpError::timeout(self.role))
            }
        }
    }
}
