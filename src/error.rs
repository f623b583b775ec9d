//! Error type shared by connection handles and setup.

use std::io;

use thiserror::Error;

/// Errors reported by a [`Connection`](crate::Connection) and its handles.
///
/// Socket failures seen by the worker are never surfaced directly. A caller
/// only ever observes [`ConnectionError::Closed`] on a pending handle once the
/// worker has torn the connection down.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection was closed before the task could complete.
    #[error("connection closed")]
    Closed,

    /// The worker thread could not be started.
    #[error("failed to spawn connection worker: {0}")]
    Spawn(#[source] io::Error),

    /// Setting up the socket or its wake-up notifier failed.
    #[error("socket setup failed: {0}")]
    Io(#[from] io::Error),
}

impl ConnectionError {
    /// Returns `true` for the synthetic error delivered at teardown.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
