//! Fluent builder for Connection construction.
//!
//! Provides a builder pattern interface for configuring and spawning the
//! worker that serves a socket.

use crate::connection::Connection;
use crate::connection::core::Shared;
use crate::connection::worker::Worker;
use crate::error::ConnectionError;
use crate::socket::{Notifier, Socket};

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Largest number of bytes a single underlying read may request.
pub const DEFAULT_MAX_CHUNK: usize = 8192;

const DEFAULT_THREAD_NAME: &str = "ipc-worker";

/// Builder for spawning [`Connection`] instances with a fluent API.
///
/// # Example
/// ```no_run
/// use ipc_connection::{ConnectionBuilder, FdSocket};
/// use std::time::Duration;
///
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let (socket, _peer) = FdSocket::pair()?;
///
/// let connection = ConnectionBuilder::new()
///     .max_chunk(4096)
///     .poll_timeout(Some(Duration::from_millis(250)))
///     .thread_name("renderer-ipc")
///     .spawn(socket)?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct ConnectionBuilder {
    max_chunk: usize,
    poll_timeout: Option<Duration>,
    thread_name: String,
}

impl Default for ConnectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionBuilder {
    /// Creates a builder with the default configuration: 8192-byte read
    /// chunks, no poll timeout, and a worker thread named `ipc-worker`.
    pub fn new() -> Self {
        Self {
            max_chunk: DEFAULT_MAX_CHUNK,
            poll_timeout: None,
            thread_name: DEFAULT_THREAD_NAME.to_owned(),
        }
    }

    /// Caps how many bytes one underlying read may request.
    ///
    /// Values below 1 are raised to 1.
    pub fn max_chunk(mut self, max_chunk: usize) -> Self {
        self.max_chunk = max_chunk.max(1);
        self
    }

    /// Bounds how long the worker blocks in a single poll.
    ///
    /// `None` (the default) blocks until readiness or a wake-up. A timeout
    /// only makes the worker re-check its termination flag more often.
    pub fn poll_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Names the worker thread.
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Starts a worker thread serving `socket`.
    ///
    /// # Returns
    /// The connection handle, or [`ConnectionError::Io`] when the wake-up
    /// notifier cannot be created and [`ConnectionError::Spawn`] when the
    /// thread cannot be started.
    pub fn spawn<S: Socket>(self, socket: S) -> Result<Connection, ConnectionError> {
        let notifier = Notifier::new()?;
        let shared = Arc::new(Shared::new(notifier));
        let worker = Worker::new(socket, shared.clone(), self.max_chunk, self.poll_timeout);

        debug!(
            thread = %self.thread_name,
            max_chunk = self.max_chunk,
            poll_timeout = ?self.poll_timeout,
            "spawning connection worker"
        );

        let handle = thread::Builder::new()
            .name(self.thread_name)
            .spawn(move || worker.run())
            .map_err(ConnectionError::Spawn)?;

        Ok(Connection::from_parts(shared, handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let builder = ConnectionBuilder::new();

        assert_eq!(builder.max_chunk, DEFAULT_MAX_CHUNK);
        assert_eq!(builder.poll_timeout, None);
        assert_eq!(builder.thread_name, "ipc-worker");
    }

    #[test]
    fn zero_chunk_is_raised() {
        assert_eq!(ConnectionBuilder::new().max_chunk(0).max_chunk, 1);
    }
}
