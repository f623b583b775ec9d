//! Socket abstraction consumed by the connection worker.
//!
//! This module provides:
//! - [`Socket`]: the poll/read/write contract the worker drives
//! - [`event`]: interest and readiness value types
//! - [`notify`]: the wake-up signal that interrupts a blocking poll
//! - [`fd`]: a non-blocking file descriptor implementation built on `libc`

pub mod event;
pub mod fd;
pub mod notify;

pub use event::{Interest, Readiness};
pub use fd::FdSocket;
pub use notify::Notifier;

use std::io;
use std::time::Duration;

/// A connection-oriented socket operated in non-blocking mode.
///
/// Only the worker thread ever calls these methods. Implementations must
/// report "would block" as [`io::ErrorKind::WouldBlock`] so it can be told
/// apart from a real failure, and `Ok(0)` from [`Socket::read`] means the
/// peer closed its end.
pub trait Socket: Send + 'static {
    /// Waits until the socket is ready for `interest`, a hang-up or error
    /// condition occurs, `notifier` is signalled, or `timeout` elapses.
    ///
    /// `None` blocks indefinitely. A signalled notifier must be drained and
    /// reported through [`Readiness::woken`].
    fn poll(
        &mut self,
        interest: Interest,
        notifier: &Notifier,
        timeout: Option<Duration>,
    ) -> io::Result<Readiness>;

    /// Reads at most `buffer.len()` bytes.
    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize>;

    /// Writes at most `buffer.len()` bytes, returning how many were accepted.
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize>;
}
