//! Poll-driven transport core for a single IPC socket.
//!
//! A [`Connection`] owns one connection-oriented socket and a dedicated
//! worker thread. Callers on any thread queue reads of an exact size or
//! writes of a fixed buffer and get back a one-shot [`Completion`] that
//! resolves when the worker finishes the task or tears the connection down.
//!
//! # Architecture
//!
//! - **Connection**: caller API (`enqueue_read`, `enqueue_write`, `is_good`,
//!   `request_termination`) and worker thread ownership
//! - **ConnectionBuilder**: fluent configuration (chunk cap, poll timeout,
//!   thread name)
//! - **TaskQueue**: reader/writer-locked FIFO, one for reads, one for writes
//! - **Worker**: polls the socket and advances the head of each queue
//! - **Completion**: one-shot handle, blocking (`wait`) or awaitable
//! - **Socket**: poll/read/write contract, with [`FdSocket`] as the `libc`
//!   implementation
//!
//! # Example
//!
//! ```no_run
//! use ipc_connection::{Connection, FdSocket};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (client, server) = FdSocket::pair()?;
//! let client = Connection::spawn(client)?;
//! let server = Connection::spawn(server)?;
//!
//! client.enqueue_write(b"ping".to_vec());
//! assert_eq!(server.enqueue_read(4).wait()?, b"ping");
//! # Ok(())
//! # }
//! ```

mod builder;
mod completion;
mod connection;
mod error;
pub mod socket;

pub use builder::{ConnectionBuilder, DEFAULT_MAX_CHUNK};
pub use completion::{Completion, ReadHandle, WriteHandle};
pub use connection::Connection;
pub use error::ConnectionError;
pub use socket::{FdSocket, Interest, Notifier, Readiness, Socket};
