//! Connection worker and its task bookkeeping.
//!
//! This module provides:
//! - [`core`]: the [`Connection`] handle and the state shared with the worker
//! - [`queue`]: reader/writer-locked FIFO task queues
//! - [`task`]: read and write task records with their progress counters
//! - [`worker`]: the poll/dispatch loop and teardown

pub(crate) mod core;
pub(crate) mod queue;
pub(crate) mod task;
pub(crate) mod worker;

pub use self::core::Connection;
