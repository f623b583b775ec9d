//! Reader/writer-locked FIFO queue for pending read and write tasks.
//!
//! Caller threads push tasks concurrently; only the worker inspects and pops
//! the head. The lock guards queue membership only and is never held across
//! a socket call: [`TaskQueue::front`] hands out a reference-counted pointer
//! to the head so the worker can release the lock before doing I/O.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

struct Inner<T> {
    tasks: VecDeque<Arc<T>>,
    closed: bool,
}

/// A thread-safe FIFO queue of tasks.
///
/// Uses a `RwLock`-wrapped `VecDeque`: `front` and `is_empty` take the shared
/// lock, `push`, `pop` and `close` take the exclusive one.
pub(crate) struct TaskQueue<T> {
    inner: RwLock<Inner<T>>,
}

impl<T> TaskQueue<T> {
    /// Creates a new empty, open queue.
    pub(crate) fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                tasks: VecDeque::new(),
                closed: false,
            }),
        }
    }

    /// Appends a task to the tail of the queue.
    ///
    /// # Returns
    /// `Err(task)` when the queue has already been closed by teardown; the
    /// caller gets the task back so it can fail it.
    pub(crate) fn push(&self, task: Arc<T>) -> Result<(), Arc<T>> {
        let mut inner = self.inner.write();

        if inner.closed {
            return Err(task);
        }

        inner.tasks.push_back(task);

        Ok(())
    }

    /// Returns the head of the queue without removing it.
    ///
    /// # Panics
    /// Panics if the queue is empty. The worker always checks
    /// [`TaskQueue::is_empty`] first.
    pub(crate) fn front(&self) -> Arc<T> {
        self.inner
            .read()
            .tasks
            .front()
            .cloned()
            .expect("front() called on an empty task queue")
    }

    /// Removes and returns the head of the queue.
    ///
    /// # Panics
    /// Panics if the queue is empty.
    pub(crate) fn pop(&self) -> Arc<T> {
        self.inner
            .write()
            .tasks
            .pop_front()
            .expect("pop() called on an empty task queue")
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.inner.read().tasks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().tasks.len()
    }

    /// Closes the queue and drains every remaining task, in FIFO order.
    ///
    /// Later pushes are refused.
    pub(crate) fn close(&self) -> Vec<Arc<T>> {
        let mut inner = self.inner.write();
        inner.closed = true;

        inner.tasks.drain(..).collect()
    }
}
