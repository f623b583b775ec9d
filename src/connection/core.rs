//! Caller-facing connection handle.
//!
//! A [`Connection`] owns the worker thread serving one socket and exposes the
//! enqueue API. All state shared with the worker lives in [`Shared`].

use crate::builder::ConnectionBuilder;
use crate::completion::{self, ReadHandle, WriteHandle};
use crate::connection::queue::TaskQueue;
use crate::connection::task::{ReadTask, WriteTask};
use crate::error::ConnectionError;
use crate::socket::{Notifier, Socket};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, error};

/// State shared between caller threads and the worker.
pub(crate) struct Shared {
    pub(crate) reads: TaskQueue<ReadTask>,
    pub(crate) writes: TaskQueue<WriteTask>,
    pub(crate) notifier: Notifier,
    good: AtomicBool,
    terminated: AtomicBool,
}

impl Shared {
    pub(crate) fn new(notifier: Notifier) -> Self {
        Self {
            reads: TaskQueue::new(),
            writes: TaskQueue::new(),
            notifier,
            good: AtomicBool::new(true),
            terminated: AtomicBool::new(false),
        }
    }

    pub(crate) fn is_good(&self) -> bool {
        self.good.load(Ordering::Acquire)
    }

    pub(crate) fn set_good(&self, good: bool) {
        self.good.store(good, Ordering::Release);
    }

    pub(crate) fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::Acquire)
    }

    pub(crate) fn terminate(&self) {
        self.terminated.store(true, Ordering::Release);
        self.notifier.notify();
    }

    /// Closes both queues, dropping pending writes and failing pending reads.
    ///
    /// # Returns
    /// The number of `(reads, writes)` that were still queued.
    pub(crate) fn flush(&self) -> (usize, usize) {
        self.set_good(false);

        let writes = self.writes.close();
        for task in &writes {
            task.complete(Err(ConnectionError::Closed));
        }

        let reads = self.reads.close();
        for task in &reads {
            task.complete(Err(ConnectionError::Closed));
        }

        (reads.len(), writes.len())
    }

    pub(crate) fn enqueue_read(&self, size: usize) -> ReadHandle {
        let (completer, handle) = completion::channel();

        if size == 0 {
            completer.complete(Ok(Vec::new()));
            return handle;
        }

        match self.reads.push(Arc::new(ReadTask::new(size, completer))) {
            Ok(()) => self.notifier.notify(),
            Err(task) => {
                debug!(size, "connection closed; rejecting read");
                task.complete(Err(ConnectionError::Closed));
            }
        }

        handle
    }

    pub(crate) fn enqueue_write(&self, data: Vec<u8>) -> WriteHandle {
        let (completer, handle) = completion::channel();

        if data.is_empty() {
            completer.complete(Ok(()));
            return handle;
        }

        match self.writes.push(Arc::new(WriteTask::new(data, completer))) {
            Ok(()) => self.notifier.notify(),
            Err(task) => {
                debug!(size = task.size(), "connection closed; rejecting write");
                task.complete(Err(ConnectionError::Closed));
            }
        }

        handle
    }
}

/// One IPC connection served by a dedicated worker thread.
///
/// Reads and writes may be enqueued from any thread. Each queue is serviced
/// in FIFO order. The socket itself is only ever touched by the worker.
///
/// Dropping the connection requests termination and waits for the worker,
/// which fails every pending read with [`ConnectionError::Closed`].
///
/// # Examples
///
/// ```no_run
/// use ipc_connection::{Connection, FdSocket};
/// use std::os::unix::net::UnixStream;
///
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let stream = UnixStream::connect("/tmp/ipc.sock")?;
/// let connection = Connection::spawn(FdSocket::new(stream)?)?;
///
/// connection.enqueue_write(b"hello".to_vec());
/// let reply = connection.enqueue_read(5).wait()?;
/// # Ok(())
/// # }
/// ```
pub struct Connection {
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl Connection {
    /// Spawns a worker with the default configuration.
    ///
    /// Shorthand for `ConnectionBuilder::new().spawn(socket)`.
    pub fn spawn<S: Socket>(socket: S) -> Result<Self, ConnectionError> {
        ConnectionBuilder::new().spawn(socket)
    }

    pub(crate) fn from_parts(shared: Arc<Shared>, worker: JoinHandle<()>) -> Self {
        Self {
            shared,
            worker: Some(worker),
        }
    }

    /// Queues a read of exactly `size` bytes.
    ///
    /// The handle resolves with a buffer of length `size`, or with
    /// [`ConnectionError::Closed`] if the connection goes away first. A
    /// zero-length read resolves immediately.
    pub fn enqueue_read(&self, size: usize) -> ReadHandle {
        self.shared.enqueue_read(size)
    }

    /// Queues `data` for transmission.
    ///
    /// The handle may be dropped for fire-and-forget use. If kept, it
    /// resolves once every byte has been written, or with
    /// [`ConnectionError::Closed`] when the write was still queued at teardown.
    pub fn enqueue_write(&self, data: impl Into<Vec<u8>>) -> WriteHandle {
        self.shared.enqueue_write(data.into())
    }

    /// Returns `false` once the connection hit a hang-up, an error, or the
    /// worker has stopped.
    pub fn is_good(&self) -> bool {
        self.shared.is_good()
    }

    /// Number of reads still queued, including a partially filled head.
    pub fn pending_reads(&self) -> usize {
        self.shared.reads.len()
    }

    /// Number of writes still queued, including a partially sent head.
    pub fn pending_writes(&self) -> usize {
        self.shared.writes.len()
    }

    /// Asks the worker to stop at its next check and interrupts its poll.
    pub fn request_termination(&self) {
        debug!("termination requested");
        self.shared.terminate();
    }

    /// Returns `true` once the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .is_none_or(|worker| worker.is_finished())
    }

    /// Waits for the worker to exit on its own (hang-up, error, or an earlier
    /// termination request).
    pub fn join(mut self) {
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            error!("connection worker panicked");
            self.shared.flush();
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if self.worker.is_some() {
            self.shared.terminate();
            self.join_worker();
        }
    }
}
