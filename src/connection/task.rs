//! Read and write task records.
//!
//! A task is created by a caller thread, pushed onto its queue and from then
//! on advanced only by the worker. Progress lives behind a per-task mutex
//! that is only ever taken by the worker, so it is never contended; the
//! completer sits in its own slot so it can be moved out exactly once.

use crate::completion::Completer;
use crate::error::ConnectionError;
use crate::socket::Socket;

use parking_lot::Mutex;
use std::io;
use tracing::trace;

/// Outcome of advancing a task by one socket call.
pub(crate) enum Progress<T> {
    /// More bytes are needed; the task stays at the head of its queue.
    Pending,
    /// The task finished and is ready to be retired.
    Complete(T),
}

struct ReadState {
    buffer: Option<Vec<u8>>,
    read: usize,
}

/// A pending read of exactly `size` bytes.
pub(crate) struct ReadTask {
    size: usize,
    state: Mutex<ReadState>,
    completer: Mutex<Option<Completer<Vec<u8>>>>,
}

impl ReadTask {
    pub(crate) fn new(size: usize, completer: Completer<Vec<u8>>) -> Self {
        Self {
            size,
            state: Mutex::new(ReadState {
                buffer: None,
                read: 0,
            }),
            completer: Mutex::new(Some(completer)),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    /// Bytes received so far.
    pub(crate) fn progress(&self) -> usize {
        self.state.lock().read
    }

    /// Issues one read of at most `max_chunk` bytes into the task's buffer.
    ///
    /// The buffer is allocated on the first call. Would-block counts as zero
    /// progress. End of stream and any other error are returned as `Err` and
    /// are fatal for the connection.
    pub(crate) fn advance<S: Socket>(
        &self,
        socket: &mut S,
        max_chunk: usize,
    ) -> io::Result<Progress<Vec<u8>>> {
        let mut state = self.state.lock();
        let ReadState { buffer: slot, read } = &mut *state;

        let buffer = slot.get_or_insert_with(|| {
            *read = 0;
            vec![0u8; self.size]
        });

        let chunk = max_chunk.min(self.size - *read);

        match socket.read(&mut buffer[*read..*read + chunk]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                ));
            }
            Ok(received) => *read += received,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(error) => return Err(error),
        }

        trace!(size = self.size, read = *read, "read progress");

        if *read >= self.size {
            return Ok(Progress::Complete(slot.take().unwrap_or_default()));
        }

        Ok(Progress::Pending)
    }

    /// Resolves the caller's handle. Later calls are no-ops.
    pub(crate) fn complete(&self, result: Result<Vec<u8>, ConnectionError>) {
        if let Some(completer) = self.completer.lock().take() {
            completer.complete(result);
        }
    }
}

/// A pending write of an owned buffer.
pub(crate) struct WriteTask {
    data: Vec<u8>,
    written: Mutex<usize>,
    completer: Mutex<Option<Completer<()>>>,
}

impl WriteTask {
    pub(crate) fn new(data: Vec<u8>, completer: Completer<()>) -> Self {
        Self {
            data,
            written: Mutex::new(0),
            completer: Mutex::new(Some(completer)),
        }
    }

    pub(crate) fn size(&self) -> usize {
        self.data.len()
    }

    /// Issues one write of everything not yet transmitted.
    ///
    /// A short write advances the offset so the next attempt resumes after
    /// the bytes the socket already accepted.
    pub(crate) fn advance<S: Socket>(&self, socket: &mut S) -> io::Result<Progress<()>> {
        let mut written = self.written.lock();

        match socket.write(&self.data[*written..]) {
            Ok(sent) => *written += sent,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) => {}
            Err(error) => return Err(error),
        }

        if *written >= self.data.len() {
            return Ok(Progress::Complete(()));
        }

        Ok(Progress::Pending)
    }

    pub(crate) fn complete(&self, result: Result<(), ConnectionError>) {
        if let Some(completer) = self.completer.lock().take() {
            completer.complete(result);
        }
    }
}
