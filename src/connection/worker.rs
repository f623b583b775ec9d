//! The worker loop that owns the socket.
//!
//! Each iteration blocks in [`Socket::poll`], then advances at most the head
//! of the write queue and the head of the read queue by one socket call each.
//! The loop ends on a termination request, a fatal read error, a socket error
//! condition, or a hang-up with nothing left to drain. Teardown always runs
//! afterwards and resolves every pending handle.

use crate::connection::core::Shared;
use crate::connection::task::Progress;
use crate::error::ConnectionError;
use crate::socket::{Interest, Socket};

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

pub(crate) struct Worker<S: Socket> {
    socket: S,
    shared: Arc<Shared>,
    max_chunk: usize,
    poll_timeout: Option<Duration>,
}

impl<S: Socket> Worker<S> {
    pub(crate) fn new(
        socket: S,
        shared: Arc<Shared>,
        max_chunk: usize,
        poll_timeout: Option<Duration>,
    ) -> Self {
        Self {
            socket,
            shared,
            max_chunk: max_chunk.max(1),
            poll_timeout,
        }
    }

    /// Runs the loop until it stops, then tears the connection down.
    pub(crate) fn run(mut self) {
        debug!(max_chunk = self.max_chunk, "connection worker started");
        self.shared.set_good(true);

        while !self.shared.is_terminated() {
            if self.iterate().is_break() {
                break;
            }
        }

        self.teardown();
    }

    /// One poll/dispatch round.
    pub(crate) fn iterate(&mut self) -> ControlFlow<()> {
        // Only ask for readiness we can act on; enqueueing signals the
        // notifier so the interest is recomputed.
        let interest = Interest {
            read: !self.shared.reads.is_empty(),
            write: !self.shared.writes.is_empty(),
        };

        let readiness = match self
            .socket
            .poll(interest, &self.shared.notifier, self.poll_timeout)
        {
            Ok(readiness) => readiness,
            Err(error) => {
                error!(%error, errno = error.raw_os_error(), "poll() failed; closing connection");
                self.shared.set_good(false);
                return ControlFlow::Break(());
            }
        };

        let can_read = readiness.readable;
        let can_write = readiness.writable;

        if can_write && !self.shared.writes.is_empty() {
            self.service_write();
        }

        if can_read && !self.shared.reads.is_empty() {
            self.service_read()?;
        }

        if readiness.hang_up {
            info!("POLLHUP set");
            self.shared.set_good(false);

            if self.shared.reads.is_empty() || !can_read {
                info!("POLLHUP set; closing connection");
                return ControlFlow::Break(());
            }
        }

        if readiness.error {
            error!("POLLERR set; closing connection");
            return ControlFlow::Break(());
        }

        ControlFlow::Continue(())
    }

    fn service_write(&mut self) {
        let task = self.shared.writes.front();

        match task.advance(&mut self.socket) {
            Ok(Progress::Complete(())) => {
                self.shared.writes.pop().complete(Ok(()));
            }
            Ok(Progress::Pending) => {}
            Err(error) => {
                // The task stays at the head and is retried on the next
                // writable event.
                error!(
                    %error,
                    errno = error.raw_os_error(),
                    size = task.size(),
                    "write() failed"
                );
            }
        }
    }

    fn service_read(&mut self) -> ControlFlow<()> {
        let task = self.shared.reads.front();

        match task.advance(&mut self.socket, self.max_chunk) {
            Ok(Progress::Complete(buffer)) => {
                self.shared.reads.pop().complete(Ok(buffer));
            }
            Ok(Progress::Pending) => {}
            Err(error) => {
                error!(
                    %error,
                    errno = error.raw_os_error(),
                    size = task.size(),
                    read = task.progress(),
                    "read() failed"
                );
                self.shared.set_good(false);
                return ControlFlow::Break(());
            }
        }

        ControlFlow::Continue(())
    }

    fn teardown(&mut self) {
        let (pending_reads, pending_writes) = self.shared.flush();

        debug!(
            pending_reads,
            pending_writes, "connection worker stopped; unfinished tasks flushed"
        );

        if pending_reads > 0 {
            info!(
                pending_reads,
                error = %ConnectionError::Closed,
                "failed pending reads"
            );
        }
    }
}
