//! Cross-thread wake-up for a blocked worker.
//!
//! Backed by a non-blocking Linux `eventfd`. Caller threads call
//! [`Notifier::notify`] after enqueueing work or requesting termination;
//! the socket's poll watches the descriptor and the worker drains it.

use libc::{EFD_CLOEXEC, EFD_NONBLOCK, close, eventfd, read, write};
use std::io;
use std::os::fd::{AsRawFd, RawFd};

/// Wake-up signal that interrupts a blocking [`Socket::poll`](crate::Socket::poll).
#[derive(Debug)]
pub struct Notifier {
    file_descriptor: RawFd,
}

impl Notifier {
    pub fn new() -> io::Result<Self> {
        let file_descriptor = unsafe { eventfd(0, EFD_NONBLOCK | EFD_CLOEXEC) };

        if file_descriptor < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(Self { file_descriptor })
    }

    /// Makes the next (or current) poll return with `woken` set.
    pub fn notify(&self) {
        let value: u64 = 1;

        // EAGAIN means the counter is saturated, which still wakes the poller.
        unsafe {
            write(
                self.file_descriptor,
                &value as *const u64 as *const _,
                size_of::<u64>(),
            );
        }
    }

    /// Resets the counter so the descriptor stops reporting readable.
    pub fn drain(&self) {
        let mut value: u64 = 0;

        unsafe {
            read(
                self.file_descriptor,
                &mut value as *mut u64 as *mut _,
                size_of::<u64>(),
            );
        }
    }
}

impl AsRawFd for Notifier {
    fn as_raw_fd(&self) -> RawFd {
        self.file_descriptor
    }
}

impl Drop for Notifier {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}
