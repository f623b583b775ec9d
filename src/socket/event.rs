//! Poll interest and readiness wrappers.

use libc::{POLLERR, POLLHUP, POLLIN, POLLNVAL, POLLOUT};

/// Readiness the worker asks the socket about.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Interest {
    pub read: bool,
    pub write: bool,
}

impl Interest {
    pub const NONE: Self = Self {
        read: false,
        write: false,
    };

    pub const BOTH: Self = Self {
        read: true,
        write: true,
    };

    pub(crate) fn to_poll_events(self) -> i16 {
        let mut events = 0;

        if self.read {
            events |= POLLIN;
        }

        if self.write {
            events |= POLLOUT;
        }

        events
    }
}

/// Conditions reported by one call to [`Socket::poll`](crate::Socket::poll).
///
/// `hang_up` and `error` are reported whatever the requested interest was.
/// `woken` means the poll was interrupted through the connection's
/// [`Notifier`](crate::Notifier) rather than by the socket itself.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Readiness {
    pub readable: bool,
    pub writable: bool,
    pub hang_up: bool,
    pub error: bool,
    pub woken: bool,
}

impl Readiness {
    pub const READABLE: Self = Self {
        readable: true,
        writable: false,
        hang_up: false,
        error: false,
        woken: false,
    };

    pub const WRITABLE: Self = Self {
        readable: false,
        writable: true,
        hang_up: false,
        error: false,
        woken: false,
    };

    pub const HANG_UP: Self = Self {
        readable: false,
        writable: false,
        hang_up: true,
        error: false,
        woken: false,
    };

    pub const ERROR: Self = Self {
        readable: false,
        writable: false,
        hang_up: false,
        error: true,
        woken: false,
    };

    /// Merges two readiness reports.
    pub const fn union(self, other: Self) -> Self {
        Self {
            readable: self.readable || other.readable,
            writable: self.writable || other.writable,
            hang_up: self.hang_up || other.hang_up,
            error: self.error || other.error,
            woken: self.woken || other.woken,
        }
    }

    pub(crate) fn from_revents(revents: i16) -> Self {
        Self {
            readable: revents & POLLIN != 0,
            writable: revents & POLLOUT != 0,
            hang_up: revents & POLLHUP != 0,
            // An invalid descriptor can never recover; treat it like POLLERR.
            error: revents & (POLLERR | POLLNVAL) != 0,
            woken: false,
        }
    }
}
