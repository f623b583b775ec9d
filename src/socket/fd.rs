//! [`Socket`] implementation over a raw non-blocking file descriptor.

use crate::socket::event::{Interest, Readiness};
use crate::socket::notify::Notifier;
use crate::socket::Socket;

use libc::{
    AF_UNIX, ENOTSOCK, F_GETFL, F_SETFL, MSG_NOSIGNAL, O_NONBLOCK, POLLIN, SOCK_CLOEXEC,
    SOCK_STREAM, c_int, close, fcntl, poll, pollfd, read, send, socketpair, write,
};
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::time::Duration;

/// A connected stream socket (or any pollable descriptor) driven in
/// non-blocking mode.
///
/// The descriptor is closed when the socket is dropped.
///
/// # Examples
///
/// ```no_run
/// use ipc_connection::FdSocket;
/// use std::os::unix::net::UnixStream;
///
/// # fn wrap() -> std::io::Result<()> {
/// let stream = UnixStream::connect("/tmp/ipc.sock")?;
/// let socket = FdSocket::new(stream)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct FdSocket {
    file_descriptor: RawFd,
}

impl FdSocket {
    /// Takes ownership of `fd` and switches it to non-blocking mode.
    pub fn new(fd: impl Into<OwnedFd>) -> io::Result<Self> {
        let file_descriptor = fd.into().into_raw_fd();
        let socket = Self { file_descriptor };

        set_nonblocking(socket.file_descriptor)?;

        Ok(socket)
    }

    /// Creates a connected pair of `AF_UNIX` stream sockets.
    pub fn pair() -> io::Result<(Self, Self)> {
        let mut fds = [0 as c_int; 2];

        let rc = unsafe { socketpair(AF_UNIX, SOCK_STREAM | SOCK_CLOEXEC, 0, fds.as_mut_ptr()) };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }

        let first = Self {
            file_descriptor: fds[0],
        };
        let second = Self {
            file_descriptor: fds[1],
        };

        set_nonblocking(first.file_descriptor)?;
        set_nonblocking(second.file_descriptor)?;

        Ok((first, second))
    }
}

impl Socket for FdSocket {
    fn poll(
        &mut self,
        interest: Interest,
        notifier: &Notifier,
        timeout: Option<Duration>,
    ) -> io::Result<Readiness> {
        let mut fds = [
            pollfd {
                fd: self.file_descriptor,
                events: interest.to_poll_events(),
                revents: 0,
            },
            pollfd {
                fd: notifier.as_raw_fd(),
                events: POLLIN,
                revents: 0,
            },
        ];

        let rc = unsafe { poll(fds.as_mut_ptr(), fds.len() as _, timeout_millis(timeout)) };

        if rc < 0 {
            let error = io::Error::last_os_error();
            if error.kind() == io::ErrorKind::Interrupted {
                return Ok(Readiness::default());
            }

            return Err(error);
        }

        let mut readiness = Readiness::from_revents(fds[0].revents);

        if fds[1].revents & POLLIN != 0 {
            notifier.drain();
            readiness.woken = true;
        }

        Ok(readiness)
    }

    fn read(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let result = unsafe {
            read(
                self.file_descriptor,
                buffer.as_mut_ptr() as *mut _,
                buffer.len(),
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(result as usize)
    }

    /// Sends with `MSG_NOSIGNAL` so a closed peer surfaces as `EPIPE`
    /// instead of raising `SIGPIPE`. Descriptors that are not sockets (pipes)
    /// fall back to a plain `write`.
    fn write(&mut self, buffer: &[u8]) -> io::Result<usize> {
        let result = unsafe {
            send(
                self.file_descriptor,
                buffer.as_ptr() as *const _,
                buffer.len(),
                MSG_NOSIGNAL,
            )
        };

        if result >= 0 {
            return Ok(result as usize);
        }

        let error = io::Error::last_os_error();
        if error.raw_os_error() != Some(ENOTSOCK) {
            return Err(error);
        }

        let result = unsafe {
            write(
                self.file_descriptor,
                buffer.as_ptr() as *const _,
                buffer.len(),
            )
        };

        if result < 0 {
            return Err(io::Error::last_os_error());
        }

        Ok(result as usize)
    }
}

impl AsRawFd for FdSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.file_descriptor
    }
}

impl Drop for FdSocket {
    fn drop(&mut self) {
        unsafe {
            close(self.file_descriptor);
        }
    }
}

/// Converts a poll timeout to milliseconds, rounding up so that a non-zero
/// duration never turns into a non-blocking poll.
fn timeout_millis(timeout: Option<Duration>) -> c_int {
    match timeout {
        Some(duration) => duration
            .as_nanos()
            .div_ceil(1_000_000)
            .min(c_int::MAX as u128) as c_int,
        None => -1,
    }
}

fn set_nonblocking(file_descriptor: RawFd) -> io::Result<()> {
    let flags = unsafe { fcntl(file_descriptor, F_GETFL) };
    if flags < 0 {
        return Err(io::Error::last_os_error());
    }

    let rc = unsafe { fcntl(file_descriptor, F_SETFL, flags | O_NONBLOCK) };
    if rc < 0 {
        return Err(io::Error::last_os_error());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    const NO_WAIT: Option<Duration> = Some(Duration::ZERO);

    #[test]
    fn read_would_block_on_empty_socket() {
        let (mut local, _peer) = FdSocket::pair().unwrap();
        let mut buffer = [0u8; 4];

        let error = local.read(&mut buffer).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::WouldBlock);
    }

    #[test]
    fn poll_reports_readable_after_peer_write() {
        let (mut local, mut peer) = FdSocket::pair().unwrap();
        let notifier = Notifier::new().unwrap();

        let readiness = local.poll(Interest::BOTH, &notifier, NO_WAIT).unwrap();
        assert!(!readiness.readable);
        assert!(readiness.writable);

        assert_eq!(peer.write(b"ping").unwrap(), 4);

        let readiness = local.poll(Interest::BOTH, &notifier, NO_WAIT).unwrap();
        assert!(readiness.readable);

        let mut buffer = [0u8; 8];
        assert_eq!(local.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer[..4], b"ping");
    }

    #[test]
    fn poll_reports_hang_up_without_interest() {
        let (mut local, peer) = FdSocket::pair().unwrap();
        let notifier = Notifier::new().unwrap();

        drop(peer);

        let readiness = local.poll(Interest::NONE, &notifier, NO_WAIT).unwrap();
        assert!(readiness.hang_up);
        assert!(!readiness.readable);
    }

    #[test]
    fn timeout_rounds_up_to_whole_milliseconds() {
        assert_eq!(timeout_millis(None), -1);
        assert_eq!(timeout_millis(Some(Duration::ZERO)), 0);
        assert_eq!(timeout_millis(Some(Duration::from_nanos(1))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_micros(900))), 1);
        assert_eq!(timeout_millis(Some(Duration::from_millis(5))), 5);
        assert_eq!(timeout_millis(Some(Duration::from_micros(1500))), 2);
        assert_eq!(timeout_millis(Some(Duration::MAX)), c_int::MAX);
    }

    #[test]
    fn sub_millisecond_timeout_still_blocks() {
        let (mut local, _peer) = FdSocket::pair().unwrap();
        let notifier = Notifier::new().unwrap();
        let timeout = Some(Duration::from_micros(900));

        let start = Instant::now();
        let mut polls = 0;
        while start.elapsed() < Duration::from_millis(50) {
            let readiness = local.poll(Interest::NONE, &notifier, timeout).unwrap();
            assert_eq!(readiness, Readiness::default());
            polls += 1;
        }

        assert!(polls <= 60, "poll returned early {polls} times in 50ms");
    }

    #[test]
    fn write_to_closed_peer_reports_broken_pipe() {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }

        let (mut local, peer) = FdSocket::pair().unwrap();
        drop(peer);

        let error = local.write(b"hello").unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn write_falls_back_for_pipes() {
        let mut fds = [0 as c_int; 2];
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);

        let mut reader = FdSocket {
            file_descriptor: fds[0],
        };
        let mut writer = FdSocket {
            file_descriptor: fds[1],
        };

        assert_eq!(writer.write(b"pipe").unwrap(), 4);

        let mut buffer = [0u8; 4];
        assert_eq!(reader.read(&mut buffer).unwrap(), 4);
        assert_eq!(&buffer, b"pipe");
    }

    #[test]
    fn poll_is_interrupted_by_notifier() {
        let (mut local, _peer) = FdSocket::pair().unwrap();
        let notifier = Notifier::new().unwrap();

        notifier.notify();

        let readiness = local.poll(Interest::NONE, &notifier, None).unwrap();
        assert!(readiness.woken);

        let readiness = local.poll(Interest::NONE, &notifier, NO_WAIT).unwrap();
        assert!(!readiness.woken);
    }
}
