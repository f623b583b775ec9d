//! One-shot completion handles connecting the worker to waiting callers.
//!
//! Every queued task carries a [`Completer`], the resolving half. The caller
//! keeps the matching [`Completion`] and either blocks on it with
//! [`Completion::wait`] or awaits it as a [`Future`].
//!
//! # How Completion Works
//!
//! 1. [`channel`] creates the pair around a shared result slot
//! 2. The completer is moved into the task record held by the queue
//! 3. The worker consumes the completer with [`Completer::complete`]
//! 4. The result is stored, blocked waiters are notified and the registered
//!    waker (if any) is woken
//!
//! A completer that is dropped without being used resolves its handle with
//! [`ConnectionError::Closed`], so a handle can never stay pending once its
//! task is gone.

use crate::error::ConnectionError;

use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

/// Handle resolved with the bytes of a completed read.
pub type ReadHandle = Completion<Vec<u8>>;

/// Handle resolved once a queued write has been fully transmitted.
pub type WriteHandle = Completion<()>;

struct State<T> {
    result: Option<Result<T, ConnectionError>>,
    completed: bool,
    waker: Option<Waker>,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    ready: Condvar,
}

/// Creates a linked completer/completion pair.
pub(crate) fn channel<T>() -> (Completer<T>, Completion<T>) {
    let shared = Arc::new(Shared {
        state: Mutex::new(State {
            result: None,
            completed: false,
            waker: None,
        }),
        ready: Condvar::new(),
    });

    (
        Completer {
            shared: Some(shared.clone()),
        },
        Completion { shared },
    )
}

/// Resolving half of a completion pair. Owned by exactly one task record.
pub(crate) struct Completer<T> {
    shared: Option<Arc<Shared<T>>>,
}

impl<T> Completer<T> {
    /// Resolves the paired handle, consuming the completer.
    pub(crate) fn complete(mut self, result: Result<T, ConnectionError>) {
        self.resolve(result);
    }

    fn resolve(&mut self, result: Result<T, ConnectionError>) {
        let Some(shared) = self.shared.take() else {
            return;
        };

        let waker = {
            let mut state = shared.state.lock();
            state.result = Some(result);
            state.completed = true;
            state.waker.take()
        };

        shared.ready.notify_all();

        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Drop for Completer<T> {
    fn drop(&mut self) {
        self.resolve(Err(ConnectionError::Closed));
    }
}

/// Caller half of a completion pair.
///
/// Resolves exactly once, either with the task's value or with
/// [`ConnectionError::Closed`] when the connection is torn down first.
///
/// # Examples
///
/// ```no_run
/// use ipc_connection::{Connection, FdSocket};
/// use std::os::unix::net::UnixStream;
///
/// # fn demo() -> Result<(), Box<dyn std::error::Error>> {
/// let (local, _peer) = UnixStream::pair()?;
/// let connection = Connection::spawn(FdSocket::new(local)?)?;
///
/// let header = connection.enqueue_read(16).wait()?;
/// assert_eq!(header.len(), 16);
/// # Ok(())
/// # }
/// ```
pub struct Completion<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Completion<T> {
    /// Returns `true` once the handle has been resolved.
    pub fn is_ready(&self) -> bool {
        self.shared.state.lock().completed
    }

    /// Blocks the current thread until the handle resolves.
    ///
    /// A handle whose value was already taken by polling it as a [`Future`]
    /// returns [`ConnectionError::Closed`].
    pub fn wait(self) -> Result<T, ConnectionError> {
        let mut state = self.shared.state.lock();

        while !state.completed {
            self.shared.ready.wait(&mut state);
        }

        take_result(&mut state)
    }

    /// Blocks for at most `timeout`.
    ///
    /// Gives the handle back as `Err(self)` when it did not resolve in time,
    /// so the caller can keep waiting later.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Result<T, ConnectionError>, Self> {
        let deadline = Instant::now() + timeout;

        let result = {
            let mut state = self.shared.state.lock();

            while !state.completed {
                if self.shared.ready.wait_until(&mut state, deadline).timed_out() {
                    break;
                }
            }

            if state.completed {
                Some(take_result(&mut state))
            } else {
                None
            }
        };

        result.ok_or(self)
    }
}

/// Moves the result out. Once taken, the handle is fused to `Closed`.
fn take_result<T>(state: &mut State<T>) -> Result<T, ConnectionError> {
    state.result.take().unwrap_or(Err(ConnectionError::Closed))
}

impl<T> Future for Completion<T> {
    type Output = Result<T, ConnectionError>;

    /// Registers the waker under the same lock that guards the result, so a
    /// resolution racing with this poll is never missed.
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut state = self.shared.state.lock();

        if state.completed {
            return Poll::Ready(take_result(&mut state));
        }

        let stale = state
            .waker
            .as_ref()
            .is_none_or(|waker| !waker.will_wake(cx.waker()));

        if stale {
            state.waker = Some(cx.waker().clone());
        }

        Poll::Pending
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("ready", &self.is_ready())
            .finish()
    }
}
