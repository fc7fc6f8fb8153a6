//! Supervisor side of the notify protocol.
//!
//! The supervisor is an ordinary, unrestricted process holding the
//! transferred listener descriptor. It blocks until the restricted
//! process trips a `Notify` rule, answers the suspended call through a
//! handler, and loops. Because no filter applies here, the handler can
//! perform whatever real work satisfies the call's intent and return a
//! genuine result; the kernel resumes the original call with it.
//!
//! One request is outstanding at a time. Concurrent notifications from a
//! multithreaded target serialize on the listener; supporting them in
//! parallel would mean keying in-flight requests by notification id.
//! There is no timeout: an implementation adding one should answer the
//! orphaned request with an error rather than leave the caller suspended.

use std::os::fd::{AsRawFd, OwnedFd};

use rustix::io::Errno;
use thiserror::Error;

use packshim_sys::seccomp_notify::{notif_recv, notif_send, SeccompNotif, SeccompNotifResp};

/// One intercepted syscall, as read from the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Kernel-assigned request id; the answer must echo it.
    pub id: u64,
    /// The restricted process, as seen from the supervisor.
    pub pid: u32,
    /// Blocked syscall number.
    pub syscall: i32,
    /// Raw syscall arguments. Pointer arguments refer to the restricted
    /// process's memory, not ours.
    pub args: [u64; 6],
}

/// Answer for one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub id: u64,
    pub value: i64,
    /// Negated errno, or 0 for success.
    pub error: i32,
    pub flags: u32,
}

impl Response {
    /// Successful completion with `value`.
    pub fn value(notification: &Notification, value: i64) -> Self {
        Self {
            id: notification.id,
            value,
            error: 0,
            flags: 0,
        }
    }

    /// Fail the call with `errno`.
    pub fn errno(notification: &Notification, errno: i32) -> Self {
        Self {
            id: notification.id,
            value: 0,
            error: -errno,
            flags: 0,
        }
    }
}

/// What became of one notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Answer delivered; the restricted call resumed with it.
    Answered { pid: u32, syscall: i32 },
    /// The restricted process vanished between receive and send. The
    /// answer had no waiter; reported, never retried.
    Orphaned { pid: u32, syscall: i32 },
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("notification channel failed: {0}")]
    Channel(Errno),
}

/// Notification loop over a transferred listener descriptor.
pub struct Supervisor {
    listener: OwnedFd,
}

impl Supervisor {
    pub fn new(listener: OwnedFd) -> Self {
        Self { listener }
    }

    /// Block for one notification and answer it with `handler`.
    ///
    /// Returns `Ok(None)` when the restricted process is gone and no
    /// notification remains.
    ///
    /// # Errors
    ///
    /// Channel failures other than the target disappearing.
    pub fn handle_one(
        &self,
        handler: impl FnOnce(&Notification) -> Response,
    ) -> Result<Option<SupervisorEvent>, SupervisorError> {
        let mut raw = SeccompNotif::default();
        if let Err(e) = notif_recv(self.listener.as_raw_fd(), &mut raw) {
            if e == Errno::NOENT {
                return Ok(None);
            }
            return Err(SupervisorError::Channel(e));
        }

        let notification = Notification {
            id: raw.id,
            pid: raw.pid,
            syscall: raw.data.nr,
            args: raw.data.args,
        };
        tracing::debug!(
            pid = notification.pid,
            syscall = notification.syscall,
            "intercepted syscall"
        );

        let response = handler(&notification);
        debug_assert_eq!(response.id, notification.id);

        let raw_response = SeccompNotifResp {
            id: response.id,
            val: response.value,
            error: response.error,
            flags: response.flags,
        };
        match notif_send(self.listener.as_raw_fd(), &raw_response) {
            Ok(()) => Ok(Some(SupervisorEvent::Answered {
                pid: notification.pid,
                syscall: notification.syscall,
            })),
            Err(e) if e == Errno::NOENT => {
                tracing::warn!(
                    pid = notification.pid,
                    syscall = notification.syscall,
                    "restricted process gone before response"
                );
                Ok(Some(SupervisorEvent::Orphaned {
                    pid: notification.pid,
                    syscall: notification.syscall,
                }))
            }
            Err(e) => Err(SupervisorError::Channel(e)),
        }
    }

    /// Serve notifications until the restricted process exits.
    ///
    /// # Errors
    ///
    /// First channel failure, if any.
    pub fn serve(
        &self,
        mut handler: impl FnMut(&Notification) -> Response,
    ) -> Result<(), SupervisorError> {
        while self.handle_one(&mut handler)?.is_some() {}
        Ok(())
    }
}

/// Baseline answer policy.
///
/// `getpid` is answered with the restricted process's real pid - known
/// from the notification itself; the supervisor's own pid would be wrong.
/// Every other call fails with the conventional "not implemented" error,
/// which is exactly what the errno filter would have produced. Embedders
/// with richer needs supply their own handler to [`Supervisor::serve`].
pub fn default_answer(notification: &Notification) -> Response {
    match i64::from(notification.syscall) {
        libc::SYS_getpid => Response::value(notification, i64::from(notification.pid)),
        _ => Response::errno(notification, libc::ENOSYS),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification(id: u64, pid: u32, syscall: i64) -> Notification {
        Notification {
            id,
            pid,
            syscall: syscall as i32,
            args: [0; 6],
        }
    }

    #[test]
    fn getpid_is_answered_with_the_callers_pid() {
        let request = notification(7, 1234, libc::SYS_getpid);
        let answer = default_answer(&request);
        assert_eq!(
            answer,
            Response {
                id: 7,
                value: 1234,
                error: 0,
                flags: 0
            }
        );
    }

    #[test]
    fn unknown_syscalls_fail_with_enosys() {
        let request = notification(9, 42, libc::SYS_clone3);
        let answer = default_answer(&request);
        assert_eq!(answer.id, 9);
        assert_eq!(answer.value, 0);
        assert_eq!(answer.error, -libc::ENOSYS);
    }

    #[test]
    fn responses_echo_the_request_id() {
        let request = notification(0xdead_beef, 1, libc::SYS_getpid);
        assert_eq!(Response::value(&request, 5).id, 0xdead_beef);
        assert_eq!(Response::errno(&request, libc::EPERM).id, 0xdead_beef);
    }

    #[test]
    fn errno_responses_are_negated() {
        let request = notification(1, 1, 0);
        let answer = Response::errno(&request, libc::ENOSYS);
        assert_eq!(answer.error, -38);
        assert_eq!(answer.value, 0);
    }
}
