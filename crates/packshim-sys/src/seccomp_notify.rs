//! Seccomp user notification (`SECCOMP_RET_USER_NOTIF`) support.
//!
//! User notification turns a blocked syscall into a suspend-and-notify
//! event: the caller sleeps while a supervisor process reads the request
//! from a listener descriptor, produces a result, and writes it back.
//! The kernel then resumes the original call with that result, exactly as
//! if the syscall had completed normally.
//!
//! ## Flow
//!
//! 1. The restricted process installs a filter with
//!    `SECCOMP_FILTER_FLAG_NEW_LISTENER`, which returns a listener fd
//! 2. The listener fd is transferred to the supervisor (`SCM_RIGHTS`)
//! 3. The supervisor blocks in `SECCOMP_IOCTL_NOTIF_RECV`
//! 4. The supervisor answers via `SECCOMP_IOCTL_NOTIF_SEND`
//!
//! Responses must echo the notification id; `ENOENT` from the send ioctl
//! means the notifying process died in the meantime and nothing waits for
//! the answer.

use std::os::fd::{FromRawFd, OwnedFd};

use rustix::io::Errno;

use crate::last_errno;
use crate::seccomp::SockFprog;

const SECCOMP_SET_MODE_FILTER: u32 = 1;
pub const SECCOMP_FILTER_FLAG_NEW_LISTENER: u32 = 1 << 3;

// ioctl numbers for seccomp notify (from kernel headers, 64-bit).
// SECCOMP_IOCTL_NOTIF_RECV = SECCOMP_IOWR(0, struct seccomp_notif)
// SECCOMP_IOCTL_NOTIF_SEND = SECCOMP_IOWR(1, struct seccomp_notif_resp)

/// ioctl to receive a notification from the seccomp listener fd.
pub const SECCOMP_IOCTL_NOTIF_RECV: u64 = 0xc0502100;
/// ioctl to send a response to a seccomp notification.
pub const SECCOMP_IOCTL_NOTIF_SEND: u64 = 0xc0182101;

/// Seccomp notification data (mirrors kernel `struct seccomp_data`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SeccompData {
    /// Syscall number.
    pub nr: i32,
    /// Architecture (`AUDIT_ARCH_*`).
    pub arch: u32,
    /// Instruction pointer at time of syscall.
    pub instruction_pointer: u64,
    /// Syscall arguments.
    pub args: [u64; 6],
}

/// Notification read from the listener (mirrors kernel `struct seccomp_notif`).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct SeccompNotif {
    /// Unique notification ID.
    pub id: u64,
    /// PID of the notifying process (in the supervisor's PID namespace).
    pub pid: u32,
    /// Flags (currently unused, must be 0).
    pub flags: u32,
    /// The syscall data.
    pub data: SeccompData,
}

impl Default for SeccompNotif {
    fn default() -> Self {
        // SAFETY: SeccompNotif is a plain C struct with no invariants.
        unsafe { std::mem::zeroed() }
    }
}

/// Response to a notification (mirrors kernel `struct seccomp_notif_resp`).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SeccompNotifResp {
    /// Must match the notification ID.
    pub id: u64,
    /// Return value for the syscall.
    pub val: i64,
    /// Negated errno, or 0 for success.
    pub error: i32,
    /// Flags (must be 0 when supplying val/error).
    pub flags: u32,
}

/// Install a seccomp filter with `SECCOMP_FILTER_FLAG_NEW_LISTENER`.
///
/// Returns the listener fd used to receive notifications. Sets
/// `PR_SET_NO_NEW_PRIVS` first, like [`crate::seccomp::seccomp_set_mode_filter`].
///
/// # Safety
///
/// The filter must be a valid BPF program. This permanently restricts
/// syscalls for this thread.
///
/// # Errors
///
/// Returns `Errno` if the filter cannot be installed.
pub unsafe fn seccomp_set_mode_filter_listener(fprog: &SockFprog) -> Result<OwnedFd, Errno> {
    unsafe {
        let ret = libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0);
        if ret != 0 {
            return Err(last_errno());
        }

        let ret = libc::syscall(
            libc::SYS_seccomp,
            SECCOMP_SET_MODE_FILTER,
            SECCOMP_FILTER_FLAG_NEW_LISTENER,
            fprog as *const _,
        );
        if ret < 0 {
            Err(last_errno())
        } else {
            // SAFETY: On success, ret is a valid listener file descriptor.
            Ok(OwnedFd::from_raw_fd(ret as i32))
        }
    }
}

/// Receive a notification from the seccomp listener fd.
///
/// Blocks until a notification is available.
///
/// # Errors
///
/// Returns `Errno` on failure (`ENOENT` if the target died first).
pub fn notif_recv(listener_fd: i32, notif: &mut SeccompNotif) -> Result<(), Errno> {
    let ret = unsafe {
        libc::ioctl(
            listener_fd,
            SECCOMP_IOCTL_NOTIF_RECV,
            notif as *mut SeccompNotif,
        )
    };
    if ret < 0 {
        Err(last_errno())
    } else {
        Ok(())
    }
}

/// Send a response to a seccomp notification.
///
/// # Errors
///
/// Returns `Errno` on failure (`ENOENT` if no waiter remains).
pub fn notif_send(listener_fd: i32, resp: &SeccompNotifResp) -> Result<(), Errno> {
    let ret = unsafe {
        libc::ioctl(
            listener_fd,
            SECCOMP_IOCTL_NOTIF_SEND,
            resp as *const SeccompNotifResp,
        )
    };
    if ret < 0 {
        Err(last_errno())
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_sizes() {
        // Verify struct sizes match kernel expectations
        assert_eq!(size_of::<SeccompData>(), 64);
        assert_eq!(size_of::<SeccompNotif>(), 80);
        assert_eq!(size_of::<SeccompNotifResp>(), 24);
    }

    #[test]
    fn default_notif_is_zeroed() {
        let notif = SeccompNotif::default();
        assert_eq!(notif.id, 0);
        assert_eq!(notif.pid, 0);
        assert_eq!(notif.data.nr, 0);
    }
}
