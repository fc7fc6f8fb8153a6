//! Low-level Linux wrappers for the packshim runtime.
//!
//! This crate provides thin wrappers around the kernel interfaces the
//! higher-level packshim crates are built on. For standard syscalls, use
//! rustix.
//!
//! ## Modules
//!
//! - **seccomp** - seccomp-BPF program representation and installation
//! - **`seccomp_notify`** - seccomp user notification structs and ioctls
//! - **sigsys** - SIGSYS siginfo layout and the per-architecture
//!   syscall-return register accessor
//!
//! # Safety
//!
//! This crate contains raw syscall wrappers. Casts between integer types
//! are unavoidable when interfacing with the kernel ABI.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod seccomp;
pub mod seccomp_notify;
pub mod sigsys;

#[inline]
pub fn last_errno() -> rustix::io::Errno {
    // SAFETY: __errno_location always returns valid thread-local pointer.
    rustix::io::Errno::from_raw_os_error(unsafe { *libc::__errno_location() })
}
