//! SIGSYS delivery layout and syscall-return register access.
//!
//! When a seccomp filter returns `SECCOMP_RET_TRAP`, the kernel does not
//! fail the blocked syscall; it delivers a synchronous SIGSYS to the
//! offending thread. The siginfo carries the blocked call's number and
//! architecture token, and the saved execution context holds the register
//! the call site will read as the syscall's return value once the handler
//! returns.
//!
//! Which register that is depends on the calling convention, and is the
//! only architecture-specific fact in the whole trap path. It is isolated
//! here behind one get/set pair selected at build time; everything above
//! this module is architecture-neutral.

use libc::{c_int, c_uint, c_void, ucontext_t};

/// SIGSYS member of the kernel siginfo union.
///
/// glibc exposes the union through accessor macros with no libc-crate
/// equivalent, so the layout is mirrored directly: three header ints,
/// padding to pointer alignment, then the `_sigsys` fields.
#[repr(C)]
pub struct SigsysInfo {
    pub si_signo: c_int,
    pub si_errno: c_int,
    /// `SYS_SECCOMP` (1) for seccomp-triggered deliveries.
    pub si_code: c_int,
    _pad: c_int,
    /// Address of the faulting syscall instruction.
    pub call_addr: *mut c_void,
    /// Number of the blocked syscall.
    pub syscall: c_int,
    /// `AUDIT_ARCH_*` token of the calling convention in use.
    pub arch: c_uint,
}

/// Read the register that carries a syscall's return value.
///
/// # Safety
///
/// `ctx` must point to a valid `ucontext_t`, normally the third argument
/// of an `SA_SIGINFO` handler.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn syscall_return(ctx: *const ucontext_t) -> i64 {
    unsafe { (*ctx).uc_mcontext.gregs[libc::REG_RAX as usize] }
}

/// Overwrite the register that carries a syscall's return value.
///
/// # Safety
///
/// Same requirements as [`syscall_return`]; the write changes what the
/// interrupted call site observes when the handler returns.
#[cfg(target_arch = "x86_64")]
#[inline]
pub unsafe fn set_syscall_return(ctx: *mut ucontext_t, value: i64) {
    unsafe { (*ctx).uc_mcontext.gregs[libc::REG_RAX as usize] = value };
}

/// Read the register that carries a syscall's return value.
///
/// # Safety
///
/// `ctx` must point to a valid `ucontext_t`, normally the third argument
/// of an `SA_SIGINFO` handler.
#[cfg(target_arch = "aarch64")]
#[inline]
pub unsafe fn syscall_return(ctx: *const ucontext_t) -> i64 {
    unsafe { (*ctx).uc_mcontext.regs[0] as i64 }
}

/// Overwrite the register that carries a syscall's return value.
///
/// # Safety
///
/// Same requirements as [`syscall_return`]; the write changes what the
/// interrupted call site observes when the handler returns.
#[cfg(target_arch = "aarch64")]
#[inline]
pub unsafe fn set_syscall_return(ctx: *mut ucontext_t, value: i64) {
    unsafe { (*ctx).uc_mcontext.regs[0] = value as u64 };
}
