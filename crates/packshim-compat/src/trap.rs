//! SIGSYS trap-and-emulate.
//!
//! Under a `SECCOMP_RET_TRAP` policy the kernel does not fail a blocked
//! syscall - it delivers a synchronous SIGSYS to the offending thread.
//! The handler here makes that delivery indistinguishable from an
//! ordinary kernel error: it stamps `-ENOSYS` into the saved context's
//! syscall-return register and returns, so the interrupted call site
//! observes the conventional "not implemented" failure and takes the
//! fallback path it already has.
//!
//! [`install`] must run before any interceptable syscall can occur -
//! first thing in `main`, or from an initializer in the embedding
//! runtime. The handler executes on the faulting thread's own stack, once
//! per blocked occurrence, and is strictly async-signal-safe: no
//! allocation, no locks, no formatting.

use libc::{c_int, c_void, siginfo_t, ucontext_t};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};

use packshim_sys::sigsys::{set_syscall_return, SigsysInfo};

/// What the interrupted call site observes: the kernel convention for a
/// syscall the kernel does not implement.
pub const NOT_IMPLEMENTED: i64 = -(libc::ENOSYS as i64);

/// `si_code` for seccomp-triggered SIGSYS deliveries.
const SYS_SECCOMP: c_int = 1;

/// Register the SIGSYS handler for the whole process.
///
/// # Errors
///
/// Returns the `sigaction` errno on failure.
pub fn install() -> nix::Result<()> {
    let handler = SigAction::new(
        SigHandler::SigAction(on_sigsys),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    // SAFETY: on_sigsys is async-signal-safe; it touches only the
    // delivered siginfo and context.
    unsafe { sigaction(Signal::SIGSYS, &handler) }?;
    Ok(())
}

extern "C" fn on_sigsys(_signo: c_int, info: *mut siginfo_t, context: *mut c_void) {
    if info.is_null() || context.is_null() {
        return;
    }
    // Only seccomp deliveries carry a blocked syscall to answer; leave
    // user-sent SIGSYS alone.
    let info = info.cast::<SigsysInfo>();
    if unsafe { (*info).si_code } != SYS_SECCOMP {
        return;
    }
    // The siginfo names the blocked syscall, but the outcome does not
    // depend on it: every blocked call reports the same failure.
    synthesize_failure(context.cast::<ucontext_t>());
}

/// Handler core: make the interrupted syscall appear to have returned
/// `-ENOSYS`. Split from the signal entry so the rule can be exercised on
/// a synthetic context.
fn synthesize_failure(context: *mut ucontext_t) {
    // SAFETY: context is the ucontext of the interrupted thread (or a
    // test-owned value); writing the return register is the entire point.
    unsafe { set_syscall_return(context, NOT_IMPLEMENTED) };
}

#[cfg(test)]
mod tests {
    use packshim_sys::sigsys::syscall_return;

    use super::*;

    #[test]
    fn synthetic_context_reads_back_enosys() {
        let mut context: ucontext_t = unsafe { std::mem::zeroed() };
        synthesize_failure(&mut context);
        assert_eq!(unsafe { syscall_return(&context) }, -38);
    }

    #[test]
    fn failure_value_is_independent_of_prior_state() {
        let mut context: ucontext_t = unsafe { std::mem::zeroed() };
        unsafe { set_syscall_return(&mut context, 12345) };
        synthesize_failure(&mut context);
        assert_eq!(unsafe { syscall_return(&context) }, NOT_IMPLEMENTED);
    }

    #[test]
    fn handler_installs_and_ignores_user_sigsys() {
        install().unwrap();
        // A user-raised SIGSYS carries no seccomp payload; the handler
        // must leave it alone and the process must survive.
        unsafe { libc::raise(libc::SIGSYS) };
    }
}
