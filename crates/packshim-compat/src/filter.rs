//! Rule-table lowering and installation.
//!
//! Lowers a [`RuleTable`] to a classic BPF program and installs it via
//! the seccomp syscall. Installation is one-way: the filter cannot be
//! removed or loosened afterwards and is inherited by every thread and
//! child created from then on. It must happen before the protected
//! program starts executing instrumented code.
//!
//! ## Program layout
//!
//! ```text
//! [0]        load arch
//! [1]        arch == table arch ? fall through : +1
//! [2]        ret KILL_PROCESS            (foreign architecture)
//! [3]        load syscall number
//! [4..4+n)   nr == rule[i].nr ? jump to return[i] : next
//! [4+n]      ret ALLOW                   (default)
//! [5+n..5+2n) per-rule returns, in table order
//! ```
//!
//! Each compare entry jumps over the remaining compares, the default
//! allow, and the earlier per-rule returns; that distance is the same for
//! every entry: n. BPF jump offsets are u8, which bounds the table size.

use std::os::fd::OwnedFd;

use thiserror::Error;

use packshim_sys::seccomp::{
    seccomp_set_mode_filter, SockFilter, SockFprog, BPF_ABS, BPF_JEQ, BPF_JMP, BPF_K, BPF_LD,
    BPF_RET, BPF_W, OFFSET_ARCH, OFFSET_SYSCALL_NR, SECCOMP_RET_ALLOW, SECCOMP_RET_DATA,
    SECCOMP_RET_ERRNO, SECCOMP_RET_KILL_PROCESS, SECCOMP_RET_USER_NOTIF,
};
use packshim_sys::seccomp_notify::seccomp_set_mode_filter_listener;

use crate::rules::{Disposition, RuleTable};

/// BPF jump offsets are u8; every compare entry jumps a distance of n.
pub const MAX_RULES: usize = 255;

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("rule table too large: {0} rules > {MAX_RULES}")]
    TooManyRules(usize),

    #[error("rule table contains Notify rules; install with a listener")]
    NeedsListener,

    #[error("seccomp installation failed: {0}")]
    Install(#[from] rustix::io::Errno),
}

fn action(disposition: Disposition) -> u32 {
    match disposition {
        Disposition::Allow => SECCOMP_RET_ALLOW,
        Disposition::Errno(code) => SECCOMP_RET_ERRNO | (code as u32 & SECCOMP_RET_DATA),
        Disposition::Notify => SECCOMP_RET_USER_NOTIF,
        Disposition::Terminate => SECCOMP_RET_KILL_PROCESS,
    }
}

/// Lower `table` to a BPF program.
///
/// # Errors
///
/// Returns [`FilterError::TooManyRules`] when the table exceeds the u8
/// jump range.
pub fn compile(table: &RuleTable) -> Result<Vec<SockFilter>, FilterError> {
    let rules = table.rules();
    let n = rules.len();
    if n > MAX_RULES {
        return Err(FilterError::TooManyRules(n));
    }

    let mut prog = Vec::with_capacity(2 * n + 5);

    prog.push(SockFilter::stmt(BPF_LD | BPF_W | BPF_ABS, OFFSET_ARCH));
    prog.push(SockFilter::jump(
        BPF_JMP | BPF_JEQ | BPF_K,
        table.arch().audit_token(),
        1,
        0,
    ));
    prog.push(SockFilter::stmt(BPF_RET | BPF_K, SECCOMP_RET_KILL_PROCESS));

    prog.push(SockFilter::stmt(
        BPF_LD | BPF_W | BPF_ABS,
        OFFSET_SYSCALL_NR,
    ));

    for rule in rules {
        prog.push(SockFilter::jump(
            BPF_JMP | BPF_JEQ | BPF_K,
            rule.nr as u32,
            n as u8,
            0,
        ));
    }

    prog.push(SockFilter::stmt(BPF_RET | BPF_K, SECCOMP_RET_ALLOW));

    for rule in rules {
        prog.push(SockFilter::stmt(BPF_RET | BPF_K, action(rule.disposition)));
    }

    Ok(prog)
}

/// Compile and install `table` on the current thread.
///
/// # Errors
///
/// Returns [`FilterError::NeedsListener`] if the table carries `Notify`
/// rules (use [`install_with_listener`]), or the compile/installation
/// error otherwise.
pub fn install(table: &RuleTable) -> Result<(), FilterError> {
    if table
        .rules()
        .iter()
        .any(|r| r.disposition == Disposition::Notify)
    {
        return Err(FilterError::NeedsListener);
    }

    let prog = compile(table)?;
    let fprog = SockFprog {
        len: prog.len() as u16,
        filter: prog.as_ptr(),
    };

    tracing::debug!(
        rules = table.rules().len(),
        arch = ?table.arch(),
        "installing seccomp filter"
    );

    // SAFETY: prog outlives the call and is a structurally valid program.
    unsafe { seccomp_set_mode_filter(&fprog) }?;
    Ok(())
}

/// Compile and install `table`, returning the notification listener.
///
/// The listener only ever signals when the table carries `Notify` rules;
/// it must be handed to the supervisor before any of those syscalls run,
/// or the caller will suspend with nobody listening.
///
/// # Errors
///
/// Returns the compile or installation error.
pub fn install_with_listener(table: &RuleTable) -> Result<OwnedFd, FilterError> {
    let prog = compile(table)?;
    let fprog = SockFprog {
        len: prog.len() as u16,
        filter: prog.as_ptr(),
    };

    tracing::debug!(
        rules = table.rules().len(),
        arch = ?table.arch(),
        "installing seccomp notify filter"
    );

    // SAFETY: prog outlives the call and is a structurally valid program.
    let listener = unsafe { seccomp_set_mode_filter_listener(&fprog) }?;
    Ok(listener)
}
