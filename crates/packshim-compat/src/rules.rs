//! Syscall decision tables.
//!
//! A filter is described as an ordered list of rules - data, not control
//! flow - so the matching semantics can be unit tested without installing
//! anything. Matching follows the kernel model:
//!
//! - requests from any architecture other than the table's terminate the
//!   process (a process misidentifying its own execution mode must not
//!   silently bypass the filter)
//! - the first rule matching the syscall number wins
//! - an unmatched syscall number is allowed

/// Instruction-set context a syscall request originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Aarch64,
    X86_64,
}

impl Arch {
    /// `AUDIT_ARCH_*` token the kernel reports for this architecture.
    pub const fn audit_token(self) -> u32 {
        match self {
            Arch::Aarch64 => packshim_sys::seccomp::AUDIT_ARCH_AARCH64,
            Arch::X86_64 => packshim_sys::seccomp::AUDIT_ARCH_X86_64,
        }
    }

    /// The architecture this build targets.
    #[cfg(target_arch = "aarch64")]
    pub const fn native() -> Self {
        Arch::Aarch64
    }

    /// The architecture this build targets.
    #[cfg(target_arch = "x86_64")]
    pub const fn native() -> Self {
        Arch::X86_64
    }
}

/// Outcome of a matched rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Let the syscall through.
    Allow,
    /// Fail the syscall with this errno without executing it.
    Errno(u16),
    /// Suspend the caller and notify the supervisor.
    Notify,
    /// Kill the process.
    Terminate,
}

/// One `(architecture, syscall number) -> disposition` entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyscallRule {
    pub arch: Arch,
    pub nr: i64,
    pub disposition: Disposition,
}

/// Ordered rule list with first-match-wins semantics.
///
/// Built once before the protected program runs, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RuleTable {
    arch: Arch,
    rules: Vec<SyscallRule>,
}

/// Syscall numbers the host sandbox denies outright, aarch64 table.
///
/// Modern glibc issues all four during startup and falls back cleanly
/// when they fail with `ENOSYS`.
#[rustfmt::skip]
pub const BLOCKED_AARCH64: &[i64] = &[
    99,   // set_robust_list
    293,  // rseq
    435,  // clone3
    439,  // faccessat2
];

/// Syscall numbers the host sandbox denies outright, x86_64 table.
#[rustfmt::skip]
pub const BLOCKED_X86_64: &[i64] = &[
    273,  // set_robust_list
    334,  // rseq
    435,  // clone3
    439,  // faccessat2
];

/// Host-denied syscall numbers for `arch`.
pub const fn blocked_syscalls(arch: Arch) -> &'static [i64] {
    match arch {
        Arch::Aarch64 => BLOCKED_AARCH64,
        Arch::X86_64 => BLOCKED_X86_64,
    }
}

const ENOSYS_CODE: u16 = libc::ENOSYS as u16;

impl RuleTable {
    /// Empty table: every syscall on `arch` is allowed, everything else
    /// terminates.
    pub fn new(arch: Arch) -> Self {
        Self {
            arch,
            rules: Vec::new(),
        }
    }

    /// Table mapping every syscall the host policy denies to an `ENOSYS`
    /// failure. Callers with fallback logic for "unsupported" keep
    /// working; everything else is allowed.
    pub fn host_blocked(arch: Arch) -> Self {
        let mut table = Self::new(arch);
        for &nr in blocked_syscalls(arch) {
            table.push(nr, Disposition::Errno(ENOSYS_CODE));
        }
        table
    }

    /// Variant of [`RuleTable::host_blocked`] whose matches suspend the
    /// caller and notify a supervisor instead of failing.
    pub fn host_blocked_notify(arch: Arch) -> Self {
        let mut table = Self::new(arch);
        for &nr in blocked_syscalls(arch) {
            table.push(nr, Disposition::Notify);
        }
        table
    }

    /// Append a rule. Order is match priority.
    pub fn push(&mut self, nr: i64, disposition: Disposition) {
        self.rules.push(SyscallRule {
            arch: self.arch,
            nr,
            disposition,
        });
    }

    /// Builder form of [`RuleTable::push`].
    pub fn with(mut self, nr: i64, disposition: Disposition) -> Self {
        self.push(nr, disposition);
        self
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn rules(&self) -> &[SyscallRule] {
        &self.rules
    }

    /// Decide the disposition for one request, mirroring what the
    /// compiled filter does in the kernel.
    pub fn evaluate(&self, arch: Arch, nr: i64) -> Disposition {
        if arch != self.arch {
            return Disposition::Terminate;
        }
        for rule in &self.rules {
            if rule.arch == arch && rule.nr == nr {
                return rule.disposition;
            }
        }
        Disposition::Allow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn foreign_arch_terminates_everything() {
        let table = RuleTable::host_blocked(Arch::Aarch64);
        for nr in [0, 99, 293, 435, 439, 1000] {
            assert_eq!(table.evaluate(Arch::X86_64, nr), Disposition::Terminate);
        }
    }

    #[test]
    fn blocked_syscalls_fail_with_enosys() {
        let table = RuleTable::host_blocked(Arch::Aarch64);
        for &nr in BLOCKED_AARCH64 {
            assert_eq!(table.evaluate(Arch::Aarch64, nr), Disposition::Errno(38));
        }
    }

    #[test]
    fn unmatched_syscalls_are_allowed() {
        let table = RuleTable::host_blocked(Arch::Aarch64);
        for nr in [0, 1, 63, 64, 221, 1000] {
            assert_eq!(table.evaluate(Arch::Aarch64, nr), Disposition::Allow);
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RuleTable::new(Arch::X86_64)
            .with(39, Disposition::Errno(38))
            .with(39, Disposition::Terminate);
        assert_eq!(table.evaluate(Arch::X86_64, 39), Disposition::Errno(38));
    }

    #[test]
    fn notify_variant_covers_the_same_numbers() {
        let errno = RuleTable::host_blocked(Arch::X86_64);
        let notify = RuleTable::host_blocked_notify(Arch::X86_64);
        assert_eq!(errno.rules().len(), notify.rules().len());
        for (a, b) in errno.rules().iter().zip(notify.rules()) {
            assert_eq!(a.nr, b.nr);
            assert_eq!(b.disposition, Disposition::Notify);
        }
    }

    #[test]
    fn blocked_tables_agree_on_syscall_set() {
        // Same calls, different numbers per architecture.
        assert_eq!(BLOCKED_AARCH64.len(), BLOCKED_X86_64.len());
        assert!(BLOCKED_AARCH64.contains(&435)); // clone3
        assert!(BLOCKED_X86_64.contains(&435));
        assert!(BLOCKED_AARCH64.contains(&439)); // faccessat2
        assert!(BLOCKED_X86_64.contains(&439));
    }
}
