//! packshim-compat: syscall compatibility for relocated binaries
//!
//! The host sandbox denies a handful of syscalls that modern C libraries
//! issue eagerly. Binaries cannot be rebuilt, so the denial has to be made
//! survivable instead. Three independently usable strategies:
//!
//! - **filter** - install a seccomp filter before the program runs that
//!   turns each blocked syscall into an `ENOSYS` failure. Callers already
//!   contain fallback paths for "this call is unsupported", so they keep
//!   working.
//! - **trap** - catch the SIGSYS the host policy delivers and synthesize
//!   the `ENOSYS` return in software, in-process.
//! - **notify** - suspend each blocked call and forward it to an
//!   unrestricted supervisor process that produces a genuine result.
//!
//! The decision table behind all three lives in [`rules`] as plain data,
//! so its matching semantics are testable without touching the kernel.

#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

pub mod filter;
pub mod notify;
pub mod rules;
pub mod trap;

pub use filter::{compile, install, install_with_listener, FilterError};
pub use notify::supervisor::{default_answer, Notification, Response, Supervisor, SupervisorEvent};
pub use rules::{blocked_syscalls, Arch, Disposition, RuleTable, SyscallRule};
