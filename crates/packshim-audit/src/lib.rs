//! packshim-audit: rtld-audit module for package-store relocation
//!
//! Binaries from a binary cache carry absolute `/nix/store/...` paths in
//! their RUNPATH, but on the device the store lives under an app-private
//! prefix. This crate builds a shared object implementing the dynamic
//! linker's audit interface: every library lookup is rewritten to the real
//! on-device location, and references to the standard C library can be
//! swapped for an ABI-compatible patched build whose syscall usage
//! survives the host sandbox.
//!
//! ## Usage
//!
//! ```text
//! PACKSHIM_BASE=/data/data/com.example.pkgs/files/usr \
//!   LD_AUDIT=libpackshim_audit.so ./some-binary
//! ```
//!
//! Configuration can also be baked in at build time with the same
//! variable names (see [`config`]); the process environment wins when
//! both are present. With no configuration at all the module still loads
//! and passes every path through untouched.
//!
//! The audit entry points run inside the dynamic linker's serialized
//! resolution path: they hold no locks, block on nothing, and share no
//! state beyond the immutable configuration captured at version
//! negotiation time.

pub mod config;
pub mod hooks;
pub mod translate;

pub use config::{AuditConfig, LibrarySwap, PathMapping};
pub use translate::Translator;
