//! Library path translation.
//!
//! A pure function over byte strings: zero, one, or two whole-prefix
//! substitutions, byte-exact, each applied at most once. The first
//! rewrites the store root to its on-device location; the second swaps
//! one store entry for an ABI-compatible replacement and only ever runs
//! on the output of the first. With nothing configured the translator is
//! the identity - a degraded-but-safe mode, never an error.

use crate::config::{AuditConfig, LibrarySwap, PathMapping};

/// Path translator captured from an [`AuditConfig`] at load time.
#[derive(Debug, Clone, Default)]
pub struct Translator {
    mapping: Option<PathMapping>,
    swap: Option<LibrarySwap>,
}

impl Translator {
    pub fn new(config: &AuditConfig) -> Self {
        Self {
            mapping: config.mapping.clone(),
            swap: config.swap.clone(),
        }
    }

    /// Rewrite one candidate library path.
    ///
    /// If `name` starts with the configured store prefix, the prefix is
    /// replaced and every byte after it is preserved exactly (including
    /// the empty suffix when `name` equals the prefix). Anything else
    /// passes through. The swap then replaces its source prefix in the
    /// result, at most once. The input is never mutated; the result is
    /// independently owned. Runs in linear time with no backtracking.
    pub fn translate(&self, name: &[u8]) -> Vec<u8> {
        let primary = match &self.mapping {
            Some(m) if name.starts_with(&m.from) => replace_prefix(name, m.from.len(), &m.to),
            _ => name.to_vec(),
        };

        match &self.swap {
            Some(s) if primary.starts_with(&s.source) => {
                replace_prefix(&primary, s.source.len(), &s.target)
            }
            _ => primary,
        }
    }
}

fn replace_prefix(name: &[u8], prefix_len: usize, replacement: &[u8]) -> Vec<u8> {
    let suffix = &name[prefix_len..];
    let mut out = Vec::with_capacity(replacement.len() + suffix.len());
    out.extend_from_slice(replacement);
    out.extend_from_slice(suffix);
    out
}
