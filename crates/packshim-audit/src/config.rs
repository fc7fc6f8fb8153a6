//! Audit module configuration.
//!
//! Resolved exactly once per process, at audit version negotiation, and
//! immutable afterwards. Values come from the process environment,
//! falling back to defaults baked in at build time with `option_env!`:
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `PACKSHIM_BASE` | Prefix the store root is relocated under |
//! | `PACKSHIM_LIB_FROM` | Store entry to swap away from (e.g. the standard glibc) |
//! | `PACKSHIM_LIB_TO` | Store entry to swap to (e.g. the device-patched glibc) |
//! | `PACKSHIM_DEBUG` | `1` enables diagnostics on stderr |
//!
//! A missing base is not an error: translation degrades to pass-through
//! and the module keeps working. The debug toggle controls diagnostics
//! only, never translation behavior.

use std::env;

/// Fixed store root that relocatable binaries bake into their RUNPATH.
pub const STORE_PREFIX: &str = "/nix/store";

pub const ENV_BASE: &str = "PACKSHIM_BASE";
pub const ENV_LIB_FROM: &str = "PACKSHIM_LIB_FROM";
pub const ENV_LIB_TO: &str = "PACKSHIM_LIB_TO";
pub const ENV_DEBUG: &str = "PACKSHIM_DEBUG";

// Compile-time defaults, e.g.
//   PACKSHIM_BASE=/data/data/com.example.pkgs/files/usr cargo build --release
const BUILD_BASE: Option<&str> = option_env!("PACKSHIM_BASE");
const BUILD_LIB_FROM: Option<&str> = option_env!("PACKSHIM_LIB_FROM");
const BUILD_LIB_TO: Option<&str> = option_env!("PACKSHIM_LIB_TO");

/// One whole-prefix rewrite: paths starting with `from` continue under `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMapping {
    pub from: Vec<u8>,
    pub to: Vec<u8>,
}

/// One-shot dependency swap, applied after relocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySwap {
    pub source: Vec<u8>,
    pub target: Vec<u8>,
}

/// Immutable translation configuration for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct AuditConfig {
    /// Store relocation. `None` means pass-through.
    pub mapping: Option<PathMapping>,
    /// Library swap. Applied to the relocated path, at most once.
    pub swap: Option<LibrarySwap>,
    /// Verbose diagnostics on stderr.
    pub debug: bool,
}

impl AuditConfig {
    /// Resolve configuration from the environment, falling back to the
    /// values baked in at build time.
    pub fn resolve() -> Self {
        let base = env::var(ENV_BASE)
            .ok()
            .or_else(|| BUILD_BASE.map(String::from));
        let lib_from = env::var(ENV_LIB_FROM)
            .ok()
            .or_else(|| BUILD_LIB_FROM.map(String::from));
        let lib_to = env::var(ENV_LIB_TO)
            .ok()
            .or_else(|| BUILD_LIB_TO.map(String::from));
        let debug = env::var(ENV_DEBUG).is_ok_and(|v| v.starts_with('1'));

        Self::from_parts(
            base.as_deref(),
            lib_from.as_deref(),
            lib_to.as_deref(),
            debug,
        )
    }

    /// Build from already-resolved values. Both sourcing strategies
    /// (environment and compiled-in) funnel through here, so they always
    /// yield the same shape.
    ///
    /// `lib_from`/`lib_to` are store entry names (`<hash>-<name>-<version>`
    /// directories), not full paths. The swap prefixes are anchored under
    /// the relocated store root when a base is configured, and under the
    /// plain store root otherwise — so a swap can apply to paths that
    /// never matched the relocation prefix. Whoever generates the
    /// configuration is responsible for only naming ABI-compatible
    /// entries.
    pub fn from_parts(
        base: Option<&str>,
        lib_from: Option<&str>,
        lib_to: Option<&str>,
        debug: bool,
    ) -> Self {
        let mapping = base
            .filter(|b| !b.is_empty())
            .map(|b| PathMapping {
                from: STORE_PREFIX.as_bytes().to_vec(),
                to: format!("{b}{STORE_PREFIX}").into_bytes(),
            });

        let store_root = mapping
            .as_ref()
            .map_or_else(|| STORE_PREFIX.as_bytes().to_vec(), |m| m.to.clone());

        let swap = match (lib_from, lib_to) {
            (Some(from), Some(to)) if !from.is_empty() && !to.is_empty() && from != to => {
                Some(LibrarySwap {
                    source: [store_root.as_slice(), b"/", from.as_bytes()].concat(),
                    target: [store_root.as_slice(), b"/", to.as_bytes()].concat(),
                })
            }
            _ => None,
        };

        Self {
            mapping,
            swap,
            debug,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_builds_store_mapping() {
        let config = AuditConfig::from_parts(Some("/data/x"), None, None, false);
        let mapping = config.mapping.unwrap();
        assert_eq!(mapping.from, b"/nix/store");
        assert_eq!(mapping.to, b"/data/x/nix/store");
        assert!(config.swap.is_none());
    }

    #[test]
    fn no_base_means_pass_through() {
        let config = AuditConfig::from_parts(None, None, None, false);
        assert!(config.mapping.is_none());

        let config = AuditConfig::from_parts(Some(""), None, None, false);
        assert!(config.mapping.is_none());
    }

    #[test]
    fn swap_is_anchored_under_relocated_root() {
        let config = AuditConfig::from_parts(
            Some("/data/x"),
            Some("abc-glibc"),
            Some("xyz-glibc-android"),
            false,
        );
        let swap = config.swap.unwrap();
        assert_eq!(swap.source, b"/data/x/nix/store/abc-glibc");
        assert_eq!(swap.target, b"/data/x/nix/store/xyz-glibc-android");
    }

    #[test]
    fn swap_without_base_uses_plain_store_root() {
        let config =
            AuditConfig::from_parts(None, Some("abc-glibc"), Some("xyz-glibc"), false);
        let swap = config.swap.unwrap();
        assert_eq!(swap.source, b"/nix/store/abc-glibc");
        assert_eq!(swap.target, b"/nix/store/xyz-glibc");
    }

    #[test]
    fn swap_requires_both_entries_and_a_difference() {
        let config = AuditConfig::from_parts(Some("/data/x"), Some("abc"), None, false);
        assert!(config.swap.is_none());

        let config = AuditConfig::from_parts(Some("/data/x"), None, Some("abc"), false);
        assert!(config.swap.is_none());

        let config = AuditConfig::from_parts(Some("/data/x"), Some("abc"), Some("abc"), false);
        assert!(config.swap.is_none());
    }
}
