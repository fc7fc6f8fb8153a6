//! rtld-audit entry points.
//!
//! The dynamic linker looks these up by name when the library is listed
//! in `LD_AUDIT`. Only two of them do real work: `la_version` accepts the
//! linker's protocol version and resolves the configuration, and
//! `la_objsearch` rewrites each candidate path. The rest exist because
//! some loader versions complain when an entry is missing; they answer
//! with the value meaning "take no further special action".
//!
//! All entries run under the linker's internal serialization and must not
//! take locks or block. The only shared state is the configuration
//! captured on first use.

use std::ffi::CStr;
use std::ptr;
use std::sync::OnceLock;

use libc::{c_char, c_long, c_uint, c_void};

use crate::config::AuditConfig;
use crate::translate::Translator;

struct State {
    translator: Translator,
    debug: bool,
}

static STATE: OnceLock<State> = OnceLock::new();

fn state() -> &'static State {
    STATE.get_or_init(|| {
        let config = AuditConfig::resolve();
        if config.debug {
            eprintln!("packshim: audit module loaded");
            match &config.mapping {
                Some(m) => eprintln!(
                    "packshim:   store: {} -> {}",
                    String::from_utf8_lossy(&m.from),
                    String::from_utf8_lossy(&m.to)
                ),
                None => eprintln!("packshim:   no relocation base, paths pass through"),
            }
            if let Some(s) = &config.swap {
                eprintln!(
                    "packshim:   swap: {} -> {}",
                    String::from_utf8_lossy(&s.source),
                    String::from_utf8_lossy(&s.target)
                );
            }
        }
        State {
            translator: Translator::new(&config),
            debug: config.debug,
        }
    })
}

/// Version negotiation, called once per loaded audit module.
///
/// Returns the offered version unchanged to accept it. Acceptance does
/// not depend on configuration: an unconfigured module still loads, it
/// just translates nothing.
#[no_mangle]
pub extern "C" fn la_version(version: c_uint) -> c_uint {
    state();
    version
}

/// Library path lookup, called for every resolution candidate.
///
/// Returns a freshly `malloc`ed C string; ownership transfers to the
/// loader, which is responsible for releasing it.
///
/// # Safety
///
/// `name` must be a valid NUL-terminated C string or null.
#[no_mangle]
pub unsafe extern "C" fn la_objsearch(
    name: *const c_char,
    _cookie: *mut usize,
    _flag: c_uint,
) -> *mut c_char {
    if name.is_null() {
        return ptr::null_mut();
    }

    let state = state();
    let bytes = unsafe { CStr::from_ptr(name) }.to_bytes();
    let rewritten = state.translator.translate(bytes);

    if state.debug {
        if rewritten == bytes {
            eprintln!("packshim: pass-through: {}", String::from_utf8_lossy(bytes));
        } else {
            eprintln!(
                "packshim: redirect: {} -> {}",
                String::from_utf8_lossy(bytes),
                String::from_utf8_lossy(&rewritten)
            );
        }
    }

    unsafe { to_malloced_cstring(&rewritten) }
}

/// Object load notification. 0 = do not audit this object further.
#[no_mangle]
pub extern "C" fn la_objopen(_map: *mut c_void, _lmid: c_long, _cookie: *mut usize) -> c_uint {
    0
}

/// Object unload notification.
#[no_mangle]
pub extern "C" fn la_objclose(_cookie: *mut usize) -> c_uint {
    0
}

/// Pre-initialization notification.
#[no_mangle]
pub extern "C" fn la_preinit(_cookie: *mut usize) {}

/// Link-map activity notification.
#[no_mangle]
pub extern "C" fn la_activity(_cookie: *mut usize, _flag: c_uint) {}

/// Copy `bytes` into a `malloc`-owned, NUL-terminated C string.
///
/// Allocation failure is fatal: library resolution cannot continue
/// without memory, and handing the loader a null here would surface as an
/// inexplicable "not found" later. Diagnose and abort instead, leaving no
/// partial state.
///
/// # Safety
///
/// `bytes` must contain no interior NUL (guaranteed when it came from a
/// `CStr`).
unsafe fn to_malloced_cstring(bytes: &[u8]) -> *mut c_char {
    let buf = unsafe { libc::malloc(bytes.len() + 1) };
    if buf.is_null() {
        let msg = b"packshim: out of memory\n";
        unsafe {
            libc::write(2, msg.as_ptr().cast(), msg.len());
            libc::abort();
        }
    }
    unsafe {
        ptr::copy_nonoverlapping(bytes.as_ptr(), buf.cast::<u8>(), bytes.len());
        *buf.cast::<u8>().add(bytes.len()) = 0;
    }
    buf.cast()
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;

    #[test]
    fn version_is_accepted_unchanged() {
        assert_eq!(la_version(1), 1);
        assert_eq!(la_version(2), 2);
    }

    #[test]
    fn lifecycle_noops_answer_neutrally() {
        assert_eq!(la_objopen(ptr::null_mut(), 0, ptr::null_mut()), 0);
        assert_eq!(la_objclose(ptr::null_mut()), 0);
        la_preinit(ptr::null_mut());
        la_activity(ptr::null_mut(), 0);
    }

    #[test]
    fn objsearch_returns_an_independent_allocation() {
        // The test environment carries no packshim configuration, so the
        // path passes through; what matters is that the result is a
        // separate allocation the caller owns.
        let name = CString::new("/usr/lib/libm.so.6").unwrap();
        let result = unsafe { la_objsearch(name.as_ptr(), ptr::null_mut(), 0) };
        assert!(!result.is_null());
        assert_ne!(result.cast_const(), name.as_ptr());
        let copied = unsafe { CStr::from_ptr(result) };
        assert_eq!(copied.to_bytes(), name.as_bytes());
        unsafe { libc::free(result.cast()) };
    }

    #[test]
    fn objsearch_tolerates_null() {
        assert!(unsafe { la_objsearch(ptr::null(), ptr::null_mut(), 0) }.is_null());
    }
}
