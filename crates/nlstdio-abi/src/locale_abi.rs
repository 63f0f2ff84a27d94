//! ABI layer for `<locale.h>`: `setlocale` and `MB_CUR_MAX`.
//!
//! Only `LC_CTYPE` carries real data: its name selects the multibyte
//! encoding the conversion functions use. Every other category accepts the
//! C locale only.

use std::ffi::{CStr, CString, c_char, c_int};
use std::sync::{Mutex, PoisonError};

use nlstdio_core::locale::{self as locale_core, Locale};

const C_LOCALE_NAME: &CStr = c"C";

/// Name installed for `LC_CTYPE`.
static CTYPE_NAME: Mutex<&'static CStr> = Mutex::new(C_LOCALE_NAME);

/// Every locale name ever installed. Pointers handed out by `setlocale`
/// stay valid for the life of the process.
static INTERNED: Mutex<Vec<&'static CStr>> = Mutex::new(Vec::new());

fn intern(name: &str) -> Option<&'static CStr> {
    let owned = CString::new(name).ok()?;
    let mut table = INTERNED.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(existing) = table.iter().copied().find(|s| *s == owned.as_c_str()) {
        return Some(existing);
    }
    let leaked: &'static CStr = Box::leak(owned.into_boxed_c_str());
    table.push(leaked);
    Some(leaked)
}

fn is_known_category(category: c_int) -> bool {
    matches!(
        category,
        libc::LC_ALL
            | libc::LC_CTYPE
            | libc::LC_NUMERIC
            | libc::LC_TIME
            | libc::LC_COLLATE
            | libc::LC_MONETARY
            | libc::LC_MESSAGES
    )
}

/// Install `name` (`""` meaning the environment's choice) as `LC_CTYPE`.
fn install_ctype(name: &str) -> Option<&'static CStr> {
    let locale = if name.is_empty() {
        Locale::from_env()
    } else {
        match Locale::parse(name) {
            Ok(locale) => locale,
            Err(err) => {
                log::debug!("setlocale rejected: {err}");
                return None;
            }
        }
    };
    let stored = intern(locale.name())?;
    locale_core::set_global_locale(&locale);
    *CTYPE_NAME.lock().unwrap_or_else(PoisonError::into_inner) = stored;
    log::debug!(
        "LC_CTYPE set to {}, charset {}",
        locale.name(),
        locale.encoding().charset_name()
    );
    Some(stored)
}

/// POSIX `setlocale`.
///
/// Querying (null `locale`) returns the installed name. For `LC_ALL` and
/// `LC_CTYPE` any name `Locale::parse` accepts is installed; other
/// categories accept `"C"`, `"POSIX"` and `""` and stay in the C locale.
/// Rejected names and unknown categories return null.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn setlocale(category: c_int, locale: *const c_char) -> *const c_char {
    if !is_known_category(category) {
        return std::ptr::null();
    }
    let ctype = category == libc::LC_ALL || category == libc::LC_CTYPE;

    if locale.is_null() {
        return if ctype {
            CTYPE_NAME.lock().unwrap_or_else(PoisonError::into_inner).as_ptr()
        } else {
            C_LOCALE_NAME.as_ptr()
        };
    }

    // SAFETY: caller passes a NUL-terminated locale name.
    let Ok(name) = unsafe { CStr::from_ptr(locale) }.to_str() else {
        return std::ptr::null();
    };

    if ctype {
        return install_ctype(name).map_or(std::ptr::null(), CStr::as_ptr);
    }
    match name {
        "" | "C" | "POSIX" => C_LOCALE_NAME.as_ptr(),
        _ => std::ptr::null(),
    }
}

/// glibc's `MB_CUR_MAX` expansion: the longest character of the current
/// encoding.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn __ctype_get_mb_cur_max() -> usize {
    locale_core::current_encoding().mb_cur_max()
}
