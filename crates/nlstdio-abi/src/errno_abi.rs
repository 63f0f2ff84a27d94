//! ABI layer for `<errno.h>`: thread-local errno storage.
//!
//! The cell is the one `nlstdio_core::errno` reads and writes, so errors
//! published by the core and by these entry points land in the same place.

use std::ffi::c_int;

#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn __errno_location() -> *mut c_int {
    static mut FALLBACK_ERRNO: c_int = 0;
    match nlstdio_core::errno::errno_ptr() {
        Some(ptr) => ptr,
        None => core::ptr::addr_of_mut!(FALLBACK_ERRNO),
    }
}

/// Set the ABI errno via `__errno_location`.
#[inline]
pub(crate) unsafe fn set_abi_errno(val: c_int) {
    // SAFETY: `__errno_location` always returns a valid, thread-owned slot.
    let p = unsafe { __errno_location() };
    // SAFETY: see above.
    unsafe { *p = val };
}
