//! ABI layer for the multibyte conversion functions of `<wchar.h>` and
//! `<stdlib.h>`.
//!
//! Every function converts in the calling thread's current encoding. A null
//! `mbstate_t` pointer selects that function's own thread-local state.
//! Restartable functions report `(size_t)-1` with `EILSEQ` for an invalid
//! sequence and `(size_t)-2` for an incomplete one.

use std::ffi::{c_char, c_int};

use libc::wchar_t;
use nlstdio_core::StdioError;
use nlstdio_core::locale::current_encoding;
use nlstdio_core::multibyte::{
    self, ConversionState, DefaultSlot, MB_LEN_MAX, with_default_state,
};

use crate::errno_abi::set_abi_errno;

/// `(size_t)-1`: invalid sequence.
const SIZE_INVALID: usize = usize::MAX;
/// `(size_t)-2`: incomplete sequence.
const SIZE_INCOMPLETE: usize = usize::MAX - 1;

/// Run `f` on `*ps`, or on the thread-local state for `slot` when `ps` is null.
///
/// # Safety
///
/// A non-null `ps` must point to a valid, exclusively borrowed state.
unsafe fn with_state<R>(
    ps: *mut ConversionState,
    slot: DefaultSlot,
    f: impl FnOnce(&mut ConversionState) -> R,
) -> R {
    if ps.is_null() {
        with_default_state(slot, f)
    } else {
        // SAFETY: caller guarantees `ps` is valid and unaliased.
        f(unsafe { &mut *ps })
    }
}

/// Publish `err` through errno and return the restartable sentinel.
fn restartable_failure(err: StdioError) -> usize {
    match err {
        StdioError::IncompleteSequence => SIZE_INCOMPLETE,
        other => {
            // SAFETY: errno slot of the calling thread.
            unsafe { set_abi_errno(other.errno()) };
            SIZE_INVALID
        }
    }
}

/// Length of a NUL-terminated byte string, examining at most `max` bytes.
/// The terminator is included when it lies within the bound.
///
/// # Safety
///
/// `s` must be readable up to its terminator or `max` bytes.
unsafe fn narrow_extent(s: *const c_char, max: usize) -> usize {
    let mut n = 0;
    while n < max {
        // SAFETY: within the caller-guaranteed readable range.
        if unsafe { *s.add(n) } == 0 {
            return n + 1;
        }
        n += 1;
    }
    n
}

/// Wide counterpart of [`narrow_extent`].
///
/// # Safety
///
/// `s` must be readable up to its terminator or `max` elements.
unsafe fn wide_extent(s: *const wchar_t, max: usize) -> usize {
    let mut n = 0;
    while n < max {
        // SAFETY: within the caller-guaranteed readable range.
        if unsafe { *s.add(n) } == 0 {
            return n + 1;
        }
        n += 1;
    }
    n
}

// ---------------------------------------------------------------------------
// mbtowc / mblen / wctomb
// ---------------------------------------------------------------------------

/// ISO C `mbtowc`. A null `s` resets the internal state and reports whether
/// the encoding is stateful. Any failure resets the state.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbtowc(pwc: *mut wchar_t, s: *const c_char, n: usize) -> c_int {
    let encoding = current_encoding();
    let src = if s.is_null() {
        None
    } else {
        // SAFETY: caller guarantees `s` points to at least `n` readable bytes.
        Some(unsafe { std::slice::from_raw_parts(s.cast::<u8>(), n) })
    };
    let mut wc = 0u32;
    let result = with_default_state(DefaultSlot::Mbtowc, |state| {
        let result = multibyte::decode_one(encoding, Some(&mut wc), src, Some(state));
        if result.is_err() {
            state.reset();
        }
        result
    });
    match result {
        Ok(len) => {
            if src.is_some() && !pwc.is_null() {
                // SAFETY: caller-provided out pointer.
                unsafe { *pwc = wc as wchar_t };
            }
            len as c_int
        }
        Err(err) => {
            // SAFETY: errno slot of the calling thread.
            unsafe { set_abi_errno(err.errno()) };
            -1
        }
    }
}

/// ISO C `mblen`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mblen(s: *const c_char, n: usize) -> c_int {
    let src = if s.is_null() {
        None
    } else {
        // SAFETY: caller guarantees `s` points to at least `n` readable bytes.
        Some(unsafe { std::slice::from_raw_parts(s.cast::<u8>(), n) })
    };
    match multibyte::mblen(current_encoding(), src) {
        Ok(len) => len as c_int,
        Err(err) => {
            // SAFETY: errno slot of the calling thread.
            unsafe { set_abi_errno(err.errno()) };
            -1
        }
    }
}

/// ISO C `wctomb`. `s` must have room for `MB_CUR_MAX` bytes.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wctomb(s: *mut c_char, wc: wchar_t) -> c_int {
    let encoding = current_encoding();
    if s.is_null() {
        with_default_state(DefaultSlot::Wctomb, ConversionState::reset);
        return c_int::from(encoding.is_stateful());
    }
    let mut buf = [0u8; MB_LEN_MAX];
    let result = with_default_state(DefaultSlot::Wctomb, |state| {
        let result = multibyte::encode_one(encoding, Some(&mut buf[..]), wc as u32, Some(state));
        if result.is_err() {
            state.reset();
        }
        result
    });
    match result {
        Ok(len) => {
            // SAFETY: caller guarantees room for MB_CUR_MAX >= len bytes.
            unsafe { std::ptr::copy_nonoverlapping(buf.as_ptr(), s.cast::<u8>(), len) };
            len as c_int
        }
        Err(err) => {
            // SAFETY: errno slot of the calling thread.
            unsafe { set_abi_errno(err.errno()) };
            -1
        }
    }
}

// ---------------------------------------------------------------------------
// Restartable single-character conversions
// ---------------------------------------------------------------------------

unsafe fn mbrtowc_in(
    pwc: *mut wchar_t,
    s: *const c_char,
    n: usize,
    ps: *mut ConversionState,
    slot: DefaultSlot,
) -> usize {
    let encoding = current_encoding();
    // A null `s` is `mbrtowc(NULL, "", 1, ps)`.
    let src: &[u8] = if s.is_null() {
        b"\0"
    } else {
        // SAFETY: caller guarantees `s` points to at least `n` readable bytes.
        unsafe { std::slice::from_raw_parts(s.cast::<u8>(), n) }
    };
    let mut wc = 0u32;
    // SAFETY: `ps` validity is the caller's contract.
    let result = unsafe {
        with_state(ps, slot, |state| {
            multibyte::decode_one(encoding, Some(&mut wc), Some(src), Some(state))
        })
    };
    match result {
        Ok(len) => {
            if !s.is_null() && !pwc.is_null() {
                // SAFETY: caller-provided out pointer.
                unsafe { *pwc = wc as wchar_t };
            }
            len
        }
        Err(err) => restartable_failure(err),
    }
}

/// POSIX `mbrtowc`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbrtowc(
    pwc: *mut wchar_t,
    s: *const c_char,
    n: usize,
    ps: *mut ConversionState,
) -> usize {
    // SAFETY: forwarded caller contract.
    unsafe { mbrtowc_in(pwc, s, n, ps, DefaultSlot::Mbrtowc) }
}

/// POSIX `mbrlen`: `mbrtowc` without a destination, with its own state.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbrlen(s: *const c_char, n: usize, ps: *mut ConversionState) -> usize {
    // SAFETY: forwarded caller contract.
    unsafe { mbrtowc_in(std::ptr::null_mut(), s, n, ps, DefaultSlot::Mbrlen) }
}

/// POSIX `wcrtomb`. A null `s` writes the reset sequence into an internal
/// buffer and returns its length.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcrtomb(s: *mut c_char, wc: wchar_t, ps: *mut ConversionState) -> usize {
    let encoding = current_encoding();
    let wc = if s.is_null() { 0 } else { wc as u32 };
    let mut buf = [0u8; MB_LEN_MAX];
    // SAFETY: `ps` validity is the caller's contract.
    let result = unsafe {
        with_state(ps, DefaultSlot::Wcrtomb, |state| {
            multibyte::encode_one(encoding, Some(&mut buf[..]), wc, Some(state))
        })
    };
    match result {
        Ok(len) => {
            if !s.is_null() {
                // SAFETY: caller guarantees room for MB_CUR_MAX >= len bytes.
                unsafe { std::ptr::copy_nonoverlapping(buf.as_ptr(), s.cast::<u8>(), len) };
            }
            len
        }
        Err(err) => restartable_failure(err),
    }
}

/// POSIX `mbsinit`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbsinit(ps: *const ConversionState) -> c_int {
    // SAFETY: a non-null `ps` points to a readable state.
    let state = unsafe { ps.as_ref() };
    c_int::from(multibyte::mbsinit(state))
}

// ---------------------------------------------------------------------------
// String conversions
// ---------------------------------------------------------------------------

/// Where `*src` points after a string conversion: null only once the
/// terminator was converted, otherwise the first unconverted element (the
/// end of the examined range when it was drained).
fn resume_point<T, C>(cursor: Option<&[T]>, terminated: bool, end: *const C) -> *const C {
    match cursor {
        Some(rest) => rest.as_ptr().cast(),
        None if terminated => std::ptr::null(),
        None => end,
    }
}

/// POSIX `mbsnrtowcs`: at most `nms` source bytes, at most `len` wide
/// characters into `dst`. A null `dst` only counts.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbsnrtowcs(
    dst: *mut wchar_t,
    src: *mut *const c_char,
    nms: usize,
    len: usize,
    ps: *mut ConversionState,
) -> usize {
    if src.is_null() {
        // SAFETY: errno slot of the calling thread.
        unsafe { set_abi_errno(libc::EINVAL) };
        return SIZE_INVALID;
    }
    // SAFETY: `src` validated non-null.
    let start = unsafe { *src };
    if start.is_null() {
        return 0;
    }
    let encoding = current_encoding();
    // SAFETY: the source is readable up to its terminator or `nms` bytes.
    let extent = unsafe { narrow_extent(start, nms) };
    // SAFETY: `extent` bytes were just read above.
    let bytes = unsafe { std::slice::from_raw_parts(start.cast::<u8>(), extent) };
    let out = if dst.is_null() {
        None
    } else {
        // SAFETY: wchar_t and u32 share size and alignment; caller provides `len` slots.
        Some(unsafe { std::slice::from_raw_parts_mut(dst.cast::<u32>(), len) })
    };
    let mut cursor = Some(bytes);
    // SAFETY: `ps` validity is the caller's contract.
    let result = unsafe {
        with_state(ps, DefaultSlot::Mbsrtowcs, |state| {
            multibyte::decode_string(encoding, out, &mut cursor, Some(state))
        })
    };
    if !dst.is_null() {
        let terminated = bytes.last() == Some(&0);
        // SAFETY: `src` validated non-null; `extent` stays within the source.
        unsafe { *src = resume_point(cursor, terminated, start.add(extent)) };
    }
    result.unwrap_or_else(restartable_failure)
}

/// POSIX `mbsrtowcs`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbsrtowcs(
    dst: *mut wchar_t,
    src: *mut *const c_char,
    len: usize,
    ps: *mut ConversionState,
) -> usize {
    // SAFETY: forwarded caller contract; the source is NUL-terminated.
    unsafe { mbsnrtowcs(dst, src, usize::MAX, len, ps) }
}

/// POSIX `wcsnrtombs`: at most `nwc` source characters, at most `len` bytes
/// into `dst`. A null `dst` only counts.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcsnrtombs(
    dst: *mut c_char,
    src: *mut *const wchar_t,
    nwc: usize,
    len: usize,
    ps: *mut ConversionState,
) -> usize {
    if src.is_null() {
        // SAFETY: errno slot of the calling thread.
        unsafe { set_abi_errno(libc::EINVAL) };
        return SIZE_INVALID;
    }
    // SAFETY: `src` validated non-null.
    let start = unsafe { *src };
    if start.is_null() {
        return 0;
    }
    let encoding = current_encoding();
    // SAFETY: the source is readable up to its terminator or `nwc` elements.
    let extent = unsafe { wide_extent(start, nwc) };
    // SAFETY: wchar_t and u32 share size and alignment; `extent` elements were read.
    let wide = unsafe { std::slice::from_raw_parts(start.cast::<u32>(), extent) };
    let out = if dst.is_null() {
        None
    } else {
        // SAFETY: caller provides `len` writable bytes.
        Some(unsafe { std::slice::from_raw_parts_mut(dst.cast::<u8>(), len) })
    };
    let mut cursor = Some(wide);
    // SAFETY: `ps` validity is the caller's contract.
    let result = unsafe {
        with_state(ps, DefaultSlot::Wcsrtombs, |state| {
            multibyte::encode_string(encoding, out, &mut cursor, Some(state))
        })
    };
    if !dst.is_null() {
        let terminated = wide.last() == Some(&0);
        // SAFETY: `src` validated non-null; `extent` stays within the source.
        unsafe { *src = resume_point(cursor, terminated, start.add(extent)) };
    }
    result.unwrap_or_else(restartable_failure)
}

/// POSIX `wcsrtombs`.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcsrtombs(
    dst: *mut c_char,
    src: *mut *const wchar_t,
    len: usize,
    ps: *mut ConversionState,
) -> usize {
    // SAFETY: forwarded caller contract; the source is NUL-terminated.
    unsafe { wcsnrtombs(dst, src, usize::MAX, len, ps) }
}

/// ISO C `mbstowcs`: `mbsrtowcs` from a fresh state.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn mbstowcs(dst: *mut wchar_t, src: *const c_char, len: usize) -> usize {
    let mut state = ConversionState::new();
    let mut cursor = src;
    // SAFETY: forwarded caller contract.
    unsafe { mbsrtowcs(dst, &mut cursor, len, &mut state) }
}

/// ISO C `wcstombs`: `wcsrtombs` from a fresh state.
#[cfg_attr(not(debug_assertions), unsafe(no_mangle))]
pub unsafe extern "C" fn wcstombs(dst: *mut c_char, src: *const wchar_t, len: usize) -> usize {
    let mut state = ConversionState::new();
    let mut cursor = src;
    // SAFETY: forwarded caller contract.
    unsafe { wcsrtombs(dst, &mut cursor, len, &mut state) }
}
