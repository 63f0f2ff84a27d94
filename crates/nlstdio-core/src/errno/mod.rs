//! Error number definitions.
//!
//! The errno values the conversion and formatting layers can publish, plus
//! the thread-local errno cell the C surface reads and writes.

use std::cell::Cell;

thread_local! {
    static ERRNO: Cell<i32> = const { Cell::new(0) };
}

pub const EINTR: i32 = 4;
pub const EIO: i32 = 5;
pub const E2BIG: i32 = 7;
pub const EBADF: i32 = 9;
pub const EAGAIN: i32 = 11;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const ENOSPC: i32 = 28;
pub const EPIPE: i32 = 32;
pub const EOVERFLOW: i32 = 75;
pub const EILSEQ: i32 = 84;

/// Returns the error message string for the given errno value.
pub fn strerror_message(errnum: i32) -> &'static str {
    match errnum {
        0 => "Success",
        EINTR => "Interrupted system call",
        EIO => "Input/output error",
        E2BIG => "Argument list too long",
        EBADF => "Bad file descriptor",
        EAGAIN => "Resource temporarily unavailable",
        ENOMEM => "Cannot allocate memory",
        EINVAL => "Invalid argument",
        ENOSPC => "No space left on device",
        EPIPE => "Broken pipe",
        EOVERFLOW => "Value too large for defined data type",
        EILSEQ => "Invalid or incomplete multibyte or wide character",
        _ => "Unknown error",
    }
}

/// Returns the current thread-local errno value.
pub fn get_errno() -> i32 {
    ERRNO.try_with(Cell::get).unwrap_or(0)
}

/// Sets the current thread-local errno value.
pub fn set_errno(value: i32) {
    let _ = ERRNO.try_with(|cell| cell.set(value));
}

/// Address of the calling thread's errno cell, for `__errno_location`.
///
/// `None` once the thread's local storage has been torn down.
pub fn errno_ptr() -> Option<*mut i32> {
    ERRNO.try_with(Cell::as_ptr).ok()
}
