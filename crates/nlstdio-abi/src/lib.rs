//! # nlstdio-abi
//!
//! C ABI entry points over `nlstdio-core`: the `<wchar.h>`/`<stdlib.h>`
//! multibyte conversion functions, `setlocale` for `LC_CTYPE`, and the
//! thread-local `errno`.
//!
//! Symbols are exported unmangled in release builds only, so debug test
//! binaries keep linking against the host libc.

pub mod errno_abi;
pub mod locale_abi;
pub mod wchar_abi;
