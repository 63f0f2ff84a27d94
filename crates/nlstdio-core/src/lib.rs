//! # nlstdio-core
//!
//! Safe Rust implementation of the printf-family formatting core and the
//! locale-aware multibyte/wide-character conversion layer it depends on.
//!
//! Modules:
//! - `errno`: errno constants and the thread-local errno cell
//! - `error`: the `StdioError` taxonomy shared by every fallible operation
//! - `locale`: encoding selection (process-wide and per-thread)
//! - `multibyte`: `mbrtowc`/`wcrtomb`/`mbsnrtowcs`/`wcsnrtombs` contracts
//! - `stdio`: directive parsing, field rendering, output sinks, the writer

pub mod errno;
pub mod error;
pub mod locale;
pub mod multibyte;
pub mod stdio;

pub use error::{Result, StdioError};
