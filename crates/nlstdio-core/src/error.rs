//! Failure kinds shared by the codec and the writer.

use crate::errno;

/// Every way a conversion or formatting call can fail.
///
/// Sinks are not transactional: when a `format` call fails, bytes already
/// handed to the sink stay there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StdioError {
    /// Not enough source bytes to finish one character. Supplying more
    /// bytes with the same state resumes the conversion.
    #[error("incomplete multibyte sequence")]
    IncompleteSequence,
    /// The bytes or the code point do not form a character of the active
    /// encoding.
    #[error("invalid or unrepresentable character")]
    InvalidSequence,
    /// The sink could not take the bytes (write error, allocation failure).
    #[error("output sink failed: {}", crate::errno::strerror_message(*errno))]
    OutputError { errno: i32 },
    /// The format string ends inside a directive.
    #[error("malformed conversion directive at byte {offset}")]
    MalformedDirective { offset: usize },
    /// The destination slice cannot hold the encoded character.
    #[error("destination too small, {needed} bytes required")]
    InsufficientSpace { needed: usize },
    /// A directive needs an argument that is missing or of the wrong kind.
    #[error("argument {index} missing or incompatible with its directive")]
    ArgumentMismatch { index: usize },
    /// The logical output length does not fit the return type.
    #[error("output length overflow")]
    Overflow,
}

impl StdioError {
    /// The errno value a C entry point publishes for this failure.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::IncompleteSequence | Self::InvalidSequence => errno::EILSEQ,
            Self::OutputError { errno } => *errno,
            Self::MalformedDirective { .. } | Self::ArgumentMismatch { .. } => errno::EINVAL,
            Self::InsufficientSpace { .. } => errno::E2BIG,
            Self::Overflow => errno::EOVERFLOW,
        }
    }
}

pub type Result<T> = core::result::Result<T, StdioError>;
