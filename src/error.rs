//! Error types for save file parsing and writing.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T, E = SaveError> = std::result::Result<T, E>;

/// Errors raised while parsing or writing a save file.
///
/// Positional errors carry the byte offset at which they were detected.
/// The offset refers to the stream being parsed at the time, which is the
/// decompressed body stream for anything past the template table of a
/// compressed save.
#[derive(Debug, Error)]
pub enum SaveError {
    /// A read ran past the end of the input buffer.
    #[error("unexpected end of data (need {needed} bytes, have {available}) at offset {offset:#x}")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// Malformed data: bad lengths, invalid identifiers, missing markers,
    /// descriptor flag conflicts, decompression or JSON failures.
    #[error("{message}")]
    Corruption {
        message: String,
        offset: Option<usize>,
    },

    /// The save's version is not one this parser targets.
    #[error(
        "save version {actual_major}.{actual_minor} is incompatible, expected {expected_major}.{expected_minor}"
    )]
    VersionMismatch {
        expected_major: i32,
        expected_minor: i32,
        actual_major: i32,
        actual_minor: i32,
    },

    /// File I/O failure from the `from_file`/`to_file` convenience layer.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SaveError {
    /// Corruption with no meaningful byte position.
    pub fn corruption(message: impl Into<String>) -> Self {
        SaveError::Corruption {
            message: message.into(),
            offset: None,
        }
    }

    /// Corruption at a byte offset. The offset is appended to the message
    /// so it survives into logs and `Display` output.
    pub fn corruption_at(message: impl Into<String>, offset: usize) -> Self {
        SaveError::Corruption {
            message: format!("{} at offset {offset:#x}", message.into()),
            offset: Some(offset),
        }
    }

    /// Byte offset associated with this error, if any.
    pub fn offset(&self) -> Option<usize> {
        match self {
            SaveError::Truncated { offset, .. } => Some(*offset),
            SaveError::Corruption { offset, .. } => *offset,
            _ => None,
        }
    }
}
