//! Error types for TOON decoding and encoding.
//!
//! Every failure the engine can report is one variant of [`Error`]. Decoding
//! errors carry the 1-based line number where one is meaningful, and limit
//! errors carry both the observed value and the configured limit.
//!
//! ## Error Categories
//!
//! - **Structural**: [`Error::InvalidFormat`], [`Error::InvalidIndentation`],
//!   [`Error::InvalidHeader`], [`Error::UnexpectedBlankLine`]
//! - **Declared shape**: [`Error::CountMismatch`], [`Error::FieldCountMismatch`]
//! - **Strings**: [`Error::InvalidEscapeSequence`]
//! - **Binding**: [`Error::TypeMismatch`], [`Error::KeyNotFound`], [`Error::DataCorrupted`]
//! - **Path expansion**: [`Error::PathCollision`]
//! - **Limits**: [`Error::InputTooLarge`], [`Error::DepthLimitExceeded`],
//!   [`Error::ObjectKeyLimitExceeded`], [`Error::ArrayLengthLimitExceeded`]
//!
//! ## Examples
//!
//! ```rust
//! use toon_value::{decode, DecodeOptions, Error};
//!
//! let err = decode("items[3]: a,b", &DecodeOptions::default()).unwrap_err();
//! assert!(matches!(err, Error::CountMismatch { expected: 3, actual: 2, .. }));
//! assert!(err.to_string().contains("line 1"));
//! ```

use std::fmt;
use thiserror::Error;

/// Represents all possible errors that can occur while decoding or encoding TOON.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Malformed UTF-8 or a line that fits none of the grammar's productions
    #[error("Invalid TOON format at line {line}: {msg}")]
    InvalidFormat { line: usize, msg: String },

    /// A line's indentation depth does not match its enclosing block
    #[error("Invalid indentation at line {line}: expected depth {expected}, found depth {found}")]
    InvalidIndentation {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// Unknown escape sequence or trailing backslash in a quoted string
    #[error("Invalid escape sequence: {0}")]
    InvalidEscapeSequence(String),

    /// An array produced a different number of items than its header declares
    #[error("Array count mismatch at line {line}: header declares {expected}, found {actual}")]
    CountMismatch {
        expected: usize,
        actual: usize,
        line: usize,
    },

    /// A tabular row has a different number of cells than the header has fields
    #[error("Field count mismatch at line {line}: header declares {expected} fields, row has {actual}")]
    FieldCountMismatch {
        expected: usize,
        actual: usize,
        line: usize,
    },

    /// Blank line inside a tabular or list block
    #[error("Unexpected blank line at line {line} inside array block")]
    UnexpectedBlankLine { line: usize },

    /// Malformed `key[N]{fields}:` array header
    #[error("Invalid array header at line {line}: {msg}")]
    InvalidHeader { line: usize, msg: String },

    /// Value kind does not match the requested target type
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    /// Required key absent from an object
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Well-formed value whose payload cannot be represented by the target
    #[error("Data corrupted: {0}")]
    DataCorrupted(String),

    /// Dotted-key expansion would overwrite a non-object value
    #[error("Path expansion collision at line {line}: '{path}' is not an object")]
    PathCollision { path: String, line: usize },

    #[error("Input too large: {size} bytes exceeds limit of {limit}")]
    InputTooLarge { size: usize, limit: usize },

    #[error("Nesting depth {depth} exceeds limit of {limit}")]
    DepthLimitExceeded { depth: usize, limit: usize },

    #[error("Object has {count} keys, exceeding limit of {limit}")]
    ObjectKeyLimitExceeded { count: usize, limit: usize },

    #[error("Array length {length} exceeds limit of {limit}")]
    ArrayLengthLimitExceeded { length: usize, limit: usize },

    /// Host value that has no TOON representation
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// IO error during reading or writing
    #[error("IO error: {0}")]
    Io(String),

    /// Custom error raised through serde
    #[error("Error: {0}")]
    Custom(String),
}

impl Error {
    /// Creates an invalid format error at the given line.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use toon_value::Error;
    ///
    /// let err = Error::invalid_format(4, "expected key: value");
    /// assert!(err.to_string().contains("line 4"));
    /// ```
    pub fn invalid_format(line: usize, msg: impl Into<String>) -> Self {
        Error::InvalidFormat {
            line,
            msg: msg.into(),
        }
    }

    pub fn invalid_indentation(line: usize, expected: usize, found: usize) -> Self {
        Error::InvalidIndentation {
            line,
            expected,
            found,
        }
    }

    pub fn invalid_header(line: usize, msg: impl Into<String>) -> Self {
        Error::InvalidHeader {
            line,
            msg: msg.into(),
        }
    }

    /// Creates a type mismatch error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use toon_value::Error;
    ///
    /// let err = Error::type_mismatch("bool", "string");
    /// assert!(err.to_string().contains("expected bool"));
    /// ```
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn data_corrupted<T: fmt::Display>(msg: T) -> Self {
        Error::DataCorrupted(msg.to_string())
    }

    pub fn unsupported_type(msg: &str) -> Self {
        Error::UnsupportedType(msg.to_string())
    }

    /// Creates a custom error with a display message.
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for reading/writing failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }

    /// Returns the 1-based line number the error points at, if it has one.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::InvalidFormat { line, .. }
            | Error::InvalidIndentation { line, .. }
            | Error::CountMismatch { line, .. }
            | Error::FieldCountMismatch { line, .. }
            | Error::UnexpectedBlankLine { line }
            | Error::InvalidHeader { line, .. }
            | Error::PathCollision { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Returns `true` for the four resource-limit variants.
    #[must_use]
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            Error::InputTooLarge { .. }
                | Error::DepthLimitExceeded { .. }
                | Error::ObjectKeyLimitExceeded { .. }
                | Error::ArrayLengthLimitExceeded { .. }
        )
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }
}

impl serde::de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::DataCorrupted(msg.to_string())
    }

    fn invalid_type(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        Error::TypeMismatch {
            expected: exp.to_string(),
            found: unexp.to_string(),
        }
    }

    fn invalid_value(unexp: serde::de::Unexpected<'_>, exp: &dyn serde::de::Expected) -> Self {
        Error::DataCorrupted(format!("invalid value: {}, expected {}", unexp, exp))
    }

    fn invalid_length(len: usize, exp: &dyn serde::de::Expected) -> Self {
        Error::DataCorrupted(format!("invalid length {}, expected {}", len, exp))
    }

    fn missing_field(field: &'static str) -> Self {
        Error::KeyNotFound(field.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::Error as _;

    #[test]
    fn test_line_accessor() {
        assert_eq!(Error::invalid_format(3, "x").line(), Some(3));
        assert_eq!(Error::UnexpectedBlankLine { line: 7 }.line(), Some(7));
        assert_eq!(Error::KeyNotFound("id".into()).line(), None);
    }

    #[test]
    fn test_limit_classification() {
        assert!(Error::InputTooLarge { size: 11, limit: 10 }.is_limit());
        assert!(Error::DepthLimitExceeded { depth: 3, limit: 2 }.is_limit());
        assert!(!Error::invalid_header(1, "bad").is_limit());
    }

    #[test]
    fn test_serde_error_mapping() {
        let err = Error::missing_field("name");
        assert_eq!(err, Error::KeyNotFound("name".to_string()));

        let err = Error::invalid_value(serde::de::Unexpected::Signed(200), &"i8");
        match err {
            Error::DataCorrupted(msg) => {
                assert!(msg.contains("200"));
                assert!(msg.contains("i8"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
