//! Error types for the transformation engine and its storage adapters.
//!
//! Every fallible library operation returns [`Result<T>`], whose error side is
//! [`EtlError`]. The variants map one-to-one onto the failure kinds a pipeline run can
//! report, so callers can branch on them:
//!
//! ```
//! use salesetl::error::EtlError;
//!
//! fn describe(err: &EtlError) -> &'static str {
//!     match err {
//!         EtlError::NotFound(_) => "missing blob or column",
//!         EtlError::EmptyGroupBy => "nothing to group by",
//!         _ => "other failure",
//!     }
//! }
//! ```
//!
//! [`EtlError::kind`] gives the stable kind name that the CLI prints next to the
//! message, e.g. `NotFoundError` or `InvalidConditionError`.
//!
//! The [`ResultExt`] trait adds `.context()` to any result whose error converts into
//! [`EtlError`]:
//!
//! ```no_run
//! use salesetl::error::ResultExt as _;
//!
//! fn read_spec() -> salesetl::error::Result<String> {
//!     std::fs::read_to_string("pipeline.json").context("Failed to read pipeline spec")
//! }
//! ```

use std::fmt;

/// Main error type for extraction, transformation and loading.
#[derive(Debug)]
pub enum EtlError {
    /// A blob or a required column does not exist
    NotFound(String),

    /// The input bytes are not a well-formed delimited table
    Parse(String),

    /// A filter condition could not be parsed (unknown operator, non-numeric operand)
    InvalidCondition(String),

    /// Aggregation was requested without any group-by column
    EmptyGroupBy,

    /// An operation was applied to a column of the wrong kind
    TypeMismatch(String),

    /// I/O errors from a blob store
    Io(std::io::Error),

    /// Configuration or pipeline spec errors
    Config(String),

    /// Generic error with context
    Other(String),
}

impl EtlError {
    /// Stable name of the error kind, as surfaced to users.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFoundError",
            Self::Parse(_) => "ParseError",
            Self::InvalidCondition(_) => "InvalidConditionError",
            Self::EmptyGroupBy => "EmptyGroupByError",
            Self::TypeMismatch(_) => "TypeMismatchError",
            Self::Io(_) => "IoError",
            Self::Config(_) => "ConfigError",
            Self::Other(_) => "Error",
        }
    }

    pub(crate) fn missing_column(column: &str) -> Self {
        Self::NotFound(format!("column '{column}' not found in table"))
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(msg) => write!(f, "Not found: {msg}"),
            Self::Parse(msg) => write!(f, "Malformed table: {msg}"),
            Self::InvalidCondition(msg) => write!(f, "Invalid filter condition: {msg}"),
            Self::EmptyGroupBy => write!(f, "Aggregation requires at least one group-by column"),
            Self::TypeMismatch(msg) => write!(f, "Type mismatch: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
            Self::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EtlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for EtlError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for EtlError {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => Self::Other(format!("CSV I/O error: {err}")),
            _ => Self::Parse(err.to_string()),
        }
    }
}

impl From<std::string::FromUtf8Error> for EtlError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::Parse(format!("input is not valid UTF-8: {err}"))
    }
}

impl From<serde_json::Error> for EtlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(format!("JSON error: {err}"))
    }
}

impl From<EtlError> for String {
    fn from(err: EtlError) -> Self {
        err.to_string()
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, EtlError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Errors
    ///
    /// Returns the original error, wrapped with `msg`, if `self` is an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    ///
    /// # Errors
    ///
    /// Returns the original error, wrapped with the closure's message.
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<EtlError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| wrap(e.into(), msg.into()))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| wrap(e.into(), f()))
    }
}

// Keeps the variant so the error kind survives added context.
fn wrap(err: EtlError, msg: String) -> EtlError {
    match err {
        EtlError::NotFound(inner) => EtlError::NotFound(format!("{msg}: {inner}")),
        EtlError::Parse(inner) => EtlError::Parse(format!("{msg}: {inner}")),
        EtlError::InvalidCondition(inner) => {
            EtlError::InvalidCondition(format!("{msg}: {inner}"))
        }
        EtlError::TypeMismatch(inner) => EtlError::TypeMismatch(format!("{msg}: {inner}")),
        EtlError::Config(inner) => EtlError::Config(format!("{msg}: {inner}")),
        EtlError::Io(e) => EtlError::Io(std::io::Error::new(e.kind(), format!("{msg}: {e}"))),
        EtlError::EmptyGroupBy => EtlError::EmptyGroupBy,
        EtlError::Other(inner) => EtlError::Other(format!("{msg}: {inner}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EtlError::NotFound("sales.csv".to_owned());
        assert_eq!(err.to_string(), "Not found: sales.csv");
        assert_eq!(err.kind(), "NotFoundError");
    }

    #[test]
    fn test_error_conversion_to_string() {
        let err = EtlError::EmptyGroupBy;
        let s: String = err.into();
        assert_eq!(s, "Aggregation requires at least one group-by column");
    }

    #[test]
    fn test_context_preserves_kind() {
        let result: std::result::Result<(), EtlError> =
            Err(EtlError::Parse("unterminated quote".to_owned()));

        let err = result.context("Failed to parse sales.csv").unwrap_err();
        assert_eq!(err.kind(), "ParseError");
        assert!(err.to_string().contains("Failed to parse sales.csv"));
        assert!(err.to_string().contains("unterminated quote"));
    }

    #[test]
    fn test_io_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "bucket",
        ));

        let err = result.context("Failed to write blob").unwrap_err();
        assert_eq!(err.kind(), "IoError");
        assert!(err.to_string().contains("Failed to write blob"));
    }
}
