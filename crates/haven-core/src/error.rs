//! Crate-wide error type shared by every `haven-*` crate.

use thiserror::Error;

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

/// The four error kinds the catalog-facing API surfaces, plus the I/O and
/// encoding failures the engine's internals produce.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced entity (public map, source, tenant map, HMap source) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller supplied an invalid argument (malformed slug, duplicate link, bad input file).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The requested operation conflicts with current state (e.g. a generation already running).
    #[error("conflict: {0}")]
    Conflict(String),

    /// An unexpected internal failure, typically I/O or codec related.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a [`Error::NotFound`] from any displayable message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Build a [`Error::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Build a [`Error::Conflict`].
    pub fn conflict(msg: impl Into<String>) -> Self {
        Error::Conflict(msg.into())
    }

    /// Build a [`Error::Internal`].
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Internal(format!("io error: {e}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Internal(format!("json error: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert!(matches!(Error::not_found("x"), Error::NotFound(_)));
        assert!(matches!(Error::invalid("x"), Error::InvalidArgument(_)));
        assert!(matches!(Error::conflict("x"), Error::Conflict(_)));
        assert!(matches!(Error::internal("x"), Error::Internal(_)));
    }
}
