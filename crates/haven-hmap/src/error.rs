//! Decode-time errors for the HMap format.

use thiserror::Error;

/// Errors raised while parsing an HMap byte stream.
#[derive(Debug, Error)]
pub enum HmapError {
    /// The leading signature did not match `Haven Mapfile 1`.
    #[error("not an HMap file: signature mismatch")]
    BadSignature,

    /// The stream ended before a length-prefixed structure was fully read.
    #[error("truncated HMap file at offset {offset}")]
    Truncated {
        /// Byte offset at which the read failed.
        offset: usize,
    },

    /// A string field was not valid UTF-8.
    #[error("invalid UTF-8 in HMap string field at offset {offset}")]
    InvalidString {
        /// Byte offset of the offending string.
        offset: usize,
    },
}

impl From<HmapError> for haven_core::Error {
    fn from(e: HmapError) -> Self {
        haven_core::Error::invalid(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            HmapError::Truncated { offset: 10 }.to_string(),
            "truncated HMap file at offset 10"
        );
    }
}
