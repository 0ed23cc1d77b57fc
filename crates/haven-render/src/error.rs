//! Errors raised while resolving textures or rasterising a grid.

use thiserror::Error;

/// Failures from texture fetching and grid rendering.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The underlying [`crate::fetcher::ResourceSource`] failed.
    #[error("resource fetch failed for '{name}': {message}")]
    FetchFailed {
        /// Resource name that failed to resolve.
        name: String,
        /// Underlying error message.
        message: String,
    },

    /// Bytes for a resource could not be decoded as an image.
    #[error("failed to decode texture '{name}': {message}")]
    DecodeFailed {
        /// Resource name that failed to decode.
        name: String,
        /// Underlying decode error message.
        message: String,
    },

    /// A grid did not carry the expected fixed-size buffers.
    #[error("malformed grid: expected {expected} cells, got {actual}")]
    MalformedGrid {
        /// Expected cell count.
        expected: usize,
        /// Actual cell count found.
        actual: usize,
    },
}

impl From<RenderError> for haven_core::Error {
    fn from(e: RenderError) -> Self {
        match &e {
            RenderError::MalformedGrid { .. } => haven_core::Error::invalid(e.to_string()),
            _ => haven_core::Error::internal(e.to_string()),
        }
    }
}
