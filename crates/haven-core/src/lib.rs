//! # Haven Core
//!
//! Shared coordinate math, identifiers, configuration, and error types for the
//! Haven & Hearth public-map generation engine.
//!
//! This crate has no knowledge of tile rendering, HMap decoding, or catalog
//! persistence; it is the foundation every other `haven-*` crate builds on.
//!
//! ```
//! use haven_core::coord::fdiv;
//!
//! assert_eq!(fdiv(-5, 4), -2);
//! assert_eq!(fdiv(5, 4), 1);
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod coord;
pub mod error;
pub mod ids;

pub use config::EngineConfig;
pub use coord::{fdiv, BlockCoord, TileCoord};
pub use error::{Error, Result};
pub use ids::{HmapSourceId, MapId, PublicMapId, TenantId};

/// Crate version, exposed for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
