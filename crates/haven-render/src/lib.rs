//! # Haven Render
//!
//! Texture resolution and HMap grid rasterisation: turns a decoded
//! [`haven_hmap::HmapGrid`] plus a resolved texture table into a 100x100
//! RGBA image, and resolves texture-resource names to cached images in the
//! first place.

pub mod error;
pub mod fetcher;
pub mod grid;

pub use error::RenderError;
pub use fetcher::{ResourceSource, TileResourceFetcher};
pub use grid::render_grid;
