//! # Haven HMap
//!
//! Decoder for the `Haven Mapfile 1` binary world-snapshot format.
//!
//! An HMap file is a self-contained dump of one or more map segments, each
//! holding a number of 100x100 grids (tile index + height map + tileset
//! table) plus a trailing marker section. This crate only reads the format;
//! rendering a decoded grid into an image lives in `haven-render`.
//!
//! ```no_run
//! use haven_hmap::decode_hmap;
//!
//! # fn run() -> haven_core::Result<()> {
//! let bytes = std::fs::read("world.hmap")?;
//! let data = decode_hmap(&bytes)?;
//! println!("decoded {} grids", data.grids.len());
//! # Ok(())
//! # }
//! ```

pub mod decode;
pub mod error;
pub mod types;

pub use decode::decode_hmap;
pub use error::HmapError;
pub use types::{HmapData, HmapGrid, HmapMarker, Tileset};

/// The 15-byte magic string every HMap file must begin with.
pub const MAGIC: &[u8; 15] = b"Haven Mapfile 1";

/// Side length, in pixels, of one rendered grid.
pub const GRID_SIZE: usize = 100;

/// Number of tile cells in one grid (`GRID_SIZE * GRID_SIZE`).
pub const GRID_CELLS: usize = GRID_SIZE * GRID_SIZE;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_len() {
        assert_eq!(MAGIC.len(), 15);
    }
}
