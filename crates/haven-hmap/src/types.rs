//! Decoded in-memory representation of an HMap file.

use crate::GRID_CELLS;

/// One texture reference a grid's tile indices point into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tileset {
    /// Name of the texture resource, resolved externally by `haven-render`.
    pub resource_name: String,
}

/// A single decoded 100x100 grid.
#[derive(Debug, Clone)]
pub struct HmapGrid {
    /// Segment this grid belongs to.
    pub segment_id: i64,
    /// Grid X coordinate in the HMap's own (unaligned) space.
    pub tile_x: i32,
    /// Grid Y coordinate in the HMap's own (unaligned) space.
    pub tile_y: i32,
    /// Per-cell index into `tilesets`, row-major, length [`GRID_CELLS`].
    pub tile_indices: Vec<u8>,
    /// Per-cell height, row-major, length [`GRID_CELLS`].
    pub z_map: Vec<f32>,
    /// Textures referenced by this grid's `tile_indices`.
    pub tilesets: Vec<Tileset>,
}

impl HmapGrid {
    /// Validate the fixed-size invariants a decoded grid must hold.
    pub fn is_well_formed(&self) -> bool {
        self.tile_indices.len() == GRID_CELLS && self.z_map.len() == GRID_CELLS
    }
}

/// A surface marker ("thingwall" or otherwise) recorded in an HMap file.
#[derive(Debug, Clone)]
pub struct HmapMarker {
    /// Stable object identifier.
    pub object_id: u64,
    /// Absolute world tile X.
    pub tile_x: i32,
    /// Absolute world tile Y.
    pub tile_y: i32,
    /// Display name.
    pub name: String,
    /// Name of the icon resource; markers whose resource name contains
    /// `"thingwall"` are treated as public.
    pub resource_name: String,
}

impl HmapMarker {
    /// Whether this marker should be treated as a public "thingwall" marker.
    pub fn is_thingwall(&self) -> bool {
        self.resource_name.contains("thingwall")
    }
}

/// The full decoded contents of one HMap file.
#[derive(Debug, Clone, Default)]
pub struct HmapData {
    /// All decoded grids, across every segment.
    pub grids: Vec<HmapGrid>,
    /// All decoded markers.
    pub markers: Vec<HmapMarker>,
}
