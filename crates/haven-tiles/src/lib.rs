//! Tile composition pipeline: aligns sources into a unified coordinate
//! dictionary, composes 400x400 output tiles, builds the zoom pyramid, and
//! extracts public markers.

pub mod align;
pub mod build;
pub mod compose;
pub mod markers;
pub mod pyramid;
pub mod source;

pub use align::{align_tenant_sources, AlignedSource, TenantSourceGrids};
pub use build::{build_unified_from_hmap_grids, build_unified_from_tenant_tiles, load_tenant_tile, HmapGridBatch, TenantTileBatch};
pub use compose::{compose_tile, save_tile, tile_filename, CELL_SIZE, TILE_SIZE};
pub use markers::{to_json as markers_to_json, MarkerCollector, OutputMarker};
pub use pyramid::{build_pyramid, MAX_ZOOM};
pub use source::{insert_ranked, CellImage, UnifiedCell, UnifiedMap};
