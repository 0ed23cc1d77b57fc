//! Builders that turn aligned tenant sources or decoded HMap sources into a
//! [`UnifiedMap`].

use crate::align::AlignedSource;
use crate::source::{insert_ranked, CellImage, UnifiedCell, UnifiedMap};
use haven_catalog::SourceTile;
use haven_core::coord::TileCoord;
use haven_hmap::HmapGrid;
use image::RgbaImage;
use std::path::Path;
use std::sync::Arc;

/// One tenant source's zoom-0 tiles, paired with its resolved offset.
pub struct TenantTileBatch<'a> {
    /// Alignment result for this source.
    pub aligned: &'a AlignedSource,
    /// This source's own-space tiles with their on-disk paths.
    pub tiles: &'a [(SourceTile, std::path::PathBuf)],
}

/// Build a unified map from tenant sources, applying each source's offset
/// and resolving overlaps by the greatest `cacheTimestamp`.
pub fn build_unified_from_tenant_tiles(batches: &[TenantTileBatch<'_>]) -> UnifiedMap {
    let mut map = UnifiedMap::new();
    for batch in batches {
        let (dx, dy) = batch.aligned.offset;
        for (tile, path) in batch.tiles {
            let coord = TileCoord::new(tile.coord_x + dx, tile.coord_y + dy);
            insert_ranked(
                &mut map,
                coord,
                UnifiedCell {
                    image: CellImage::Path(path.clone()),
                    rank: tile.cache_timestamp,
                },
            );
        }
    }
    map
}

/// One HMap source's decoded grids, already rendered, paired with its
/// priority and alignment offset.
pub struct HmapGridBatch<'a> {
    /// Ordering priority; higher wins on overlap.
    pub priority: i32,
    /// Offset applied to each grid's own coordinates (normally `(0, 0)` for
    /// the highest-priority source; see design notes on HMap alignment).
    pub offset: (i64, i64),
    /// Decoded grids paired with their rendered images, in file order.
    pub grids: &'a [(HmapGrid, Arc<RgbaImage>)],
}

/// Build a unified map from HMap sources, in decreasing-priority order,
/// keeping the first (highest-priority) claimant of each coordinate.
pub fn build_unified_from_hmap_grids(mut batches: Vec<HmapGridBatch<'_>>) -> UnifiedMap {
    batches.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut map = UnifiedMap::new();
    for batch in &batches {
        let (dx, dy) = batch.offset;
        for (grid, image) in batch.grids {
            let coord = TileCoord::new(grid.tile_x as i64 + dx, grid.tile_y as i64 + dy);
            insert_ranked(
                &mut map,
                coord,
                UnifiedCell {
                    image: CellImage::Rendered(image.clone()),
                    rank: batch.priority as i64,
                },
            );
        }
    }
    map
}

/// Load a tenant tile's PNG bytes from disk into an RGBA image. Missing or
/// corrupt files are logged and skipped, never fatal to the surrounding tile.
pub fn load_tenant_tile(path: &Path) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(img) => Some(img.to_rgba8()),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to load source tile");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile(x: i64, y: i64, ts: i64) -> SourceTile {
        SourceTile {
            coord_x: x,
            coord_y: y,
            cache_timestamp: ts,
            file: format!("{x}_{y}.png"),
        }
    }

    #[test]
    fn test_tenant_overlap_tiebreak_by_cache_timestamp() {
        let a = AlignedSource {
            tenant_id: "a".into(),
            map_id: "m".into(),
            offset: (0, 0),
        };
        let b = AlignedSource {
            tenant_id: "b".into(),
            map_id: "m".into(),
            offset: (0, 0),
        };
        let a_tiles = vec![(tile(0, 0, 1), "a.png".into())];
        let b_tiles = vec![(tile(0, 0, 99), "b.png".into())];

        let batches = vec![
            TenantTileBatch {
                aligned: &a,
                tiles: &a_tiles,
            },
            TenantTileBatch {
                aligned: &b,
                tiles: &b_tiles,
            },
        ];

        let unified = build_unified_from_tenant_tiles(&batches);
        let cell = &unified[&TileCoord::new(0, 0)];
        match &cell.image {
            CellImage::Path(p) => assert_eq!(p.to_str().unwrap(), "b.png"),
            _ => panic!(),
        }
    }

    #[test]
    fn test_tenant_offset_applied() {
        let a = AlignedSource {
            tenant_id: "a".into(),
            map_id: "m".into(),
            offset: (2, 2),
        };
        let a_tiles = vec![(tile(0, 0, 1), "a.png".into())];
        let batches = vec![TenantTileBatch {
            aligned: &a,
            tiles: &a_tiles,
        }];
        let unified = build_unified_from_tenant_tiles(&batches);
        assert!(unified.contains_key(&TileCoord::new(2, 2)));
    }
}
