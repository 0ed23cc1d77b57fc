//! The unified-coordinate dictionary the composer draws from, built
//! identically regardless of whether cells came from tenant sources or
//! HMap sources.

use haven_core::coord::TileCoord;
use image::RgbaImage;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Where to find a unified cell's pixel data.
#[derive(Clone)]
pub enum CellImage {
    /// Tenant path: a 100x100 PNG on disk, loaded lazily by the composer.
    Path(PathBuf),
    /// HMap path: already rasterised in memory by `haven-render`.
    Rendered(Arc<RgbaImage>),
}

/// One cell in the unified coordinate dictionary.
#[derive(Clone)]
pub struct UnifiedCell {
    /// Pixel data location.
    pub image: CellImage,
    /// Tie-break rank: `cacheTimestamp` for tenant tiles, `priority` for
    /// HMap grids. Higher wins.
    pub rank: i64,
}

/// Coordinate to cell map; the composer's sole input, independent of source kind.
pub type UnifiedMap = HashMap<TileCoord, UnifiedCell>;

/// Insert `coord -> cell` into `map`, keeping whichever of the existing and
/// new entry has the strictly greater rank. On a tie the existing entry
/// (processed earlier, per caller's source ordering) is kept.
pub fn insert_ranked(map: &mut UnifiedMap, coord: TileCoord, cell: UnifiedCell) {
    match map.get(&coord) {
        Some(existing) if existing.rank >= cell.rank => {}
        _ => {
            map.insert(coord, cell);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_ranked_higher_wins() {
        let mut map = UnifiedMap::new();
        let coord = TileCoord::new(0, 0);
        insert_ranked(
            &mut map,
            coord,
            UnifiedCell {
                image: CellImage::Path("a.png".into()),
                rank: 1,
            },
        );
        insert_ranked(
            &mut map,
            coord,
            UnifiedCell {
                image: CellImage::Path("b.png".into()),
                rank: 5,
            },
        );
        match &map[&coord].image {
            CellImage::Path(p) => assert_eq!(p, &PathBuf::from("b.png")),
            _ => panic!("expected path variant"),
        }
    }

    #[test]
    fn test_insert_ranked_tie_keeps_first() {
        let mut map = UnifiedMap::new();
        let coord = TileCoord::new(0, 0);
        insert_ranked(
            &mut map,
            coord,
            UnifiedCell {
                image: CellImage::Path("first.png".into()),
                rank: 3,
            },
        );
        insert_ranked(
            &mut map,
            coord,
            UnifiedCell {
                image: CellImage::Path("second.png".into()),
                rank: 3,
            },
        );
        match &map[&coord].image {
            CellImage::Path(p) => assert_eq!(p, &PathBuf::from("first.png")),
            _ => panic!("expected path variant"),
        }
    }
}
