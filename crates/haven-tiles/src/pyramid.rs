//! Pyramid building (C7): zoom levels 1..6 by 2x2 downsampling from
//! actually-written child tiles, stopping early at an empty level.

use crate::compose::{save_tile, tile_filename, CELL_SIZE};
use haven_core::coord::BlockCoord;
use image::{imageops, Rgba, RgbaImage};
use std::collections::HashSet;
use std::path::Path;

/// Highest zoom level the pyramid extends to.
pub const MAX_ZOOM: u32 = 6;

/// Side length in pixels of one composed tile, reused for the downsampled
/// child quadrant (`TILE_SIZE / 2`).
const TILE_SIZE: u32 = CELL_SIZE * 4;
const HALF_TILE: u32 = TILE_SIZE / 2;

/// Build zoom levels `1..=6` under `output_dir/{zoom}/{x}_{y}.webp` from the
/// zoom-0 tiles actually written at `output_dir/0/`.
///
/// Returns the set of written tile coordinates per zoom level generated
/// (zoom 0 excluded; it is the caller-supplied input). Stops as soon as a
/// level produces no tiles.
pub fn build_pyramid(
    output_dir: &Path,
    zoom0_written: &HashSet<BlockCoord>,
) -> haven_core::Result<Vec<(u32, HashSet<BlockCoord>)>> {
    let mut levels = Vec::new();
    let mut children = zoom0_written.clone();

    for zoom in 1..=MAX_ZOOM {
        let parents: HashSet<BlockCoord> = children.iter().map(|c| c.parent()).collect();
        let mut written = HashSet::new();

        for parent in &parents {
            if let Some(tile) = compose_parent_tile(output_dir, zoom - 1, *parent)? {
                let path = output_dir.join(zoom.to_string()).join(tile_filename(parent.x, parent.y));
                save_tile(&tile, &path)?;
                written.insert(*parent);
            }
        }

        if written.is_empty() {
            break;
        }

        levels.push((zoom, written.clone()));
        children = written;
    }

    Ok(levels)
}

fn compose_parent_tile(
    output_dir: &Path,
    child_zoom: u32,
    parent: BlockCoord,
) -> haven_core::Result<Option<RgbaImage>> {
    let mut canvas = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([0, 0, 0, 0]));
    let mut wrote_any = false;

    for (i, child) in parent.children().into_iter().enumerate() {
        let dqx = (i % 2) as u32;
        let dqy = (i / 2) as u32;
        let path = output_dir
            .join(child_zoom.to_string())
            .join(tile_filename(child.x, child.y));
        if !path.exists() {
            continue;
        }
        let Ok(img) = image::open(&path) else {
            tracing::warn!(path = %path.display(), "failed to load child tile for pyramid");
            continue;
        };
        let resized = imageops::resize(&img.to_rgba8(), HALF_TILE, HALF_TILE, imageops::FilterType::Nearest);
        imageops::overlay(&mut canvas, &resized, (dqx * HALF_TILE) as i64, (dqy * HALF_TILE) as i64);
        wrote_any = true;
    }

    Ok(wrote_any.then_some(canvas))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::save_tile;

    fn solid(c: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba(c))
    }

    #[test]
    fn test_pyramid_sparsity_from_single_tile() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        save_tile(&solid([1, 2, 3, 255]), &root.join("0").join("5_5.webp")).unwrap();

        let zoom0 = HashSet::from([BlockCoord::new(5, 5)]);
        let levels = build_pyramid(root, &zoom0).unwrap();

        // zoom 1..6 all produce exactly one tile at (0,0) after enough halvings.
        assert_eq!(levels.len(), 6);
        assert_eq!(levels[0].0, 1);
        assert!(levels[0].1.contains(&BlockCoord::new(2, 2)));
        assert_eq!(levels[5].0, 6);
        assert!(levels[5].1.contains(&BlockCoord::new(0, 0)));
    }

    #[test]
    fn test_pyramid_empty_input_produces_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let levels = build_pyramid(dir.path(), &HashSet::new()).unwrap();
        assert!(levels.is_empty());
    }
}
