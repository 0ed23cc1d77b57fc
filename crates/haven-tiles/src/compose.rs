//! Tile composition (C6): merges a unified coordinate dictionary into
//! 400x400 WebP output tiles.

use crate::build::load_tenant_tile;
use crate::source::{CellImage, UnifiedMap};
use haven_core::coord::{BlockCoord, TileCoord};
use image::{imageops, Rgba, RgbaImage};
use std::path::Path;

/// Side length in pixels of one source (grid/tenant) cell.
pub const CELL_SIZE: u32 = 100;

/// Side length in pixels of one composed output tile (a 4x4 block of cells).
pub const TILE_SIZE: u32 = CELL_SIZE * 4;

/// Compose the output tile covering `block`, or `None` if none of its 16
/// cells are present in `unified`.
pub fn compose_tile(unified: &UnifiedMap, block: BlockCoord) -> Option<RgbaImage> {
    let mut canvas = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba([0, 0, 0, 0]));
    let mut wrote_any = false;

    for dy in 0..4i64 {
        for dx in 0..4i64 {
            let coord = TileCoord::new(block.x * 4 + dx, block.y * 4 + dy);
            let Some(cell) = unified.get(&coord) else {
                continue;
            };
            let Some(cell_img) = resolve_cell_image(&cell.image) else {
                continue;
            };
            imageops::overlay(
                &mut canvas,
                &cell_img,
                (dx as u32 * CELL_SIZE) as i64,
                (dy as u32 * CELL_SIZE) as i64,
            );
            wrote_any = true;
        }
    }

    wrote_any.then_some(canvas)
}

fn resolve_cell_image(image: &CellImage) -> Option<RgbaImage> {
    match image {
        CellImage::Path(path) => load_tenant_tile(path),
        CellImage::Rendered(img) => Some((**img).clone()),
    }
}

/// Encode a tile as WebP and write it to `path`, creating parent directories.
pub fn save_tile(img: &RgbaImage, path: &Path) -> haven_core::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    image::codecs::webp::WebPEncoder::new_lossless(&mut writer)
        .encode(img.as_raw(), img.width(), img.height(), image::ColorType::Rgba8)
        .map_err(|e| haven_core::Error::internal(format!("webp encode failed: {e}")))?;
    Ok(())
}

/// Output-tile filename for `(x, y)` at a given zoom, per the `{x}_{y}.webp`
/// convention.
pub fn tile_filename(x: i64, y: i64) -> String {
    format!("{x}_{y}.webp")
}

/// The 12-byte RIFF/WEBP container header every generated file begins with.
pub const WEBP_HEADER_RIFF: &[u8; 4] = b"RIFF";
/// See [`WEBP_HEADER_RIFF`].
pub const WEBP_HEADER_WEBP: &[u8; 4] = b"WEBP";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{insert_ranked, UnifiedCell};
    use std::sync::Arc;

    fn red_image() -> RgbaImage {
        RgbaImage::from_pixel(CELL_SIZE, CELL_SIZE, Rgba([255, 0, 0, 255]))
    }

    fn green_image() -> RgbaImage {
        RgbaImage::from_pixel(CELL_SIZE, CELL_SIZE, Rgba([0, 255, 0, 255]))
    }

    #[test]
    fn test_compose_two_cells() {
        let mut unified = UnifiedMap::new();
        insert_ranked(
            &mut unified,
            TileCoord::new(0, 0),
            UnifiedCell {
                image: CellImage::Rendered(Arc::new(red_image())),
                rank: 1,
            },
        );
        insert_ranked(
            &mut unified,
            TileCoord::new(1, 0),
            UnifiedCell {
                image: CellImage::Rendered(Arc::new(green_image())),
                rank: 1,
            },
        );

        let tile = compose_tile(&unified, BlockCoord::new(0, 0)).unwrap();
        assert_eq!(tile.width(), TILE_SIZE);
        assert_eq!(*tile.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*tile.get_pixel(100, 0), Rgba([0, 255, 0, 255]));
        assert_eq!(*tile.get_pixel(200, 0), Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_compose_empty_returns_none() {
        let unified = UnifiedMap::new();
        assert!(compose_tile(&unified, BlockCoord::new(5, 5)).is_none());
    }

    #[test]
    fn test_save_tile_writes_webp_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("0_0.webp");
        let img = red_image();
        save_tile(&img, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[0..4], WEBP_HEADER_RIFF);
        assert_eq!(&bytes[8..12], WEBP_HEADER_WEBP);
    }

    #[test]
    fn test_tile_filename() {
        assert_eq!(tile_filename(-3, 4), "-3_4.webp");
    }
}
