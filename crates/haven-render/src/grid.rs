//! Rasterises one decoded HMap grid into a 100x100 RGBA image.

use crate::error::RenderError;
use haven_hmap::{HmapGrid, GRID_CELLS, GRID_SIZE};
use image::{Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::Arc;

/// RGB a pixel is darkened toward when a cliff edge is detected.
const CLIFF_SHADE_FACTOR: f32 = 0.6;

/// Height delta beyond which two adjacent cells are considered a cliff edge.
const CLIFF_THRESHOLD: f32 = 11.0;

/// Neutral fill used when a grid cell's texture could not be resolved.
const MISSING_TEXTURE_COLOR: Rgba<u8> = Rgba([128, 128, 128, 255]);

/// Render one grid into a 100x100 RGBA image using the resolved texture table.
///
/// Textures are keyed by tileset index position within `grid.tilesets`
/// (not by name) since two grids may order the same names differently.
pub fn render_grid(
    grid: &HmapGrid,
    textures: &HashMap<String, Arc<RgbaImage>>,
) -> Result<RgbaImage, RenderError> {
    if grid.tile_indices.len() != GRID_CELLS || grid.z_map.len() != GRID_CELLS {
        return Err(RenderError::MalformedGrid {
            expected: GRID_CELLS,
            actual: grid.tile_indices.len().max(grid.z_map.len()),
        });
    }

    let mut img = base_sample(grid, textures);
    apply_cliff_shading(&mut img, grid);
    apply_priority_borders(&mut img, grid);
    Ok(img)
}

fn idx(x: usize, y: usize) -> usize {
    y * GRID_SIZE + x
}

fn tileset_texture<'a>(
    grid: &HmapGrid,
    textures: &'a HashMap<String, Arc<RgbaImage>>,
    tileset_index: u8,
) -> Option<&'a Arc<RgbaImage>> {
    grid.tilesets
        .get(tileset_index as usize)
        .and_then(|ts| textures.get(&ts.resource_name))
}

fn base_sample(grid: &HmapGrid, textures: &HashMap<String, Arc<RgbaImage>>) -> RgbaImage {
    let mut img = RgbaImage::new(GRID_SIZE as u32, GRID_SIZE as u32);
    for y in 0..GRID_SIZE {
        for x in 0..GRID_SIZE {
            let ts = grid.tile_indices[idx(x, y)];
            let pixel = match tileset_texture(grid, textures, ts) {
                Some(tex) => sample_tiled(tex, x as i64, y as i64),
                None => MISSING_TEXTURE_COLOR,
            };
            img.put_pixel(x as u32, y as u32, pixel);
        }
    }
    img
}

/// Sample a texture with wraparound tiling, using positive (Euclidean) modulus.
fn sample_tiled(tex: &RgbaImage, x: i64, y: i64) -> Rgba<u8> {
    let w = tex.width() as i64;
    let h = tex.height() as i64;
    let tx = x.rem_euclid(w) as u32;
    let ty = y.rem_euclid(h) as u32;
    *tex.get_pixel(tx, ty)
}

fn neighbours(x: usize, y: usize) -> [(usize, usize); 4] {
    [
        (x.wrapping_sub(1), y),
        (x + 1, y),
        (x, y.wrapping_sub(1)),
        (x, y + 1),
    ]
}

fn apply_cliff_shading(img: &mut RgbaImage, grid: &HmapGrid) {
    for y in 1..GRID_SIZE - 1 {
        for x in 1..GRID_SIZE - 1 {
            let z = grid.z_map[idx(x, y)];
            let broken = neighbours(x, y).iter().any(|&(nx, ny)| {
                if nx >= GRID_SIZE || ny >= GRID_SIZE {
                    return false;
                }
                (z - grid.z_map[idx(nx, ny)]).abs() > CLIFF_THRESHOLD
            });
            if broken {
                let p = img.get_pixel(x as u32, y as u32);
                let Rgba([r, g, b, a]) = *p;
                let shade = |c: u8| (c as f32 * (1.0 - CLIFF_SHADE_FACTOR)) as u8;
                img.put_pixel(x as u32, y as u32, Rgba([shade(r), shade(g), shade(b), a]));
            }
        }
    }
}

fn apply_priority_borders(img: &mut RgbaImage, grid: &HmapGrid) {
    for y in 0..GRID_SIZE {
        for x in 0..GRID_SIZE {
            let ts = grid.tile_indices[idx(x, y)];
            let overridden = neighbours(x, y).iter().any(|&(nx, ny)| {
                if nx >= GRID_SIZE || ny >= GRID_SIZE {
                    return false;
                }
                grid.tile_indices[idx(nx, ny)] > ts
            });
            if overridden {
                img.put_pixel(x as u32, y as u32, Rgba([0, 0, 0, 255]));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use haven_hmap::Tileset;

    fn uniform_grid(tile_index: u8, z: f32) -> HmapGrid {
        HmapGrid {
            segment_id: 0,
            tile_x: 0,
            tile_y: 0,
            tile_indices: vec![tile_index; GRID_CELLS],
            z_map: vec![z; GRID_CELLS],
            tilesets: vec![Tileset {
                resource_name: "tex".into(),
            }],
        }
    }

    fn checkerboard_texture() -> Arc<RgbaImage> {
        let mut img = RgbaImage::new(16, 16);
        for y in 0..16 {
            for x in 0..16 {
                let c = if (x + y) % 2 == 0 { 255 } else { 0 };
                img.put_pixel(x, y, Rgba([c, c, c, 255]));
            }
        }
        Arc::new(img)
    }

    #[test]
    fn test_base_sample_uniform_no_cliff_no_border() {
        let grid = uniform_grid(0, 0.0);
        let mut textures = HashMap::new();
        textures.insert("tex".to_string(), checkerboard_texture());

        let img = render_grid(&grid, &textures).unwrap();
        assert_eq!(img.width(), 100);
        assert_eq!(img.height(), 100);

        for y in 0..GRID_SIZE {
            for x in 0..GRID_SIZE {
                let p = img.get_pixel(x as u32, y as u32);
                assert_ne!(*p, Rgba([0, 0, 0, 255]), "no border pixel expected");
            }
        }
    }

    #[test]
    fn test_missing_texture_fills_grey() {
        let grid = uniform_grid(0, 0.0);
        let textures = HashMap::new();
        let img = render_grid(&grid, &textures).unwrap();
        assert_eq!(*img.get_pixel(50, 50), MISSING_TEXTURE_COLOR);
    }

    #[test]
    fn test_cliff_shading_darkens() {
        let mut grid = uniform_grid(0, 0.0);
        // Create a sharp height step down the middle column.
        for y in 0..GRID_SIZE {
            grid.z_map[idx(50, y)] = 100.0;
        }
        let mut textures = HashMap::new();
        let flat = Arc::new(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])));
        textures.insert("tex".to_string(), flat);

        let img = render_grid(&grid, &textures).unwrap();
        let shaded = img.get_pixel(50, 50);
        assert!(shaded.0[0] < 200);
    }

    #[test]
    fn test_priority_border_marks_lower_neighbour() {
        let mut grid = uniform_grid(0, 0.0);
        grid.tile_indices[idx(50, 50)] = 5;
        let mut textures = HashMap::new();
        textures.insert("tex".to_string(), Arc::new(RgbaImage::from_pixel(4, 4, Rgba([1, 1, 1, 255]))));

        let img = render_grid(&grid, &textures).unwrap();
        assert_eq!(*img.get_pixel(49, 50), Rgba([0, 0, 0, 255]));
        assert_eq!(*img.get_pixel(50, 50), Rgba([1, 1, 1, 255]));
    }

    #[test]
    fn test_malformed_grid_rejected() {
        let mut grid = uniform_grid(0, 0.0);
        grid.z_map.pop();
        assert!(render_grid(&grid, &HashMap::new()).is_err());
    }
}
