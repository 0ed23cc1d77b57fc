//! Integer tile coordinate math for the unified public-map coordinate space.
//!
//! Coordinates here are signed: a unified map can extend in any direction
//! once per-source alignment offsets are applied, so ordinary truncating
//! integer division (which rounds toward zero) would give the wrong parent
//! for negative coordinates. Everything here is built on [`fdiv`].

use serde::{Deserialize, Serialize};

/// Floor division: `⌊a / b⌋`, correct for negative `a`. `b` must be positive.
///
/// ```
/// use haven_core::coord::fdiv;
/// assert_eq!(fdiv(-1, 2), -1);
/// assert_eq!(fdiv(-4, 4), -1);
/// assert_eq!(fdiv(-5, 4), -2);
/// assert_eq!(fdiv(5, 4), 1);
/// ```
pub fn fdiv(a: i64, b: i64) -> i64 {
    debug_assert!(b > 0, "fdiv divisor must be positive");
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

/// A zoom-0 tile coordinate in the unified map space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    /// X coordinate in zoom-0 tile units.
    pub x: i64,
    /// Y coordinate in zoom-0 tile units.
    pub y: i64,
}

impl TileCoord {
    /// Build a new coordinate.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The 2x2 parent coordinate one zoom level up.
    pub fn parent(&self) -> TileCoord {
        TileCoord::new(fdiv(self.x, 2), fdiv(self.y, 2))
    }

    /// The 4x4 output-tile block this zoom-0 coordinate belongs to.
    pub fn block(&self) -> BlockCoord {
        BlockCoord::new(fdiv(self.x, 4), fdiv(self.y, 4))
    }

    /// Offset this coordinate by `(dx, dy)`.
    pub fn offset(&self, dx: i64, dy: i64) -> TileCoord {
        TileCoord::new(self.x + dx, self.y + dy)
    }
}

/// A 400x400 output-tile coordinate (a 4x4 block of zoom-0 source tiles, or
/// the analogous 2x downsample block at higher zoom levels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockCoord {
    /// X coordinate in output-tile units at this zoom level.
    pub x: i64,
    /// Y coordinate in output-tile units at this zoom level.
    pub y: i64,
}

impl BlockCoord {
    /// Build a new block coordinate.
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// The parent block one zoom level up (2x2 downsample).
    pub fn parent(&self) -> BlockCoord {
        BlockCoord::new(fdiv(self.x, 2), fdiv(self.y, 2))
    }

    /// The four child blocks one zoom level down, in `(dqx, dqy)` raster order.
    pub fn children(&self) -> [BlockCoord; 4] {
        [
            BlockCoord::new(2 * self.x, 2 * self.y),
            BlockCoord::new(2 * self.x + 1, 2 * self.y),
            BlockCoord::new(2 * self.x, 2 * self.y + 1),
            BlockCoord::new(2 * self.x + 1, 2 * self.y + 1),
        ]
    }

    /// Walk `levels` parents up from this block, e.g. to find the zoom-0
    /// ancestor chain affected by a dirty zoom-0 base tile.
    pub fn ancestors(&self, levels: u32) -> Vec<BlockCoord> {
        let mut out = Vec::with_capacity(levels as usize);
        let mut cur = *self;
        for _ in 0..levels {
            cur = cur.parent();
            out.push(cur);
        }
        out
    }
}

/// Inclusive zoom-0 bounds of a composed map, in unified coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum X (inclusive).
    pub min_x: i64,
    /// Maximum X (inclusive).
    pub max_x: i64,
    /// Minimum Y (inclusive).
    pub min_y: i64,
    /// Maximum Y (inclusive).
    pub max_y: i64,
}

impl Bounds {
    /// Compute bounds from an iterator of tile coordinates. Returns `None` for
    /// an empty iterator.
    pub fn from_coords(coords: impl IntoIterator<Item = TileCoord>) -> Option<Bounds> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut b = Bounds {
            min_x: first.x,
            max_x: first.x,
            min_y: first.y,
            max_y: first.y,
        };
        for c in iter {
            b.min_x = b.min_x.min(c.x);
            b.max_x = b.max_x.max(c.x);
            b.min_y = b.min_y.min(c.y);
            b.max_y = b.max_y.max(c.y);
        }
        Some(b)
    }

    /// The output-tile block bounds covering these zoom-0 bounds.
    pub fn block_bounds(&self) -> (BlockCoord, BlockCoord) {
        (
            BlockCoord::new(fdiv(self.min_x, 4), fdiv(self.min_y, 4)),
            BlockCoord::new(fdiv(self.max_x, 4), fdiv(self.max_y, 4)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fdiv_negative() {
        assert_eq!(fdiv(-1, 2), -1);
        assert_eq!(fdiv(-4, 4), -1);
        assert_eq!(fdiv(-5, 4), -2);
        assert_eq!(fdiv(-8, 4), -2);
    }

    #[test]
    fn test_fdiv_positive() {
        assert_eq!(fdiv(0, 4), 0);
        assert_eq!(fdiv(3, 4), 0);
        assert_eq!(fdiv(4, 4), 1);
        assert_eq!(fdiv(5, 4), 1);
    }

    #[test]
    fn test_parent_and_block() {
        let t = TileCoord::new(5, 5);
        assert_eq!(t.parent(), TileCoord::new(2, 2));
        assert_eq!(t.block(), BlockCoord::new(1, 1));
    }

    #[test]
    fn test_block_children_roundtrip() {
        let b = BlockCoord::new(-3, 2);
        let children = b.children();
        for c in children {
            assert_eq!(c.parent(), b);
        }
    }

    #[test]
    fn test_pyramid_sparsity_scenario() {
        // one written zoom-0 tile at (5,5): its ancestor chain through zoom 6.
        let base = TileCoord::new(5, 5).block(); // zoom-1 block coordinate space starts here
        let ancestors = base.ancestors(5);
        let expected = [
            BlockCoord::new(0, 0),
            BlockCoord::new(0, 0),
            BlockCoord::new(0, 0),
            BlockCoord::new(0, 0),
            BlockCoord::new(0, 0),
        ];
        assert_eq!(ancestors, expected);
    }

    #[test]
    fn test_bounds_from_coords() {
        let coords = vec![TileCoord::new(-2, 3), TileCoord::new(4, -1)];
        let b = Bounds::from_coords(coords).unwrap();
        assert_eq!(b.min_x, -2);
        assert_eq!(b.max_x, 4);
        assert_eq!(b.min_y, -1);
        assert_eq!(b.max_y, 3);
    }

    #[test]
    fn test_bounds_empty() {
        assert!(Bounds::from_coords(std::iter::empty()).is_none());
    }
}
