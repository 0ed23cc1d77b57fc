//! Cache key identifying one per-tenant large tile.

use haven_core::{MapId, TenantId};

/// Identifies one `(tenant, map, zoom, x, y)` large tile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Owning tenant map.
    pub map_id: MapId,
    /// Zoom level, `0..=6`.
    pub zoom: u32,
    /// Output-tile X coordinate at this zoom level.
    pub x: i64,
    /// Output-tile Y coordinate at this zoom level.
    pub y: i64,
}

impl CacheKey {
    /// Build a new key.
    pub fn new(tenant_id: TenantId, map_id: MapId, zoom: u32, x: i64, y: i64) -> Self {
        Self {
            tenant_id,
            map_id,
            zoom,
            x,
            y,
        }
    }

    /// Relative disk path: `tenants/{tenant}/large/{map}/{zoom}/{x}_{y}.webp`.
    pub fn relative_path(&self) -> std::path::PathBuf {
        std::path::PathBuf::from("tenants")
            .join(self.tenant_id.as_str())
            .join("large")
            .join(self.map_id.as_str())
            .join(self.zoom.to_string())
            .join(format!("{}_{}.webp", self.x, self.y))
    }

    /// The zoom-0 key covering `(base_x, base_y)` and its `levels` ancestors,
    /// nearest zoom first (i.e. zoom 0, then 1, 2, ... up to `levels`).
    pub fn dirty_chain(tenant_id: &TenantId, map_id: &MapId, base_x: i64, base_y: i64, levels: u32) -> Vec<CacheKey> {
        let mut out = Vec::with_capacity(levels as usize + 1);
        let mut x = haven_core::coord::fdiv(base_x, 4);
        let mut y = haven_core::coord::fdiv(base_y, 4);
        out.push(CacheKey::new(tenant_id.clone(), map_id.clone(), 0, x, y));
        for zoom in 1..=levels {
            x = haven_core::coord::fdiv(x, 2);
            y = haven_core::coord::fdiv(y, 2);
            out.push(CacheKey::new(tenant_id.clone(), map_id.clone(), zoom, x, y));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let key = CacheKey::new("t1".into(), "m1".into(), 3, -2, 5);
        assert_eq!(
            key.relative_path(),
            std::path::PathBuf::from("tenants/t1/large/m1/3/-2_5.webp")
        );
    }

    #[test]
    fn test_dirty_chain_length_and_zero() {
        let chain = CacheKey::dirty_chain(&"t".into(), &"m".into(), 21, 21, 6);
        assert_eq!(chain.len(), 7);
        assert_eq!(chain[0].zoom, 0);
        assert_eq!(chain[6].zoom, 6);
        assert_eq!(chain[6].x, 0);
        assert_eq!(chain[6].y, 0);
    }
}
