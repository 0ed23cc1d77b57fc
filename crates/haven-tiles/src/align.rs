//! Source alignment (C5): computes per-tenant-source `(dx, dy)` offsets by
//! detecting grid ids shared with the alignment base.

use haven_catalog::SourceGrid;
use haven_core::{MapId, TenantId};
use std::collections::HashMap;

/// One tenant source after alignment.
#[derive(Debug, Clone)]
pub struct AlignedSource {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Tenant map.
    pub map_id: MapId,
    /// Offset to add to this source's own-space coordinates to place them
    /// in the unified coordinate space.
    pub offset: (i64, i64),
}

/// One tenant source's raw grids, as loaded from the catalog.
pub struct TenantSourceGrids {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Tenant map.
    pub map_id: MapId,
    /// This source's grids, in its own (unaligned) coordinate space.
    pub grids: Vec<SourceGrid>,
}

/// Align a list of tenant sources, ordered by decreasing priority then
/// increasing `addedAt` (the caller is responsible for that ordering). The
/// first source is the alignment base, placed at offset `(0, 0)`.
pub fn align_tenant_sources(sources: &[TenantSourceGrids]) -> Vec<AlignedSource> {
    let mut result = Vec::with_capacity(sources.len());

    let Some(base) = sources.first() else {
        return result;
    };
    let base_index: HashMap<&str, (i64, i64)> = base
        .grids
        .iter()
        .map(|g| (g.grid_id.as_str(), (g.coord_x, g.coord_y)))
        .collect();

    result.push(AlignedSource {
        tenant_id: base.tenant_id.clone(),
        map_id: base.map_id.clone(),
        offset: (0, 0),
    });

    for source in &sources[1..] {
        let offset = shared_offset(&base_index, source);
        result.push(AlignedSource {
            tenant_id: source.tenant_id.clone(),
            map_id: source.map_id.clone(),
            offset,
        });
    }

    result
}

fn shared_offset(base_index: &HashMap<&str, (i64, i64)>, source: &TenantSourceGrids) -> (i64, i64) {
    let mut shared_ids: Vec<&str> = source
        .grids
        .iter()
        .map(|g| g.grid_id.as_str())
        .filter(|id| base_index.contains_key(id))
        .collect();
    shared_ids.sort_unstable();

    let Some(&chosen_id) = shared_ids.first() else {
        tracing::warn!(
            tenant = %source.tenant_id,
            map = %source.map_id,
            "no shared grid with alignment base; offset defaults to (0, 0)"
        );
        return (0, 0);
    };

    let (base_x, base_y) = base_index[chosen_id];
    let source_xy = source
        .grids
        .iter()
        .find(|g| g.grid_id == chosen_id)
        .map(|g| (g.coord_x, g.coord_y))
        .expect("chosen_id came from source.grids");

    (base_x - source_xy.0, base_y - source_xy.1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(id: &str, x: i64, y: i64) -> SourceGrid {
        SourceGrid {
            grid_id: id.to_string(),
            coord_x: x,
            coord_y: y,
        }
    }

    #[test]
    fn test_base_is_offset_zero() {
        let sources = vec![TenantSourceGrids {
            tenant_id: "t1".into(),
            map_id: "m1".into(),
            grids: vec![grid("g1", 5, 5)],
        }];
        let aligned = align_tenant_sources(&sources);
        assert_eq!(aligned[0].offset, (0, 0));
    }

    #[test]
    fn test_shared_grid_offset() {
        let sources = vec![
            TenantSourceGrids {
                tenant_id: "base".into(),
                map_id: "m".into(),
                grids: vec![grid("shared", -2, -2), grid("only-base", 0, 0)],
            },
            TenantSourceGrids {
                tenant_id: "other".into(),
                map_id: "m".into(),
                grids: vec![grid("shared", 0, 0), grid("only-other", 9, 9)],
            },
        ];
        let aligned = align_tenant_sources(&sources);
        assert_eq!(aligned[1].offset, (-2, -2));
    }

    #[test]
    fn test_lexicographic_tiebreak() {
        let sources = vec![
            TenantSourceGrids {
                tenant_id: "base".into(),
                map_id: "m".into(),
                grids: vec![grid("aaa", 10, 10), grid("zzz", 20, 20)],
            },
            TenantSourceGrids {
                tenant_id: "other".into(),
                map_id: "m".into(),
                grids: vec![grid("zzz", 0, 0), grid("aaa", 1, 1)],
            },
        ];
        let aligned = align_tenant_sources(&sources);
        // "aaa" sorts first, so offset = base(10,10) - other(1,1)
        assert_eq!(aligned[1].offset, (9, 9));
    }

    #[test]
    fn test_no_shared_grid_defaults_zero() {
        let sources = vec![
            TenantSourceGrids {
                tenant_id: "base".into(),
                map_id: "m".into(),
                grids: vec![grid("a", 1, 1)],
            },
            TenantSourceGrids {
                tenant_id: "other".into(),
                map_id: "m".into(),
                grids: vec![grid("b", 2, 2)],
            },
        ];
        let aligned = align_tenant_sources(&sources);
        assert_eq!(aligned[1].offset, (0, 0));
    }
}
