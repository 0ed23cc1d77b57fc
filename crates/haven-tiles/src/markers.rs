//! Marker extraction (C8): collects public "thingwall" markers across
//! sources, applies alignment offsets, deduplicates, and serialises.

use haven_catalog::Marker;
use haven_hmap::HmapMarker;
use serde::Serialize;
use std::collections::HashMap;

/// One marker as written to `markers.json`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutputMarker {
    /// Stable identifier, synthesised from absolute position.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Absolute unified X coordinate in pixels.
    pub x: i64,
    /// Absolute unified Y coordinate in pixels.
    pub y: i64,
    /// Icon resource name.
    pub image: String,
}

/// Collector that deduplicates by absolute `(x, y)`, first occurrence wins.
#[derive(Default)]
pub struct MarkerCollector {
    by_position: HashMap<(i64, i64), OutputMarker>,
    order: Vec<(i64, i64)>,
}

impl MarkerCollector {
    /// Build an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tenant-path marker: `grid_coord` is the owning grid's own-space
    /// coordinate, `offset` is the source's alignment offset, and
    /// `position` is the marker's intra-grid pixel offset.
    pub fn add_tenant_marker(&mut self, marker: &Marker, grid_coord: (i64, i64), offset: (i64, i64)) {
        let abs_x = (grid_coord.0 + offset.0) * 100 + marker.position_x;
        let abs_y = (grid_coord.1 + offset.1) * 100 + marker.position_y;
        self.insert(abs_x, abs_y, marker.name.clone(), marker.image.clone());
    }

    /// Add an HMap-path marker. `tile_x`/`tile_y` are already absolute
    /// world-tile coordinates (`gridX * 100 + posX`), so only the source
    /// offset (expressed in the same pixel units) needs to be applied.
    pub fn add_hmap_marker(&mut self, marker: &HmapMarker, offset_pixels: (i64, i64)) {
        if !marker.is_thingwall() {
            return;
        }
        let abs_x = marker.tile_x as i64 + offset_pixels.0;
        let abs_y = marker.tile_y as i64 + offset_pixels.1;
        self.insert(abs_x, abs_y, marker.name.clone(), marker.resource_name.clone());
    }

    fn insert(&mut self, x: i64, y: i64, name: String, image: String) {
        let key = (x, y);
        if self.by_position.contains_key(&key) {
            return;
        }
        self.by_position.insert(
            key,
            OutputMarker {
                id: format!("{x}_{y}"),
                name,
                x,
                y,
                image,
            },
        );
        self.order.push(key);
    }

    /// Finalise the collected markers, in first-seen order.
    pub fn into_markers(self) -> Vec<OutputMarker> {
        self.order
            .into_iter()
            .map(|k| self.by_position[&k].clone())
            .collect()
    }
}

/// Serialise markers to the `markers.json` format (camelCase UTF-8 JSON array).
pub fn to_json(markers: &[OutputMarker]) -> haven_core::Result<String> {
    serde_json::to_string(markers).map_err(Into::into)
}
