//! The public-map data model (section 3 of the engine's domain model).

use chrono::{DateTime, Utc};
use haven_core::{HmapSourceId, MapId, PublicMapId, TenantId};
use serde::{Deserialize, Serialize};

/// Status of a public map's most recent (or in-flight) generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStatus {
    /// No run has ever completed.
    Pending,
    /// A run is currently in progress.
    Running,
    /// The most recent run finished successfully.
    Completed,
    /// The most recent run failed.
    Failed,
}

/// A published public map: the top-level catalog entity the orchestrator
/// generates tiles for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMap {
    /// URL-safe slug, also the primary key.
    pub id: PublicMapId,
    /// Human-readable display name.
    pub name: String,
    /// Whether the map is eligible for listing and auto-regeneration.
    pub is_active: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Identifier of the account that created the map.
    pub created_by: String,
    /// Whether the orchestrator should regenerate this map on a timer.
    pub auto_regenerate: bool,
    /// Regeneration interval in minutes, when `auto_regenerate` is set.
    pub regenerate_interval_minutes: Option<i64>,
    /// Status of the most recent or in-progress run.
    pub generation_status: GenerationStatus,
    /// Progress percentage of the current (or most recent) run, 0..=100.
    pub generation_progress: i32,
    /// Number of tiles produced by the most recent completed run.
    pub tile_count: i64,
    /// When the most recent successful run completed.
    pub last_generated_at: Option<DateTime<Utc>>,
    /// Duration of the most recent successful run.
    pub last_generation_duration_seconds: Option<i64>,
    /// Error message from the most recent failed run.
    pub generation_error: Option<String>,
    /// Zoom-0 bounds of the most recently generated output.
    pub min_x: Option<i64>,
    /// See [`PublicMap::min_x`].
    pub max_x: Option<i64>,
    /// See [`PublicMap::min_x`].
    pub min_y: Option<i64>,
    /// See [`PublicMap::min_x`].
    pub max_y: Option<i64>,
}

impl PublicMap {
    /// Construct a freshly created, never-generated public map.
    pub fn new(id: PublicMapId, name: String, created_by: String, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name,
            is_active: true,
            created_at: now,
            created_by,
            auto_regenerate: false,
            regenerate_interval_minutes: None,
            generation_status: GenerationStatus::Pending,
            generation_progress: 0,
            tile_count: 0,
            last_generated_at: None,
            last_generation_duration_seconds: None,
            generation_error: None,
            min_x: None,
            max_x: None,
            min_y: None,
            max_y: None,
        }
    }

    /// Whether this map is due for auto-regeneration at `now`.
    pub fn is_due_for_regeneration(&self, now: DateTime<Utc>) -> bool {
        if !self.is_active || !self.auto_regenerate || self.generation_status == GenerationStatus::Running {
            return false;
        }
        let Some(interval) = self.regenerate_interval_minutes else {
            return false;
        };
        match self.last_generated_at {
            None => true,
            Some(last) => now - last >= chrono::Duration::minutes(interval),
        }
    }
}

/// A tenant-owned private map contributing to a public map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMapTenantSource {
    /// Owning public map.
    pub public_map_id: PublicMapId,
    /// Contributing tenant.
    pub tenant_id: TenantId,
    /// Contributing tenant map.
    pub map_id: MapId,
    /// Ordering priority; higher wins when sources overlap.
    pub priority: i32,
    /// When this source was linked.
    pub added_at: DateTime<Utc>,
    /// Who linked this source.
    pub added_by: String,
}

/// An uploaded HMap file contributing to a public map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicMapHmapSource {
    /// Owning public map.
    pub public_map_id: PublicMapId,
    /// Contributing HMap source.
    pub hmap_source_id: HmapSourceId,
    /// Ordering priority; higher wins when sources overlap.
    pub priority: i32,
    /// When this source was linked.
    pub added_at: DateTime<Utc>,
    /// Cached count of grids first claimed by this source, from the most
    /// recent contribution analysis.
    pub new_grids: Option<i64>,
    /// Cached count of grids already claimed by a higher-priority source.
    pub overlapping_grids: Option<i64>,
}

/// An uploaded HMap world-snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HmapSource {
    /// Primary key.
    pub id: HmapSourceId,
    /// Human-readable name.
    pub name: String,
    /// Original uploaded filename.
    pub file_name: String,
    /// Path relative to the grid storage root.
    pub file_path: String,
    /// Size in bytes.
    pub file_size_bytes: i64,
    /// Total grid count, populated on analysis.
    pub total_grids: Option<i64>,
    /// Segment count, populated on analysis.
    pub segment_count: Option<i64>,
    /// When the file was last analysed.
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// A zoom-0 base tile owned by a tenant map, as read from the opaque
/// persistence layer.
#[derive(Debug, Clone)]
pub struct SourceTile {
    /// X coordinate in the tenant map's own (unaligned) space.
    pub coord_x: i64,
    /// Y coordinate in the tenant map's own (unaligned) space.
    pub coord_y: i64,
    /// Monotonic cache timestamp used to break ties on overlap.
    pub cache_timestamp: i64,
    /// Path to the tile's PNG bytes, relative to `grid_storage`.
    pub file: String,
}

/// A grid owned by a tenant map, carrying the stable cross-tenant grid id
/// used for source alignment.
#[derive(Debug, Clone)]
pub struct SourceGrid {
    /// Stable identifier shared across tenants that mapped the same grid.
    pub grid_id: String,
    /// X coordinate in the tenant map's own (unaligned) space.
    pub coord_x: i64,
    /// Y coordinate in the tenant map's own (unaligned) space.
    pub coord_y: i64,
}

/// A marker recorded against a tenant's grid.
#[derive(Debug, Clone)]
pub struct Marker {
    /// Grid this marker sits on.
    pub grid_id: String,
    /// X position within the grid, `0..100`.
    pub position_x: i64,
    /// Y position within the grid, `0..100`.
    pub position_y: i64,
    /// Icon resource name; markers with `"thingwall"` in this field are public.
    pub image: String,
    /// Display name.
    pub name: String,
    /// Hidden markers are never surfaced publicly.
    pub hidden: bool,
}
