//! Abstraction over the multi-tenant persistence layer.
//!
//! The engine treats the rest of the platform's database as opaque; this
//! trait enumerates exactly the reads and writes the core issues, matching
//! the query list the engine is scoped to (no ad-hoc querying beyond this
//! surface). A real deployment backs this with the platform's own
//! database; this crate ships only [`crate::memory::InMemoryCatalog`] for
//! tests and local development.

use crate::models::{
    HmapSource, Marker, PublicMap, PublicMapHmapSource, PublicMapTenantSource, SourceGrid,
    SourceTile,
};
use async_trait::async_trait;
use haven_core::{HmapSourceId, MapId, PublicMapId, Result, TenantId};

/// The set of catalog operations the public-map engine depends on.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Fetch one public map by id.
    async fn get_public_map(&self, id: &PublicMapId) -> Result<Option<PublicMap>>;

    /// List every public map.
    async fn list_public_maps(&self) -> Result<Vec<PublicMap>>;

    /// Insert a brand-new public map row.
    async fn insert_public_map(&self, map: PublicMap) -> Result<()>;

    /// Overwrite an existing public map row (status, progress, bounds, ...).
    async fn update_public_map(&self, map: PublicMap) -> Result<()>;

    /// Delete a public map row. Does not touch its tile directory; that is
    /// the caller's responsibility.
    async fn delete_public_map(&self, id: &PublicMapId) -> Result<()>;

    /// List a public map's tenant sources, in priority order.
    async fn list_tenant_sources(&self, id: &PublicMapId) -> Result<Vec<PublicMapTenantSource>>;

    /// Link a tenant map as a source of a public map.
    async fn add_tenant_source(&self, source: PublicMapTenantSource) -> Result<()>;

    /// Unlink a tenant map from a public map.
    async fn remove_tenant_source(&self, id: &PublicMapId, tenant: &TenantId, map: &MapId) -> Result<()>;

    /// List a public map's HMap sources, in priority order.
    async fn list_hmap_sources(&self, id: &PublicMapId) -> Result<Vec<PublicMapHmapSource>>;

    /// Link an HMap source to a public map.
    async fn add_hmap_source(&self, source: PublicMapHmapSource) -> Result<()>;

    /// Unlink an HMap source from a public map.
    async fn remove_hmap_source(&self, id: &PublicMapId, hmap: &HmapSourceId) -> Result<()>;

    /// Persist the cached contribution counters for one HMap source link.
    async fn update_hmap_source_contribution(
        &self,
        id: &PublicMapId,
        hmap: &HmapSourceId,
        new_grids: i64,
        overlapping_grids: i64,
    ) -> Result<()>;

    /// Fetch one HMap source's metadata.
    async fn get_hmap_source(&self, id: &HmapSourceId) -> Result<Option<HmapSource>>;

    /// Insert a newly uploaded HMap source.
    async fn insert_hmap_source(&self, source: HmapSource) -> Result<()>;

    /// Delete an HMap source. Callers must first verify it is unreferenced.
    async fn delete_hmap_source(&self, id: &HmapSourceId) -> Result<()>;

    /// `tiles WHERE tenantId=? AND mapId=? AND zoom=0`.
    async fn source_tiles(&self, tenant: &TenantId, map: &MapId) -> Result<Vec<SourceTile>>;

    /// `grids WHERE tenantId=? AND map=?`.
    async fn source_grids(&self, tenant: &TenantId, map: &MapId) -> Result<Vec<SourceGrid>>;

    /// `markers WHERE tenantId=? AND image LIKE '%thingwall%' AND hidden=false`.
    async fn thingwall_markers(&self, tenant: &TenantId) -> Result<Vec<Marker>>;

    /// All known tenant ids (used by the pre-generator and availability listing).
    async fn list_tenants(&self) -> Result<Vec<TenantId>>;

    /// All map ids owned by a tenant.
    async fn list_tenant_maps(&self, tenant: &TenantId) -> Result<Vec<MapId>>;

    /// Count of zoom-0 tiles owned by a tenant map.
    async fn tile_count(&self, tenant: &TenantId, map: &MapId) -> Result<i64>;
}
