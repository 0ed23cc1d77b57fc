//! # Haven Catalog
//!
//! The public-map data model, the [`Catalog`] trait abstracting the
//! platform's multi-tenant persistence layer, an in-memory reference
//! implementation, and [`CatalogService`] (component C11): slug
//! generation, CRUD, and source contribution analysis.

pub mod catalog_trait;
pub mod memory;
pub mod models;
pub mod service;
pub mod slug;

pub use catalog_trait::Catalog;
pub use memory::InMemoryCatalog;
pub use models::{
    GenerationStatus, HmapSource, Marker, PublicMap, PublicMapHmapSource, PublicMapTenantSource,
    SourceGrid, SourceTile,
};
pub use service::{AvailableTenantMap, CatalogService, ContributionAnalysis, MapBounds, SourceContribution};
pub use slug::slugify;
