//! A texture source that resolves nothing, used where no real asset
//! backend is wired up (tests, HMap sources with no tileset references).

use async_trait::async_trait;
use haven_render::ResourceSource;

/// Always reports resources absent. Grid rendering falls back to its
/// flat-grey placeholder for every cell.
pub struct NullResourceSource;

#[async_trait]
impl ResourceSource for NullResourceSource {
    async fn fetch(&self, _name: &str) -> Result<Option<Vec<u8>>, String> {
        Ok(None)
    }
}
