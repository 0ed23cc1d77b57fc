//! Resolves external texture-resource names to cached 100x100 RGBA images,
//! with bulk prefetch and per-key request coalescing.

use crate::error::RenderError;
use async_trait::async_trait;
use dashmap::DashMap;
use image::RgbaImage;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Notify;

/// An external collaborator that fetches raw texture bytes for a resource
/// name (e.g. an upstream asset CDN). HTTP wiring itself is outside this
/// crate's scope; callers supply their own implementation.
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Fetch raw image bytes for `name`, or `None` if the resource does not exist.
    async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, String>;
}

enum Slot {
    Pending(Arc<Notify>),
    Ready(Option<Arc<RgbaImage>>),
}

/// Disk-backed, coalescing cache of resolved 100x100 textures.
pub struct TileResourceFetcher {
    source: Arc<dyn ResourceSource>,
    disk_cache_dir: PathBuf,
    slots: DashMap<String, Slot>,
}

impl TileResourceFetcher {
    /// Build a fetcher backed by `source`, caching resolved bytes under `disk_cache_dir`.
    pub fn new(source: Arc<dyn ResourceSource>, disk_cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            source,
            disk_cache_dir: disk_cache_dir.into(),
            slots: DashMap::new(),
        }
    }

    /// Resolve a single resource, coalescing concurrent callers requesting
    /// the same `name`.
    pub async fn get(&self, name: &str) -> Option<Arc<RgbaImage>> {
        loop {
            // Hold the shard guard until the `Notified` future is created so a
            // concurrent `insert(Ready)` + `notify_waiters()` on the resolving
            // side can't land in the gap between reading `Pending` and
            // registering to wait for it.
            let entry = self.slots.get(name);
            match entry.as_deref() {
                Some(Slot::Ready(img)) => return img.clone(),
                Some(Slot::Pending(n)) => {
                    let owned = n.clone();
                    let notified = owned.notified();
                    drop(entry);
                    notified.await;
                    continue;
                }
                None => drop(entry),
            }

            let notify = Arc::new(Notify::new());
            match self.slots.entry(name.to_string()) {
                dashmap::mapref::entry::Entry::Vacant(v) => {
                    v.insert(Slot::Pending(notify.clone()));
                }
                dashmap::mapref::entry::Entry::Occupied(_) => {
                    // Lost the race; retry from the top.
                    continue;
                }
            }

            let resolved = self.resolve(name).await;
            self.slots
                .insert(name.to_string(), Slot::Ready(resolved.clone()));
            notify.notify_waiters();
            return resolved;
        }
    }

    /// Bulk-populate the cache for a batch of resource names, deduplicating
    /// already-resolved or in-flight names.
    pub async fn prefetch(&self, names: impl IntoIterator<Item = String>) {
        let mut futures = Vec::new();
        for name in names {
            if !self.slots.contains_key(&name) {
                futures.push(self.get_owned(name));
            }
        }
        futures::future::join_all(futures).await;
    }

    async fn get_owned(&self, name: String) {
        self.get(&name).await;
    }

    async fn resolve(&self, name: &str) -> Option<Arc<RgbaImage>> {
        if let Some(img) = self.read_disk_cache(name) {
            return Some(Arc::new(img));
        }

        let bytes = match self.source.fetch(name).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(message) => {
                tracing::warn!(resource = name, message, "texture fetch failed");
                return None;
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                self.write_disk_cache(name, &rgba);
                Some(Arc::new(rgba))
            }
            Err(e) => {
                tracing::warn!(
                    resource = name,
                    error = %RenderError::DecodeFailed { name: name.to_string(), message: e.to_string() },
                    "texture decode failed"
                );
                None
            }
        }
    }

    fn cache_path(&self, name: &str) -> PathBuf {
        let safe = name.replace(['/', '\\'], "_");
        self.disk_cache_dir.join(format!("{safe}.png"))
    }

    fn read_disk_cache(&self, name: &str) -> Option<RgbaImage> {
        let path = self.cache_path(name);
        image::open(path).ok().map(|img| img.to_rgba8())
    }

    fn write_disk_cache(&self, name: &str, img: &RgbaImage) {
        let path = self.cache_path(name);
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return;
            }
        }
        let _ = img.save(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        pixel: [u8; 4],
    }

    #[async_trait]
    impl ResourceSource for CountingSource {
        async fn fetch(&self, name: &str) -> Result<Option<Vec<u8>>, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if name == "missing" {
                return Ok(None);
            }
            let img = RgbaImage::from_pixel(4, 4, image::Rgba(self.pixel));
            let mut bytes = Vec::new();
            image::DynamicImage::ImageRgba8(img)
                .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
                .unwrap();
            Ok(Some(bytes))
        }
    }

    #[tokio::test]
    async fn test_get_resolves_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            pixel: [10, 20, 30, 255],
        });
        let fetcher = TileResourceFetcher::new(source.clone(), dir.path());

        let img = fetcher.get("gfx/tiles/grass").await.unwrap();
        assert_eq!(img.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        // second call hits the in-memory slot, no extra fetch
        let _ = fetcher.get("gfx/tiles/grass").await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_resource_memoised_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            pixel: [0, 0, 0, 255],
        });
        let fetcher = TileResourceFetcher::new(source, dir.path());

        assert!(fetcher.get("missing").await.is_none());
        assert!(fetcher.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_get_coalesces() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(CountingSource {
            calls: AtomicUsize::new(0),
            pixel: [1, 2, 3, 255],
        });
        let fetcher = Arc::new(TileResourceFetcher::new(source.clone(), dir.path()));

        let a = fetcher.clone();
        let b = fetcher.clone();
        let (r1, r2) = tokio::join!(
            tokio::spawn(async move { a.get("shared").await }),
            tokio::spawn(async move { b.get("shared").await }),
        );
        assert!(r1.unwrap().is_some());
        assert!(r2.unwrap().is_some());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
