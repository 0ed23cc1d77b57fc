//! Best-effort downstream cache invalidation. A failed POST is logged and
//! never fails the generation run that triggered it.

/// Fires `POST {base_url}/internal/public-cache/invalidate/{slug}`.
pub struct Invalidator {
    client: reqwest::Client,
    base_url: Option<String>,
}

impl Invalidator {
    /// Build an invalidator. `base_url = None` disables the POST entirely
    /// (useful for tests and for deployments with no separate viewer process).
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Notify the viewer front-end that `slug`'s cached bytes are stale.
    pub async fn invalidate(&self, slug: &str) {
        let Some(base) = &self.base_url else { return };
        let url = format!("{base}/internal/public-cache/invalidate/{slug}");
        if let Err(e) = self.client.post(&url).send().await {
            tracing::warn!(slug, error = %e, "public cache invalidation request failed");
        }
    }
}
