//! Per-session draft storage.

use std::future::Future;
use std::time::Duration;

use moka::future::Cache as MokaCache;

/// Single-writer string slots keyed by name, standing in for storage the
/// client keeps between pages.
pub trait DraftStore: Send + Sync {
    fn read(&self, key: &str) -> impl Future<Output = Option<String>> + Send;

    fn write(&self, key: &str, value: String) -> impl Future<Output = ()> + Send;

    fn clear(&self, key: &str) -> impl Future<Output = ()> + Send;
}

/// Draft slots held in a moka cache.
///
/// A slot that is neither read nor written for the idle TTL is dropped,
/// the way an abandoned browser session loses its storage.
#[derive(Clone)]
pub struct SessionDraftStore {
    slots: MokaCache<String, String>,
}

impl SessionDraftStore {
    pub fn new(idle_ttl: Duration, max_capacity: u64) -> Self {
        let slots = MokaCache::builder()
            .time_to_idle(idle_ttl)
            .max_capacity(max_capacity)
            .build();
        Self { slots }
    }
}

impl Default for SessionDraftStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(60 * 60), 10_000)
    }
}

impl DraftStore for SessionDraftStore {
    async fn read(&self, key: &str) -> Option<String> {
        self.slots.get(key).await
    }

    async fn write(&self, key: &str, value: String) {
        self.slots.insert(key.to_string(), value).await;
    }

    async fn clear(&self, key: &str) {
        self.slots.invalidate(key).await;
    }
}
