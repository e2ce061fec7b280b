use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use super::{
    CommunityStats, LeakEvent, LeakResolution, MemoryStore, NewLeak, ResolveApplied, Store,
    StoreResult, Technician, Tip,
};

/// `MemoryStore` with injected latency on the monitoring write and read paths.
pub(crate) struct DelayedStore {
    inner: Arc<MemoryStore>,
    insert_delay: Duration,
    recent_delays: Mutex<VecDeque<Duration>>,
}

impl DelayedStore {
    pub(crate) fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            insert_delay: Duration::ZERO,
            recent_delays: Mutex::new(VecDeque::new()),
        }
    }

    /// Every `insert_leak` sleeps for `delay` before it writes.
    pub(crate) fn with_insert_delay(mut self, delay: Duration) -> Self {
        self.insert_delay = delay;
        self
    }

    /// The n-th `recent_leaks` call reads immediately, then holds its result for the n-th
    /// delay. Calls past the end of the list return at once.
    pub(crate) fn with_recent_delays(self, delays: impl IntoIterator<Item = Duration>) -> Self {
        *self.recent_delays.lock().unwrap() = delays.into_iter().collect();
        self
    }

    fn next_recent_delay(&self) -> Duration {
        self.recent_delays
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Store for DelayedStore {
    async fn insert_leak(&self, leak: NewLeak) -> StoreResult<LeakEvent> {
        tokio::time::sleep(self.insert_delay).await;
        self.inner.insert_leak(leak).await
    }

    async fn get_leak(&self, leak_id: Uuid) -> StoreResult<Option<LeakEvent>> {
        self.inner.get_leak(leak_id).await
    }

    async fn recent_leaks(&self, user_id: Uuid, limit: i64) -> StoreResult<Vec<LeakEvent>> {
        let delay = self.next_recent_delay();
        let result = self.inner.recent_leaks(user_id, limit).await;
        tokio::time::sleep(delay).await;
        result
    }

    async fn resolve_leak(&self, resolution: &LeakResolution) -> StoreResult<ResolveApplied> {
        self.inner.resolve_leak(resolution).await
    }

    async fn community_stats(&self, user_id: Uuid) -> StoreResult<Option<CommunityStats>> {
        self.inner.community_stats(user_id).await
    }

    async fn list_tips(&self) -> StoreResult<Vec<Tip>> {
        self.inner.list_tips().await
    }

    async fn list_available_technicians(&self) -> StoreResult<Vec<Technician>> {
        self.inner.list_available_technicians().await
    }
}
