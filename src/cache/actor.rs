//! Cache actor
//!
//! A single worker task owns the [`CacheStore`] and drains a FIFO stream of
//! operations. Callers hold a cheap [`Cache`] handle that turns method calls
//! into queued operations and, for reads, waits for the reply.
//!
//! Between operations the worker sweeps expired entries whenever it has been
//! idle for `sweep_idle`, or when more than `sweep_interval` has passed since
//! the last sweep, so eviction keeps up even under constant traffic.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::keys::{CacheKey, Namespace};
use super::store::{CacheStats, CacheStore, CacheValue};
use crate::config::CacheConfig;

/// Operations processed by the cache worker
pub enum CacheOp {
    Insert {
        key: CacheKey,
        value: CacheValue,
        /// `None` applies the current default ttl
        ttl: Option<Duration>,
    },
    Remove {
        key: CacheKey,
    },
    Fetch {
        key: CacheKey,
        reply: oneshot::Sender<Option<CacheValue>>,
    },
    FlushAll,
    FlushByType {
        namespace: Namespace,
    },
    FetchAllOfType {
        namespace: Namespace,
        reply: oneshot::Sender<Vec<CacheValue>>,
    },
    UpdateDefaultTtl {
        ttl: Duration,
    },
    Stats {
        reply: oneshot::Sender<CacheStats>,
    },
}

/// Sweep timing for the worker loop
#[derive(Debug, Clone, Copy)]
pub struct SweepSchedule {
    pub idle: Duration,
    pub max_interval: Duration,
}

impl From<&CacheConfig> for SweepSchedule {
    fn from(config: &CacheConfig) -> Self {
        Self {
            idle: Duration::from_millis(config.sweep_idle_ms.max(1)),
            max_interval: Duration::from_millis(config.sweep_interval_ms),
        }
    }
}

/// Handle to the cache worker
///
/// Cloning is cheap; every clone feeds the same operation stream.
#[derive(Clone)]
pub struct Cache {
    sender: mpsc::Sender<CacheOp>,
}

impl Cache {
    /// Spawn the cache worker on the current runtime
    pub fn spawn(config: &CacheConfig) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let store = CacheStore::new(config.default_ttl());
        let schedule = SweepSchedule::from(config);

        let handle = tokio::spawn(run_worker(store, receiver, schedule));
        (Self { sender }, handle)
    }

    /// Insert under the default ttl. No-op if the key already exists.
    pub async fn insert(
        &self,
        namespace: Namespace,
        name: impl Into<String>,
        value: CacheValue,
    ) {
        self.send(CacheOp::Insert {
            key: CacheKey::new(namespace, name),
            value,
            ttl: None,
        })
        .await;
    }

    /// Insert with an explicit ttl, e.g. [`MAX_TTL`](super::MAX_TTL)
    pub async fn insert_with_ttl(
        &self,
        namespace: Namespace,
        name: impl Into<String>,
        value: CacheValue,
        ttl: Duration,
    ) {
        self.send(CacheOp::Insert {
            key: CacheKey::new(namespace, name),
            value,
            ttl: Some(ttl),
        })
        .await;
    }

    pub async fn remove(&self, namespace: Namespace, name: impl Into<String>) {
        self.send(CacheOp::Remove {
            key: CacheKey::new(namespace, name),
        })
        .await;
    }

    /// Fetch a value, refreshing its age on hit
    pub async fn fetch(&self, namespace: Namespace, name: impl Into<String>) -> Option<CacheValue> {
        let (reply, rx) = oneshot::channel();
        self.send(CacheOp::Fetch {
            key: CacheKey::new(namespace, name),
            reply,
        })
        .await;
        rx.await.ok().flatten()
    }

    /// Fetch and downcast. A value of another type reads as a miss.
    pub async fn fetch_as<T: Any + Send + Sync>(
        &self,
        namespace: Namespace,
        name: impl Into<String>,
    ) -> Option<Arc<T>> {
        self.fetch(namespace, name).await?.downcast::<T>().ok()
    }

    pub async fn flush_all(&self) {
        self.send(CacheOp::FlushAll).await;
    }

    pub async fn flush_by_type(&self, namespace: Namespace) {
        self.send(CacheOp::FlushByType { namespace }).await;
    }

    pub async fn fetch_all_of_type(&self, namespace: Namespace) -> Vec<CacheValue> {
        let (reply, rx) = oneshot::channel();
        self.send(CacheOp::FetchAllOfType { namespace, reply }).await;
        rx.await.unwrap_or_default()
    }

    /// Change the ttl used by future plain inserts
    pub async fn update_default_ttl(&self, ttl: Duration) {
        self.send(CacheOp::UpdateDefaultTtl { ttl }).await;
    }

    pub async fn stats(&self) -> Option<CacheStats> {
        let (reply, rx) = oneshot::channel();
        self.send(CacheOp::Stats { reply }).await;
        rx.await.ok()
    }

    async fn send(&self, op: CacheOp) {
        if self.sender.send(op).await.is_err() {
            warn!("Cache worker is not running; operation dropped");
        }
    }
}

async fn run_worker(
    mut store: CacheStore,
    mut receiver: mpsc::Receiver<CacheOp>,
    schedule: SweepSchedule,
) {
    info!(
        "Cache worker started (default ttl {:?}, idle sweep {:?}, max sweep interval {:?})",
        store.default_ttl(),
        schedule.idle,
        schedule.max_interval
    );
    let mut last_sweep = Instant::now();

    loop {
        match tokio::time::timeout(schedule.idle, receiver.recv()).await {
            Ok(Some(op)) => apply(&mut store, op),
            Ok(None) => break,
            Err(_) => {
                sweep(&mut store);
                last_sweep = Instant::now();
            }
        }

        if last_sweep.elapsed() > schedule.max_interval {
            sweep(&mut store);
            last_sweep = Instant::now();
        }
    }

    info!("Cache worker finished ({} entries dropped)", store.len());
}

fn sweep(store: &mut CacheStore) {
    let removed = store.sweep(Instant::now());
    if removed > 0 {
        debug!("Evicted {} expired cache entries", removed);
    }
}

fn apply(store: &mut CacheStore, op: CacheOp) {
    match op {
        CacheOp::Insert { key, value, ttl } => {
            if store.insert(key.clone(), value, ttl) {
                trace!("Cached {}", key);
            } else {
                trace!("Insert ignored, {} already cached", key);
            }
        }
        CacheOp::Remove { key } => {
            store.remove(&key);
        }
        CacheOp::Fetch { key, reply } => {
            let _ = reply.send(store.fetch(&key));
        }
        CacheOp::FlushAll => {
            store.flush_all();
            debug!("Cache flushed");
        }
        CacheOp::FlushByType { namespace } => {
            let removed = store.flush_by_type(&namespace);
            debug!("Flushed {} entries from namespace {}", removed, namespace);
        }
        CacheOp::FetchAllOfType { namespace, reply } => {
            let _ = reply.send(store.fetch_all_of_type(&namespace));
        }
        CacheOp::UpdateDefaultTtl { ttl } => {
            info!("Default cache ttl changed to {:?}", ttl);
            store.set_default_ttl(ttl);
        }
        CacheOp::Stats { reply } => {
            let _ = reply.send(store.stats());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MAX_TTL;

    fn test_config(ttl_ms: u64) -> CacheConfig {
        CacheConfig {
            ttl_ms,
            ..Default::default()
        }
    }

    async fn fetch_u32(cache: &Cache, namespace: Namespace, name: &str) -> Option<u32> {
        cache.fetch_as::<u32>(namespace, name).await.map(|v| *v)
    }

    #[tokio::test]
    async fn test_insert_then_fetch() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.insert(Namespace::RESOURCE, "a", Arc::new(42u32)).await;

        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "a").await, Some(42));
        assert_eq!(fetch_u32(&cache, Namespace::HANDLER, "a").await, None);
    }

    #[tokio::test]
    async fn test_second_insert_keeps_first_value() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.insert(Namespace::RESOURCE, "a", Arc::new(1u32)).await;
        cache.insert(Namespace::RESOURCE, "a", Arc::new(2u32)).await;

        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "a").await, Some(1));
    }

    #[tokio::test]
    async fn test_fetch_as_wrong_type_is_miss() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.insert(Namespace::RESOURCE, "a", Arc::new(1u32)).await;

        assert!(cache.fetch_as::<String>(Namespace::RESOURCE, "a").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_and_flush_all() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.insert(Namespace::RESOURCE, "a", Arc::new(1u32)).await;
        cache.insert(Namespace::RESOURCE, "b", Arc::new(2u32)).await;

        cache.remove(Namespace::RESOURCE, "a").await;
        cache.remove(Namespace::RESOURCE, "never-there").await;
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "a").await, None);
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "b").await, Some(2));

        cache.flush_all().await;
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "b").await, None);
    }

    #[tokio::test]
    async fn test_entry_expires_without_further_activity() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.update_default_ttl(Duration::from_millis(250)).await;
        cache.insert(Namespace::RESOURCE, "a", Arc::new(42u32)).await;

        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "a").await, None);
    }

    #[tokio::test]
    async fn test_entry_fetchable_before_ttl() {
        let (cache, _worker) = Cache::spawn(&test_config(500));
        cache.insert(Namespace::RESOURCE, "a", Arc::new(7u32)).await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "a").await, Some(7));
    }

    #[tokio::test]
    async fn test_fetch_keeps_entry_alive() {
        let (cache, _worker) = Cache::spawn(&test_config(200));
        cache.insert(Namespace::RESOURCE, "hot", Arc::new(1u32)).await;
        cache.insert(Namespace::RESOURCE, "cold", Arc::new(2u32)).await;

        for _ in 0..8 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "hot").await, Some(1));
        }

        // 400ms have passed, well over the 200ms ttl of the untouched entry
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "cold").await, None);
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "hot").await, Some(1));
    }

    #[tokio::test]
    async fn test_busy_worker_still_sweeps_on_interval() {
        // Idle sweeps never fire: an operation arrives every couple of ms
        let config = CacheConfig {
            ttl_ms: 100,
            sweep_idle_ms: 10_000,
            sweep_interval_ms: 50,
            ..Default::default()
        };
        let (cache, _worker) = Cache::spawn(&config);
        cache.insert(Namespace::RESOURCE, "hot", Arc::new(1u32)).await;
        cache.insert(Namespace::RESOURCE, "cold", Arc::new(2u32)).await;

        let start = Instant::now();
        while start.elapsed() < Duration::from_millis(400) {
            assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "hot").await, Some(1));
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let stats = cache.stats().await.unwrap();
        assert!(stats.sweeps >= 2, "sweeps = {}", stats.sweeps);
        assert_eq!(stats.evicted, 1);
        assert_eq!(stats.entry_count, 1);
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "cold").await, None);
    }

    #[tokio::test]
    async fn test_ttl_override_outlives_default() {
        let (cache, _worker) = Cache::spawn(&test_config(50));
        cache
            .insert_with_ttl(Namespace::HANDLER, "h", Arc::new(1u32), MAX_TTL)
            .await;
        cache.insert(Namespace::RESOURCE, "r", Arc::new(2u32)).await;

        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(fetch_u32(&cache, Namespace::HANDLER, "h").await, Some(1));
        assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, "r").await, None);
    }

    #[tokio::test]
    async fn test_flush_by_type_isolates_namespaces() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        for i in 0..100u32 {
            cache.insert(Namespace::RESOURCE, i.to_string(), Arc::new(i)).await;
            cache.insert(Namespace::DATABASE, i.to_string(), Arc::new(i + 1000)).await;
        }

        cache.flush_by_type(Namespace::RESOURCE).await;

        for i in 0..100u32 {
            let name = i.to_string();
            assert_eq!(fetch_u32(&cache, Namespace::RESOURCE, &name).await, None);
            assert_eq!(
                fetch_u32(&cache, Namespace::DATABASE, &name).await,
                Some(i + 1000)
            );
        }
    }

    #[tokio::test]
    async fn test_fetch_all_of_type() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.insert(Namespace::DATABASE, "a", Arc::new(1u32)).await;
        cache.insert(Namespace::DATABASE, "b", Arc::new(2u32)).await;
        cache.insert(Namespace::RESOURCE, "c", Arc::new(3u32)).await;

        let mut values: Vec<u32> = cache
            .fetch_all_of_type(Namespace::DATABASE)
            .await
            .into_iter()
            .filter_map(|v| v.downcast::<u32>().ok().map(|v| *v))
            .collect();
        values.sort_unstable();

        assert_eq!(values, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_first_processed_wins() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));

        let mut tasks = Vec::new();
        for i in 0..16u32 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                cache.insert(Namespace::RESOURCE, "race", Arc::new(i)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.entry_count, 1);
        assert!(fetch_u32(&cache, Namespace::RESOURCE, "race").await.unwrap() < 16);
    }

    #[tokio::test]
    async fn test_stats_report_default_ttl_update() {
        let (cache, _worker) = Cache::spawn(&test_config(60_000));
        cache.update_default_ttl(Duration::from_secs(5)).await;

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.default_ttl_ms, 5000);
    }

    #[tokio::test]
    async fn test_dead_worker_reads_as_miss() {
        let (cache, worker) = Cache::spawn(&test_config(60_000));
        worker.abort();
        let _ = worker.await;

        cache.insert(Namespace::RESOURCE, "a", Arc::new(1u32)).await;
        assert!(cache.fetch(Namespace::RESOURCE, "a").await.is_none());
        assert!(cache.fetch_all_of_type(Namespace::RESOURCE).await.is_empty());
        assert!(cache.stats().await.is_none());
    }
}
