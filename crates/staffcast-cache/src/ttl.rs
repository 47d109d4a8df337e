//! Fixed-TTL key/value store with a periodic sweeper.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// A map whose entries silently vanish after a fixed time-to-live.
///
/// The TTL is refreshed on every `set`, never on read. Expired entries are
/// invisible to `get` immediately; physical removal happens lazily on
/// access and in bulk through [`spawn_sweeper`](Self::spawn_sweeper).
pub struct TtlCache<K, V> {
    ttl: Duration,
    sweep_interval: Duration,
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    pub fn new(ttl: Duration, sweep_interval: Duration) -> Self {
        Self {
            ttl,
            sweep_interval,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `value` under `key`, restarting its TTL.
    pub fn set(&self, key: K, value: V) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
    }

    /// Fetch the live value for `key`, removing it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn remove(&self, key: &K) {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    /// Number of entries still within their TTL.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|e| e.expires_at > now).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Spawn the janitor task that purges expired entries on an interval.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(cache.sweep_interval);
            loop {
                interval.tick().await;
                let removed = cache.purge_expired();
                if removed > 0 {
                    tracing::debug!(removed, "swept expired cache entries");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache(ttl_ms: u64) -> TtlCache<i64, String> {
        TtlCache::new(
            Duration::from_millis(ttl_ms),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn value_readable_before_ttl_absent_after() {
        let c = cache(50);
        c.set(1, "X".into());
        assert_eq!(c.get(&1), Some("X".into()));

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(c.get(&1), None);
    }

    #[tokio::test]
    async fn set_refreshes_ttl() {
        let c = cache(60);
        c.set(1, "X".into());
        tokio::time::sleep(Duration::from_millis(40)).await;
        c.set(1, "Y".into());
        tokio::time::sleep(Duration::from_millis(40)).await;
        // 80ms after the first set, but only 40ms after the refresh.
        assert_eq!(c.get(&1), Some("Y".into()));
    }

    #[test]
    fn remove_deletes_entry() {
        let c = cache(1000);
        c.set(1, "X".into());
        c.remove(&1);
        assert_eq!(c.get(&1), None);
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let c = cache(50);
        c.set(1, "old".into());
        tokio::time::sleep(Duration::from_millis(80)).await;
        c.set(2, "new".into());
        assert_eq!(c.purge_expired(), 1);
        assert_eq!(c.get(&2), Some("new".into()));
    }
}
