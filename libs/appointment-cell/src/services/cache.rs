// libs/appointment-cell/src/services/cache.rs
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Keys of cached appointment queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKey {
    AppointmentList,
    Appointment(i64),
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_stale(&self, stale_after: Duration) -> bool {
        self.stored_at.elapsed() > stale_after
    }
}

/// The backend narrows what each caller may see, so entries are kept per viewer.
type Slot = (String, QueryKey);

/// In-memory cache of appointment query results.
///
/// Entries older than `stale_after` read as absent and are evicted. Mutations
/// never write into the cache; they only invalidate, so the next read refetches.
pub struct QueryCache {
    entries: RwLock<HashMap<Slot, CacheEntry>>,
    stale_after: Duration,
}

impl QueryCache {
    pub fn new(stale_after: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stale_after,
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, viewer: &str, key: QueryKey) -> Option<T> {
        let slot = (viewer.to_string(), key);

        {
            let entries = self.entries.read().await;
            let entry = entries.get(&slot)?;

            if !entry.is_stale(self.stale_after) {
                return match serde_json::from_value(entry.value.clone()) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        warn!("Cached value for {:?} has unexpected shape: {}", key, e);
                        None
                    }
                };
            }
        }

        let mut entries = self.entries.write().await;
        // a fresh put may have landed between the two locks
        if entries.get(&slot).is_some_and(|entry| entry.is_stale(self.stale_after)) {
            entries.remove(&slot);
            debug!("Evicted stale cache entry {:?}", key);
        }
        None
    }

    pub async fn put<T: Serialize>(&self, viewer: &str, key: QueryKey, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(value) => value,
            Err(e) => {
                warn!("Not caching {:?}: {}", key, e);
                return;
            }
        };

        let mut entries = self.entries.write().await;
        let stale_after = self.stale_after;
        entries.retain(|_, entry| !entry.is_stale(stale_after));
        entries.insert((viewer.to_string(), key), CacheEntry { value, stored_at: Instant::now() });
    }

    /// Drops this query for every viewer. Returns how many entries went.
    pub async fn invalidate(&self, key: QueryKey) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(_, cached), _| *cached != key);
        let removed = before - entries.len();
        debug!("Invalidated {:?} ({} entries)", key, removed);
        removed
    }

    /// Drops the collection query and the query for this one appointment, for
    /// every viewer.
    pub async fn invalidate_appointment(&self, appointment_id: i64) {
        self.invalidate(QueryKey::AppointmentList).await;
        self.invalidate(QueryKey::Appointment(appointment_id)).await;
    }

    pub async fn contains(&self, viewer: &str, key: QueryKey) -> bool {
        self.entries.read().await.contains_key(&(viewer.to_string(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalidating_one_appointment_keeps_others() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("7", QueryKey::AppointmentList, &vec![1, 2]).await;
        cache.put("7", QueryKey::Appointment(1), &"one").await;
        cache.put("7", QueryKey::Appointment(2), &"two").await;

        cache.invalidate_appointment(1).await;

        assert!(!cache.contains("7", QueryKey::AppointmentList).await);
        assert!(!cache.contains("7", QueryKey::Appointment(1)).await);
        assert_eq!(cache.get::<String>("7", QueryKey::Appointment(2)).await.as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn viewers_do_not_share_entries() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("admin", QueryKey::AppointmentList, &vec![1, 2]).await;

        assert_eq!(cache.get::<Vec<i64>>("patient", QueryKey::AppointmentList).await, None);
        assert_eq!(cache.get::<Vec<i64>>("admin", QueryKey::AppointmentList).await, Some(vec![1, 2]));
    }

    #[tokio::test]
    async fn invalidation_reaches_every_viewer() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put("admin", QueryKey::Appointment(4), &4).await;
        cache.put("doctor", QueryKey::Appointment(4), &4).await;
        cache.put("doctor", QueryKey::Appointment(5), &5).await;

        assert_eq!(cache.invalidate(QueryKey::Appointment(4)).await, 2);
        assert!(cache.contains("doctor", QueryKey::Appointment(5)).await);
    }

    #[tokio::test]
    async fn stale_entries_are_evicted() {
        let cache = QueryCache::new(Duration::ZERO);
        cache.put("7", QueryKey::Appointment(5), &5).await;
        cache.put("7", QueryKey::Appointment(6), &6).await;
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(cache.get::<i64>("7", QueryKey::Appointment(5)).await, None);
        assert!(!cache.contains("7", QueryKey::Appointment(5)).await);

        // a put sweeps whatever else went stale
        cache.put("8", QueryKey::AppointmentList, &Vec::<i64>::new()).await;
        assert!(!cache.contains("7", QueryKey::Appointment(6)).await);
        assert_eq!(cache.entries.read().await.len(), 1);
    }
}
