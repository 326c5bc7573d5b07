use ledger_core::AccountId;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::config::CacheSettings;

/// Cache statistics for monitoring hit rate and error counts.
#[derive(Debug, Default)]
pub struct CacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
    pub invalidations: AtomicU64,
    pub errors: AtomicU64,
}

impl CacheStats {
    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedAvailable {
    available: i64,
    currency: String,
}

/// Redis-backed read cache for `GetBalance`'s derived *available balance*
/// (§3). Purely a fast path: every mutating operation (`ReserveBalance`,
/// `CommitReservation`, `ReleaseReservation`, `CreditBalance`) invalidates
/// the account's entry, and the ledger's correctness never depends on the
/// cache being warm or even reachable — a Redis outage degrades `GetBalance`
/// to a database read, nothing more (§4.5-style "never blocks or fails the
/// calling" principle, applied to the read path instead of the event path).
pub struct BalanceCache {
    client: redis::Client,
    settings: CacheSettings,
    stats: Arc<CacheStats>,
}

impl BalanceCache {
    pub fn new(client: redis::Client, settings: CacheSettings) -> Self {
        Self {
            client,
            settings,
            stats: Arc::new(CacheStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        self.stats.clone()
    }

    fn cache_key(&self, account_id: AccountId) -> String {
        format!("{}:available:{}", self.settings.key_prefix, account_id)
    }

    pub async fn get(&self, account_id: AccountId) -> Option<(i64, String)> {
        if !self.settings.enabled {
            return None;
        }

        let key = self.cache_key(account_id);
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                self.stats.record_error();
                tracing::warn!("redis connection error in balance cache get: {}", e);
                return None;
            }
        };

        let raw: Option<String> = match conn.get(&key).await {
            Ok(v) => v,
            Err(e) => {
                self.stats.record_error();
                tracing::warn!("redis get error: {}", e);
                return None;
            }
        };

        match raw.and_then(|json| serde_json::from_str::<CachedAvailable>(&json).ok()) {
            Some(cached) => {
                self.stats.record_hit();
                Some((cached.available, cached.currency))
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub async fn set(&self, account_id: AccountId, available: i64, currency: &str) {
        if !self.settings.enabled {
            return;
        }

        let key = self.cache_key(account_id);
        let cached = CachedAvailable {
            available,
            currency: currency.to_string(),
        };
        let Ok(json) = serde_json::to_string(&cached) else {
            return;
        };

        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                self.stats.record_error();
                tracing::warn!("redis connection error in balance cache set: {}", e);
                return;
            }
        };

        if let Err(e) = conn
            .set_ex::<_, _, ()>(&key, json, self.settings.balance_ttl_secs as u64)
            .await
        {
            self.stats.record_error();
            tracing::warn!("redis set error: {}", e);
        }
    }

    pub async fn invalidate(&self, account_id: AccountId) {
        if !self.settings.enabled {
            return;
        }

        let key = self.cache_key(account_id);
        let mut conn = match self.client.get_multiplexed_async_connection().await {
            Ok(c) => c,
            Err(e) => {
                self.stats.record_error();
                tracing::warn!("redis connection error in balance cache invalidate: {}", e);
                return;
            }
        };

        match conn.del::<_, ()>(&key).await {
            Ok(_) => self.stats.record_invalidation(),
            Err(e) => {
                self.stats.record_error();
                tracing::warn!("redis del error: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_namespaced_by_prefix_and_account() {
        let settings = CacheSettings {
            url: "redis://localhost:6379".to_string(),
            enabled: true,
            balance_ttl_secs: 5,
            key_prefix: "ledger".to_string(),
        };
        let client = redis::Client::open("redis://localhost:6379").unwrap();
        let cache = BalanceCache::new(client, settings);
        let account_id = AccountId::new();

        let key = cache.cache_key(account_id);
        assert_eq!(key, format!("ledger:available:{account_id}"));
    }

    #[test]
    fn hit_rate_tracks_hits_and_misses() {
        let stats = CacheStats::default();
        stats.record_hit();
        stats.record_hit();
        stats.record_miss();
        assert!((stats.hit_rate() - 0.666).abs() < 0.01);
    }
}
