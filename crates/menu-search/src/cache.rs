/// Redis caching layer for menu searches.
///
/// Reads return `Option<T>`; a miss, a decode failure and an unavailable Redis all look the
/// same to callers, who fall through to Solr.
///
/// Key schema:
/// - `menu:v1:search:{sha256(params)}`: JSON `MenuListResponse` (TTL from config)
/// - `menu:v1:brands`: JSON `Vec<BrandInfo>` (TTL from config)
///
/// Votes change popularity, which feeds ranking, so every vote drops the whole namespace.
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use menu_common::mcp_api::{BrandInfo, MenuListResponse};
use menu_common::query::QueryDescriptor;
use menu_common::redis::RedisCache;

const KEY_PREFIX: &str = "menu:v1:";

pub struct MenuCache {
    redis: RedisCache,
    ttl_secs: u64,
}

impl MenuCache {
    pub fn new(redis: RedisCache, ttl_secs: u64) -> Self {
        Self { redis, ttl_secs }
    }

    // --- Search results ---

    pub async fn get_search(&self, query: &QueryDescriptor) -> Option<MenuListResponse> {
        let key = search_key(query);
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_search(&self, query: &QueryDescriptor, response: &MenuListResponse) {
        if self.ttl_secs == 0 {
            return;
        }
        let key = search_key(query);
        if let Ok(json) = serde_json::to_string(response) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    // --- Brands ---

    pub async fn get_brands(&self) -> Option<Vec<BrandInfo>> {
        let key = format!("{KEY_PREFIX}brands");
        let json = self.redis.get(&key).await?;
        serde_json::from_str(&json)
            .inspect_err(|e| warn!(error = %e, key, "cache deserialization failed"))
            .ok()
    }

    pub async fn set_brands(&self, brands: &[BrandInfo]) {
        if self.ttl_secs == 0 {
            return;
        }
        let key = format!("{KEY_PREFIX}brands");
        if let Ok(json) = serde_json::to_string(brands) {
            self.redis.set_with_ttl(&key, &json, self.ttl_secs).await;
        }
    }

    // --- Invalidation ---

    pub async fn invalidate_all(&self) {
        if self.redis.delete_by_prefix(KEY_PREFIX).await {
            debug!("menu cache invalidated");
        }
    }
}

/// Deterministic key over the exact request parameters sent to Solr.
fn search_key(query: &QueryDescriptor) -> String {
    let mut hasher = Sha256::new();
    for (name, value) in query.to_params() {
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        hasher.update(value.as_bytes());
        hasher.update(b"&");
    }
    let hash = hasher.finalize();
    format!("{KEY_PREFIX}search:{:x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use menu_common::model::FilterCriteria;
    use menu_common::query::{build_query, QueryMode, QueryOptions};

    fn ranked(rows: u32) -> QueryOptions {
        QueryOptions {
            mode: QueryMode::Ranked,
            rows,
        }
    }

    #[test]
    fn test_search_key_is_deterministic() {
        let filters = FilterCriteria::initial();
        let a = build_query("burger", &filters, &ranked(20));
        let b = build_query("burger", &filters, &ranked(20));
        assert_eq!(search_key(&a), search_key(&b));
        assert!(search_key(&a).starts_with("menu:v1:search:"));
        assert_eq!(search_key(&a).len(), "menu:v1:search:".len() + 64);
    }

    #[test]
    fn test_search_key_tracks_every_parameter() {
        let filters = FilterCriteria::initial();
        let base = search_key(&build_query("burger", &filters, &ranked(20)));

        assert_ne!(base, search_key(&build_query("wrap", &filters, &ranked(20))));
        assert_ne!(base, search_key(&build_query("burger", &filters, &ranked(21))));

        let filtered = QueryOptions {
            mode: QueryMode::Filtered,
            rows: 20,
        };
        assert_ne!(base, search_key(&build_query("burger", &filters, &filtered)));

        let kfc = FilterCriteria {
            company: "KFC".to_string(),
            ..FilterCriteria::initial()
        };
        assert_ne!(base, search_key(&build_query("burger", &kfc, &ranked(20))));
    }

    #[tokio::test]
    async fn test_disabled_redis_is_always_a_miss() {
        let cache = MenuCache::new(RedisCache::disabled(), 300);
        let query = build_query("", &FilterCriteria::default(), &ranked(5));
        cache
            .set_search(&query, &MenuListResponse::from_items(&[]))
            .await;
        assert!(cache.get_search(&query).await.is_none());
        assert!(cache.get_brands().await.is_none());
        cache.invalidate_all().await;
    }
}
