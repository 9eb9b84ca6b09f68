/// Search session: the state a caller keeps between requests.
///
/// Holds the last query and filters, the currently loaded item snapshot and a loading
/// counter. The core functions ([`build_query`], [`normalize`], [`filter_items`]) stay
/// stateless; the session is the one place where state lives, and callers own it.
///
/// Snapshots are replaced wholesale. Each fetch draws a generation number when it starts,
/// and its result is installed only if no later-started fetch has been installed already,
/// so a slow stale response never overwrites a newer one.
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::CommonError;
use crate::filter::filter_items;
use crate::model::{CanonicalItem, Counter, FilterCriteria};
use crate::normalize::normalize;
use crate::query::{build_query, QueryMode, QueryOptions};
use crate::solr::SolrClient;

/// An immutable loaded collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemSnapshot {
    /// Generation of the fetch that produced this snapshot; 0 for the initial empty one.
    pub generation: u64,
    pub items: Vec<CanonicalItem>,
}

impl ItemSnapshot {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn find(&self, product_id: &str) -> Option<&CanonicalItem> {
        self.items.iter().find(|item| item.product_id == product_id)
    }

    /// Distinct brands, sorted.
    pub fn brands(&self) -> Vec<&str> {
        distinct(self.items.iter().map(|item| item.company.as_str()))
    }

    /// Distinct canonical categories, sorted.
    pub fn categories(&self) -> Vec<&str> {
        distinct(self.items.iter().map(|item| item.category.as_str()))
    }

    /// Re-filter locally without a round trip.
    pub fn filter(&self, text: &str, filters: &FilterCriteria) -> Vec<CanonicalItem> {
        filter_items(&self.items, text, filters)
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    values
        .filter(|v| !v.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone)]
struct LastRequest {
    query: String,
    filters: FilterCriteria,
}

pub struct SearchSession {
    client: Arc<SolrClient>,
    rows: u32,
    last: Mutex<LastRequest>,
    snapshot: RwLock<Arc<ItemSnapshot>>,
    issued: AtomicU64,
    in_flight: AtomicUsize,
}

impl SearchSession {
    pub fn new(client: Arc<SolrClient>) -> Self {
        let rows = client.config().rows;
        Self {
            client,
            rows,
            last: Mutex::new(LastRequest {
                query: String::new(),
                filters: FilterCriteria::initial(),
            }),
            snapshot: RwLock::new(Arc::new(ItemSnapshot::default())),
            issued: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
        }
    }

    /// Load the collection for `text`. `filters`, when given, replace the remembered filters;
    /// otherwise the remembered ones apply.
    ///
    /// Returns the snapshot this fetch produced. On failure the shared snapshot is reset to
    /// empty and the error is returned.
    pub async fn fetch(
        &self,
        text: &str,
        filters: Option<FilterCriteria>,
    ) -> Result<Arc<ItemSnapshot>, CommonError> {
        let request = {
            let mut last = self.last.lock().await;
            last.query = text.to_string();
            if let Some(filters) = filters {
                last.filters = filters;
            }
            last.clone()
        };
        self.run(request).await
    }

    /// Re-issue the last query with the last filters.
    pub async fn refresh(&self) -> Result<Arc<ItemSnapshot>, CommonError> {
        let request = self.last.lock().await.clone();
        self.run(request).await
    }

    pub async fn like(&self, product_id: &str) -> Result<Option<Arc<ItemSnapshot>>, CommonError> {
        self.vote(product_id, Counter::Likes).await
    }

    pub async fn dislike(
        &self,
        product_id: &str,
    ) -> Result<Option<Arc<ItemSnapshot>>, CommonError> {
        self.vote(product_id, Counter::Dislikes).await
    }

    /// Increment `counter`, then refresh so the stored value is observed.
    /// The cached item is never patched locally.
    ///
    /// An error means the increment itself failed. Once it succeeds the vote stands: a failed
    /// refresh is logged and reported as `Ok(None)`, and the snapshot is cleared as for any
    /// failed fetch.
    pub async fn vote(
        &self,
        product_id: &str,
        counter: Counter,
    ) -> Result<Option<Arc<ItemSnapshot>>, CommonError> {
        self.client.increment_counter(product_id, counter).await?;
        match self.refresh().await {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(product_id, counter = counter.field(), error = %e, "vote recorded, refresh failed");
                Ok(None)
            }
        }
    }

    pub async fn snapshot(&self) -> Arc<ItemSnapshot> {
        Arc::clone(&*self.snapshot.read().await)
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    pub async fn last_query(&self) -> String {
        self.last.lock().await.query.clone()
    }

    pub async fn last_filters(&self) -> FilterCriteria {
        self.last.lock().await.filters.clone()
    }

    async fn run(&self, request: LastRequest) -> Result<Arc<ItemSnapshot>, CommonError> {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let opts = QueryOptions {
            mode: QueryMode::Filtered,
            rows: self.rows,
        };
        let query = build_query(&request.query, &request.filters, &opts);

        let result = {
            let _loading = LoadingGuard::enter(&self.in_flight);
            self.client.search(&query).await
        };

        match result {
            Ok(docs) => {
                let snapshot = Arc::new(ItemSnapshot {
                    generation,
                    items: normalize(&docs),
                });
                info!(generation, items = snapshot.len(), query = %request.query, "menu loaded");
                self.install(Arc::clone(&snapshot)).await;
                Ok(snapshot)
            }
            Err(e) => {
                warn!(generation, error = %e, "menu fetch failed, clearing loaded items");
                self.install(Arc::new(ItemSnapshot {
                    generation,
                    items: Vec::new(),
                }))
                .await;
                Err(e)
            }
        }
    }

    async fn install(&self, candidate: Arc<ItemSnapshot>) {
        let mut current = self.snapshot.write().await;
        if candidate.generation > current.generation {
            *current = candidate;
        } else {
            debug!(
                stale = candidate.generation,
                installed = current.generation,
                "dropping stale fetch result"
            );
        }
    }
}

/// Counts a fetch as in flight for as long as it lives, including when the fetch future is
/// dropped mid-request.
struct LoadingGuard<'a>(&'a AtomicUsize);

impl<'a> LoadingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
