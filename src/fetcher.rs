//! Cache-first page fetching against the upstream catalog.

use crate::cache::{CacheEntry, ResultCache};
use crate::catalog::{CatalogApi, CatalogQuery, Page};
use crate::error::CatalogError;
use crate::filters::{CacheKey, FilterState, SortKey, build_key};
use crate::merge::dedup;
use crate::utils::log_if_slow;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const SLOW_FETCH: Duration = Duration::from_secs(3);

/// Turns a filter key and optional cursor into a page, consulting the cache
/// first. Accumulating pages is left to the caller (see [`crate::merge`]).
#[derive(Clone)]
pub struct PaginationFetcher {
    api: Arc<dyn CatalogApi>,
    cache: ResultCache,
}

impl PaginationFetcher {
    pub fn new(api: Arc<dyn CatalogApi>, cache: ResultCache) -> Self {
        Self { api, cache }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn api(&self) -> &Arc<dyn CatalogApi> {
        &self.api
    }

    /// Fetch one browse page.
    ///
    /// With `reset` the cursor is ignored and the cache is bypassed (but still
    /// written), so the caller must already have dropped its accumulated list.
    pub async fn fetch_page(
        &self,
        filters: &FilterState,
        sort: SortKey,
        page_size: u32,
        cursor: Option<&str>,
        reset: bool,
    ) -> Result<Page, CatalogError> {
        if reset && cursor.is_some() {
            debug!("cursor ignored for reset fetch");
        }
        let cursor = if reset { None } else { cursor };

        let base = build_key(filters, sort, page_size);
        let key = match cursor {
            Some(c) => base.with_cursor(c),
            None => base,
        };
        let query =
            CatalogQuery::new(filters.clone(), sort, page_size).with_cursor(cursor.map(str::to_owned));

        self.fetch_keyed(key, &query, reset).await
    }

    /// Fetch the page described by `query`, cached under `key`.
    pub async fn fetch_keyed(
        &self,
        key: CacheKey,
        query: &CatalogQuery,
        bypass_cache: bool,
    ) -> Result<Page, CatalogError> {
        if !bypass_cache && let Some(entry) = self.cache.get(&key) {
            debug!(key = %key, items = entry.items.len(), "serving page from cache");
            return Ok(Page {
                items: entry.items.clone(),
                next_cursor: entry.next_cursor.clone(),
                has_more: entry.has_more,
            });
        }

        let start = Instant::now();
        let response = self.api.list_items(query).await.map_err(|e| {
            warn!(key = %key, error = %e, "catalog fetch failed");
            CatalogError::from(e)
        })?;
        log_if_slow(start, SLOW_FETCH, "catalog page fetch");

        let items = dedup(response.items());
        let next_cursor = response.next_cursor().map(str::to_owned);
        let has_more = response.has_more();

        // A body without `data` counts as zero results but is never cached; a
        // genuinely empty final page is.
        let cacheable = response.data_present() && (!items.is_empty() || !has_more);
        if cacheable {
            self.cache.set(
                key.clone(),
                CacheEntry::new(items.clone(), next_cursor.clone(), has_more),
            );
        } else {
            debug!(key = %key, "response not cached (missing or empty data)");
        }

        debug!(key = %key, items = items.len(), has_more, "fetched page from catalog");
        Ok(Page {
            items,
            next_cursor,
            has_more,
        })
    }
}
