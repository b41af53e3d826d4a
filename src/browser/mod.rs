//! The catalog view facade.
//!
//! One [`CatalogBrowser`] backs one listing page (products, a category, a
//! search page): it owns the filter state, the accumulated browse results, a
//! result cache with its sweeper, and a [`SearchCoordinator`]. Pages only call
//! the narrow surface here and render [`BrowserSnapshot`]s.
//!
//! Filter changes reset the accumulated list and advance a browse generation
//! before the new request is issued; a response for an older generation is
//! dropped, so results for two filter sets are never shown mixed.

pub mod enrich;

use crate::cache::{ResultCache, Sweeper};
use crate::catalog::{CatalogApi, Item, ItemId};
use crate::error::CatalogError;
use crate::fetcher::PaginationFetcher;
use crate::filters::{FilterState, SearchType, SortKey};
use crate::merge::merge_counted;
use crate::outcome::PageOutcome;
use crate::search::{SearchCoordinator, SearchRequest, SearchSettings, SearchSnapshot};
use crate::utils::lock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

#[derive(Debug, Clone)]
pub struct BrowserSettings {
    pub page_size: u32,
    pub sort: SortKey,
    pub cache_ttl: Duration,
    pub sweep_interval: Duration,
    pub search: SearchSettings,
    /// Run the detail enrichment stage after each applied browse page.
    pub enrich_details: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            sort: SortKey::default(),
            cache_ttl: crate::cache::DEFAULT_TTL,
            sweep_interval: crate::cache::DEFAULT_SWEEP_INTERVAL,
            search: SearchSettings::default(),
            enrich_details: false,
        }
    }
}

/// What a view renders.
#[derive(Debug, Clone)]
pub struct BrowserSnapshot {
    pub filters: FilterState,
    pub sort: SortKey,
    /// Search results while a search is active, browse results otherwise.
    pub items: Vec<Item>,
    pub has_more: bool,
    pub pages_loaded: usize,
    /// Set when the last browse request failed; previous items are retained.
    pub last_error: Option<CatalogError>,
    pub search: Arc<SearchSnapshot>,
}

#[derive(Debug, Default)]
struct BrowseState {
    filters: FilterState,
    sort: SortKey,
    generation: u64,
    items: Vec<Item>,
    next_cursor: Option<String>,
    has_more: bool,
    pages_loaded: usize,
    last_error: Option<CatalogError>,
}

impl BrowseState {
    /// Drop accumulated results and invalidate outstanding requests.
    fn restart(&mut self) -> u64 {
        self.generation += 1;
        self.items.clear();
        self.next_cursor = None;
        self.has_more = false;
        self.pages_loaded = 0;
        self.last_error = None;
        self.generation
    }
}

struct BrowserInner {
    fetcher: PaginationFetcher,
    search: SearchCoordinator,
    settings: BrowserSettings,
    state: Mutex<BrowseState>,
    sweepers: Mutex<Vec<Sweeper>>,
    background: CancellationToken,
    disposed: AtomicBool,
}

/// Clone-cheap handle to one catalog view's coordinator.
#[derive(Clone)]
pub struct CatalogBrowser {
    inner: Arc<BrowserInner>,
}

impl CatalogBrowser {
    /// Must be called within a tokio runtime (the cache sweepers are spawned).
    pub fn new(api: Arc<dyn CatalogApi>, settings: BrowserSettings) -> Self {
        Self::with_filters(api, settings, FilterState::default())
    }

    pub fn with_filters(
        api: Arc<dyn CatalogApi>,
        settings: BrowserSettings,
        filters: FilterState,
    ) -> Self {
        let results = ResultCache::new(settings.cache_ttl);
        let search_cache = ResultCache::new(settings.cache_ttl);
        let sweepers = vec![
            results.spawn_sweeper(settings.sweep_interval),
            search_cache.spawn_sweeper(settings.sweep_interval),
        ];

        let state = BrowseState {
            filters,
            sort: settings.sort,
            ..Default::default()
        };

        Self {
            inner: Arc::new(BrowserInner {
                fetcher: PaginationFetcher::new(api.clone(), results),
                search: SearchCoordinator::new(api, search_cache, settings.search),
                settings,
                state: Mutex::new(state),
                sweepers: Mutex::new(sweepers),
                background: CancellationToken::new(),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn filters(&self) -> FilterState {
        lock(&self.inner.state).filters.clone()
    }

    pub fn sort(&self) -> SortKey {
        lock(&self.inner.state).sort
    }

    pub fn page_size(&self) -> u32 {
        self.inner.settings.page_size
    }

    pub fn results_cache(&self) -> &ResultCache {
        self.inner.fetcher.cache()
    }

    pub fn search_cache(&self) -> &ResultCache {
        self.inner.search.cache()
    }

    pub fn subscribe_search(&self) -> watch::Receiver<Arc<SearchSnapshot>> {
        self.inner.search.subscribe()
    }

    pub fn snapshot(&self) -> BrowserSnapshot {
        let search = self.inner.search.snapshot();
        let state = lock(&self.inner.state);
        let (items, has_more) = if search.is_active {
            (search.items.clone(), search.has_more)
        } else {
            (state.items.clone(), state.has_more)
        };
        BrowserSnapshot {
            filters: state.filters.clone(),
            sort: state.sort,
            items,
            has_more,
            pages_loaded: state.pages_loaded,
            last_error: state.last_error.clone(),
            search,
        }
    }

    /// Load the first page for the current filters. With `reset` the cache is
    /// bypassed and the page refetched.
    pub async fn fetch_page(&self, reset: bool) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        let generation = lock(&self.inner.state).restart();
        self.load(generation, None, reset).await
    }

    /// Refetch the first page, ignoring the cache.
    pub async fn refresh(&self) -> Result<PageOutcome, CatalogError> {
        self.fetch_page(true).await
    }

    /// Replace the filter set and load its first page. An active search is
    /// re-issued against the new filters.
    pub async fn apply_filters(&self, filters: FilterState) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        let generation = {
            let mut state = lock(&self.inner.state);
            state.filters = filters;
            state.restart()
        };
        let (_, outcome) = tokio::join!(self.rerun_search(), self.load(generation, None, false));
        outcome
    }

    pub async fn set_sort(&self, sort: SortKey) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        let generation = {
            let mut state = lock(&self.inner.state);
            state.sort = sort;
            state.restart()
        };
        let (_, outcome) = tokio::join!(self.rerun_search(), self.load(generation, None, false));
        outcome
    }

    /// Continue the active search, or the browse list when no search is active.
    pub async fn load_more(&self) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        if self.inner.search.is_active() {
            return self.inner.search.load_more().await;
        }

        let (generation, cursor) = {
            let state = lock(&self.inner.state);
            match (&state.next_cursor, state.has_more) {
                (Some(cursor), true) => (state.generation, cursor.clone()),
                _ => return Ok(PageOutcome::Exhausted),
            }
        };
        self.load(generation, Some(cursor), false).await
    }

    /// Debounced search keystroke against the current filters.
    pub fn search(&self, query: &str, search_type: SearchType) {
        if self.inner.disposed.load(Ordering::Acquire) {
            return;
        }
        self.inner.search.input(self.search_request(query, search_type));
    }

    /// Search immediately, without waiting for the debounce window.
    pub async fn search_now(
        &self,
        query: &str,
        search_type: SearchType,
    ) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        let request = self.search_request(query, search_type);
        self.inner.search.search_now(request).await
    }

    pub fn clear_search(&self) {
        self.inner.search.clear();
    }

    /// Reset every filter to its default, drop all cached pages and reload,
    /// so the next page is always a genuine upstream fetch.
    pub async fn clear_all_filters(&self) -> Result<PageOutcome, CatalogError> {
        self.ensure_live()?;
        self.inner.fetcher.cache().clear();
        self.inner.search.cache().clear();
        self.inner.search.clear();
        let generation = {
            let mut state = lock(&self.inner.state);
            state.filters = FilterState::default();
            state.restart()
        };
        info!("all filters cleared");
        self.load(generation, None, false).await
    }

    /// Stop background work and release cached data. Further calls fail with
    /// [`CatalogError::Disposed`].
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.inner.background.cancel();
        for sweeper in lock(&self.inner.sweepers).drain(..) {
            sweeper.stop();
        }
        self.inner.search.dispose();
        self.inner.fetcher.cache().clear();
        self.inner.search.cache().clear();
        lock(&self.inner.state).restart();
        debug!("catalog browser disposed");
    }

    fn ensure_live(&self) -> Result<(), CatalogError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            Err(CatalogError::Disposed)
        } else {
            Ok(())
        }
    }

    fn search_request(&self, query: &str, search_type: SearchType) -> SearchRequest {
        let state = lock(&self.inner.state);
        SearchRequest::new(query, search_type).within(
            &state.filters,
            state.sort,
            self.inner.settings.page_size,
        )
    }

    /// Re-issue the latest search input against the current filters. Covers
    /// input that is still debouncing or in flight, not only settled results.
    async fn rerun_search(&self) {
        let Some(latest) = self.inner.search.latest_request() else {
            return;
        };
        let request = self.search_request(&latest.query, latest.search_type);
        trace!(query = request.term(), "re-issuing search for new filters");
        // failures are recorded on the search snapshot
        let _ = self.inner.search.search_now(request).await;
    }

    /// Fetch a browse page and apply it if `generation` is still current.
    async fn load(
        &self,
        generation: u64,
        cursor: Option<String>,
        reset: bool,
    ) -> Result<PageOutcome, CatalogError> {
        let (filters, sort) = {
            let state = lock(&self.inner.state);
            (state.filters.clone(), state.sort)
        };

        let fetch = self.inner.fetcher.fetch_page(
            &filters,
            sort,
            self.inner.settings.page_size,
            cursor.as_deref(),
            reset,
        );
        // Dropping the fetch on dispose also skips its cache write.
        let result = tokio::select! {
            _ = self.inner.background.cancelled() => {
                trace!(generation, "browse fetch cancelled by dispose");
                return Err(CatalogError::Disposed);
            }
            result = fetch => result,
        };

        let added_ids = {
            let mut state = lock(&self.inner.state);
            if state.generation != generation || state.next_cursor != cursor {
                debug!(generation, current = state.generation, "discarding stale browse page");
                return Ok(PageOutcome::Stale);
            }
            match result {
                Ok(page) => {
                    let before = state.items.len();
                    merge_counted(&mut state.items, page.items);
                    state.next_cursor = page.next_cursor;
                    state.has_more = page.has_more;
                    state.pages_loaded += 1;
                    state.last_error = None;
                    state.items[before..]
                        .iter()
                        .map(|item| item.id().clone())
                        .collect::<Vec<_>>()
                }
                Err(e) => {
                    state.last_error = Some(e.clone());
                    return Err(e);
                }
            }
        };

        let added = added_ids.len();
        if self.inner.settings.enrich_details && !added_ids.is_empty() {
            self.spawn_enrichment(generation, added_ids);
        }
        Ok(PageOutcome::Applied { added })
    }

    fn spawn_enrichment(&self, generation: u64, ids: Vec<ItemId>) {
        let api = self.inner.fetcher.api().clone();
        let token = self.inner.background.clone();
        let weak: Weak<BrowserInner> = Arc::downgrade(&self.inner);

        tokio::spawn(async move {
            let details = tokio::select! {
                _ = token.cancelled() => return,
                details = enrich::fetch_details(api.as_ref(), &ids) => details,
            };
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let mut state = lock(&inner.state);
            if state.generation != generation {
                trace!(generation, "dropping enrichment for superseded results");
                return;
            }
            let updated = enrich::apply_details(&mut state.items, details);
            trace!(updated, "items enriched");
        });
    }
}

impl Drop for BrowserInner {
    fn drop(&mut self) {
        self.background.cancel();
    }
}
