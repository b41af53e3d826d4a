//! Debounced free-text search with stale-response suppression.
//!
//! Every issued request captures the session generation. When a response
//! lands it is applied only if that generation is still current; any newer
//! keystroke, clear, or teardown advances the generation first, so
//! out-of-order responses are dropped no matter when they arrive. Debounce
//! timers are aborted outright when superseded. Requests that already left
//! are cancelled on clear/teardown and otherwise left to be discarded.

mod session;

pub use session::{SearchPhase, SearchRequest, SearchSnapshot};

use crate::cache::ResultCache;
use crate::catalog::{CatalogApi, CatalogQuery, Page};
use crate::error::CatalogError;
use crate::fetcher::PaginationFetcher;
use crate::filters::CacheKey;
use crate::merge::merge_counted;
use crate::outcome::PageOutcome;
use crate::utils::lock;
use session::SearchSession;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_LEN: usize = 3;

#[derive(Debug, Clone, Copy)]
pub struct SearchSettings {
    pub debounce: Duration,
    /// Queries shorter than this (in characters, after trimming) clear search.
    pub min_query_len: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: MIN_QUERY_LEN,
        }
    }
}

/// A scheduled debounce timer. `fired` flips once the quiet period elapsed
/// and the request has started.
struct PendingSearch {
    handle: JoinHandle<()>,
    fired: Arc<AtomicBool>,
}

struct Inner {
    fetcher: PaginationFetcher,
    settings: SearchSettings,
    session: Mutex<SearchSession>,
    pending: Mutex<Option<PendingSearch>>,
    /// Cancels requests already sent; replaced with a fresh token on clear.
    cancel: Mutex<CancellationToken>,
    disposed: AtomicBool,
    tx: watch::Sender<Arc<SearchSnapshot>>,
}

/// Owns one search session. Clone-cheap.
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

impl SearchCoordinator {
    /// `cache` holds search pages only; keep it separate from the browse cache.
    pub fn new(api: Arc<dyn CatalogApi>, cache: ResultCache, settings: SearchSettings) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(SearchSnapshot::default()));
        Self {
            inner: Arc::new(Inner {
                fetcher: PaginationFetcher::new(api, cache),
                settings,
                session: Mutex::new(SearchSession::default()),
                pending: Mutex::new(None),
                cancel: Mutex::new(CancellationToken::new()),
                disposed: AtomicBool::new(false),
                tx,
            }),
        }
    }

    pub fn cache(&self) -> &ResultCache {
        self.inner.fetcher.cache()
    }

    pub fn snapshot(&self) -> Arc<SearchSnapshot> {
        self.inner.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<SearchSnapshot>> {
        self.inner.tx.subscribe()
    }

    pub fn is_active(&self) -> bool {
        lock(&self.inner.session).is_active()
    }

    /// Feed a keystroke. Short input clears the session; otherwise the
    /// debounce timer is restarted and the request fires once input is quiet.
    pub fn input(&self, request: SearchRequest) {
        if self.inner.disposed.load(Ordering::Acquire) {
            return;
        }
        if !self.accepts(&request) {
            self.clear();
            return;
        }

        self.cancel_pending_timer();

        // A new keystroke supersedes whatever is in flight right away.
        let scheduled = {
            let mut session = lock(&self.inner.session);
            session.phase = SearchPhase::Debouncing;
            session.requested = Some(request.clone());
            session.advance()
        };
        self.publish();

        let fired = Arc::new(AtomicBool::new(false));
        let this = self.clone();
        let flag = fired.clone();
        let debounce = self.inner.settings.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            flag.store(true, Ordering::Release);
            // Errors are recorded in the session; nothing to report here.
            let _ = this.execute(request, Some(scheduled)).await;
        });

        *lock(&self.inner.pending) = Some(PendingSearch { handle, fired });
    }

    /// Issue `request` immediately, skipping the debounce window.
    pub async fn search_now(&self, request: SearchRequest) -> Result<PageOutcome, CatalogError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(CatalogError::Disposed);
        }
        if !self.accepts(&request) {
            self.clear();
            return Ok(PageOutcome::Cleared);
        }
        self.cancel_pending_timer();
        lock(&self.inner.session).requested = Some(request.clone());
        self.execute(request, None).await
    }

    /// The most recent search input that was accepted, whether it is still
    /// debouncing, in flight, or settled. `None` once the session is idle.
    pub fn latest_request(&self) -> Option<SearchRequest> {
        let session = lock(&self.inner.session);
        match session.phase {
            SearchPhase::Idle => None,
            _ => session.requested.clone(),
        }
    }

    /// Fetch the next page of the active search and merge it into the list.
    pub async fn load_more(&self) -> Result<PageOutcome, CatalogError> {
        if self.inner.disposed.load(Ordering::Acquire) {
            return Err(CatalogError::Disposed);
        }

        let (generation, cursor, request) = {
            let session = lock(&self.inner.session);
            match (&session.applied, &session.next_cursor) {
                (Some(request), Some(cursor)) if session.has_more => {
                    (session.generation, cursor.clone(), request.clone())
                }
                _ => return Ok(PageOutcome::Exhausted),
            }
        };

        let key = request.key().with_cursor(&cursor);
        let query = CatalogQuery::new(request.filters.clone(), request.sort, request.page_size)
            .with_cursor(Some(cursor.clone()))
            .with_search(request.search_type, request.term());

        let span = debug_span!("search_load_more", generation, query = request.term());
        let Some(result) = self.fetch_cancellable(key, query).instrument(span).await else {
            return Ok(PageOutcome::Stale);
        };

        let outcome = {
            let mut session = lock(&self.inner.session);
            if session.generation != generation
                || session.next_cursor.as_deref() != Some(cursor.as_str())
            {
                debug!(generation, current = session.generation, "discarding stale search page");
                return Ok(PageOutcome::Stale);
            }
            match result {
                Ok(page) => {
                    let added = merge_counted(&mut session.items, page.items);
                    session.next_cursor = page.next_cursor;
                    session.has_more = page.has_more;
                    session.last_error = None;
                    Ok(PageOutcome::Applied { added })
                }
                Err(e) => {
                    session.last_error = Some(e.clone());
                    Err(e)
                }
            }
        };
        self.publish();
        outcome
    }

    /// Cancel everything and return to idle.
    pub fn clear(&self) {
        self.cancel_pending_timer();
        self.cancel_in_flight();
        lock(&self.inner.session).reset();
        self.publish();
        trace!("search cleared");
    }

    /// Tear down: clear, then refuse further work.
    pub fn dispose(&self) {
        self.inner.disposed.store(true, Ordering::Release);
        self.clear();
        lock(&self.inner.cancel).cancel();
    }

    fn accepts(&self, request: &SearchRequest) -> bool {
        request.term().chars().count() >= self.inner.settings.min_query_len
    }

    /// Debouncing → InFlight → Settled for one request.
    ///
    /// `scheduled` is the generation a debounced request was queued under; if
    /// the session moved on before the timer's request started, it never runs.
    async fn execute(
        &self,
        request: SearchRequest,
        scheduled: Option<u64>,
    ) -> Result<PageOutcome, CatalogError> {
        let generation = {
            let mut session = lock(&self.inner.session);
            if let Some(expected) = scheduled
                && session.generation != expected
            {
                trace!(expected, current = session.generation, "debounced search superseded before start");
                return Ok(PageOutcome::Stale);
            }
            let generation = session.advance();
            session.phase = SearchPhase::InFlight;
            generation
        };
        self.publish();

        let key = request.key();
        let query = CatalogQuery::new(request.filters.clone(), request.sort, request.page_size)
            .with_search(request.search_type, request.term());

        let span = debug_span!("search", generation, query = request.term(), kind = %request.search_type);
        let Some(result) = self.fetch_cancellable(key, query).instrument(span).await else {
            return Ok(PageOutcome::Stale);
        };

        let outcome = {
            let mut session = lock(&self.inner.session);
            if session.generation != generation {
                debug!(generation, current = session.generation, query = request.term(), "discarding stale search response");
                return Ok(PageOutcome::Stale);
            }
            session.phase = SearchPhase::Settled;
            match result {
                Ok(page) => {
                    let added = page.items.len();
                    session.items = page.items;
                    session.next_cursor = page.next_cursor;
                    session.has_more = page.has_more;
                    session.last_error = None;
                    session.applied = Some(request);
                    Ok(PageOutcome::Applied { added })
                }
                Err(e) => {
                    // previous results stay visible
                    session.last_error = Some(e.clone());
                    Err(e)
                }
            }
        };
        self.publish();
        outcome
    }

    /// Run a cached-or-network fetch that aborts when the session is cleared.
    /// Returns `None` if cancelled.
    async fn fetch_cancellable(
        &self,
        key: CacheKey,
        query: CatalogQuery,
    ) -> Option<Result<Page, CatalogError>> {
        let token = lock(&self.inner.cancel).clone();
        tokio::select! {
            _ = token.cancelled() => {
                trace!("search request cancelled");
                None
            }
            result = self.inner.fetcher.fetch_keyed(key, &query, false) => Some(result),
        }
    }

    fn cancel_pending_timer(&self) {
        if let Some(pending) = lock(&self.inner.pending).take() {
            if pending.fired.load(Ordering::Acquire) {
                // request already left; the generation check will drop it
                trace!("pending search already fired, detaching");
            } else {
                pending.handle.abort();
                trace!("debounce timer cancelled");
            }
        }
    }

    fn cancel_in_flight(&self) {
        let mut token = lock(&self.inner.cancel);
        let old = std::mem::replace(&mut *token, CancellationToken::new());
        old.cancel();
    }

    fn publish(&self) {
        let snapshot = lock(&self.inner.session).snapshot();
        self.inner.tx.send_replace(Arc::new(snapshot));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(pending) = lock(&self.pending).take() {
            pending.handle.abort();
        }
        lock(&self.cancel).cancel();
    }
}
