//! Per-query search state.

use crate::catalog::Item;
use crate::error::CatalogError;
use crate::filters::{CacheKey, FilterState, SearchType, SortKey, build_key};

/// Lifecycle of a search session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchPhase {
    #[default]
    Idle,
    /// Input accepted, waiting for the quiet period to elapse.
    Debouncing,
    /// A request for the current generation is outstanding.
    InFlight,
    /// The latest request has resolved (successfully or not).
    Settled,
}

/// Everything needed to issue a search: the term plus the browse context it
/// is layered on.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: String,
    pub search_type: SearchType,
    pub filters: FilterState,
    pub sort: SortKey,
    pub page_size: u32,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>, search_type: SearchType) -> Self {
        Self {
            query: query.into(),
            search_type,
            filters: FilterState::default(),
            sort: SortKey::default(),
            page_size: 20,
        }
    }

    pub fn within(mut self, filters: &FilterState, sort: SortKey, page_size: u32) -> Self {
        self.filters = filters.clone();
        self.sort = sort;
        self.page_size = page_size;
        self
    }

    pub fn term(&self) -> &str {
        self.query.trim()
    }

    /// Cache key of the first page of this search.
    pub fn key(&self) -> CacheKey {
        build_key(&self.filters, self.sort, self.page_size).for_search(self.search_type, self.term())
    }
}

/// Read-only view of the session, published to subscribers on every change.
#[derive(Debug, Clone, Default)]
pub struct SearchSnapshot {
    pub phase: SearchPhase,
    /// Term whose results are currently held in `items`.
    pub query: String,
    pub search_type: SearchType,
    pub generation: u64,
    pub items: Vec<Item>,
    pub has_more: bool,
    pub is_active: bool,
    pub last_error: Option<CatalogError>,
}

#[derive(Debug, Default)]
pub(crate) struct SearchSession {
    pub(crate) phase: SearchPhase,
    pub(crate) generation: u64,
    /// Request whose results are held; also the context for "load more".
    pub(crate) applied: Option<SearchRequest>,
    /// Latest accepted input, possibly still debouncing or in flight.
    pub(crate) requested: Option<SearchRequest>,
    pub(crate) items: Vec<Item>,
    pub(crate) next_cursor: Option<String>,
    pub(crate) has_more: bool,
    pub(crate) last_error: Option<CatalogError>,
}

impl SearchSession {
    /// Invalidate every outstanding request and start a new generation.
    pub(crate) fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Drop results and return to idle. The generation still advances so
    /// in-flight responses are discarded when they land.
    pub(crate) fn reset(&mut self) {
        self.advance();
        self.phase = SearchPhase::Idle;
        self.applied = None;
        self.requested = None;
        self.items.clear();
        self.next_cursor = None;
        self.has_more = false;
        self.last_error = None;
    }

    pub(crate) fn is_active(&self) -> bool {
        self.applied.is_some()
    }

    pub(crate) fn snapshot(&self) -> SearchSnapshot {
        let (query, search_type) = self
            .applied
            .as_ref()
            .map(|r| (r.term().to_owned(), r.search_type))
            .unwrap_or_default();
        SearchSnapshot {
            phase: self.phase,
            query,
            search_type,
            generation: self.generation,
            items: self.items.clone(),
            has_more: self.has_more,
            is_active: self.is_active(),
            last_error: self.last_error.clone(),
        }
    }
}
