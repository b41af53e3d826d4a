//! Errors surfaced to catalog views.

use crate::catalog::CatalogApiError;
use std::sync::Arc;

/// A failure the view can display next to its (unchanged) previous results.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("fetch failed, previous results retained")]
    FetchFailed(#[source] Arc<CatalogApiError>),
    #[error("catalog browser has been disposed")]
    Disposed,
}

impl CatalogError {
    /// Whether re-triggering the same action may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::FetchFailed(e) => e.is_retryable(),
            Self::Disposed => false,
        }
    }
}

impl From<CatalogApiError> for CatalogError {
    fn from(e: CatalogApiError) -> Self {
        Self::FetchFailed(Arc::new(e))
    }
}
