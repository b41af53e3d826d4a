//! Error types for the catalog API client.

#[derive(Debug, thiserror::Error)]
pub enum CatalogApiError {
    #[error("Catalog request failed: {0}")]
    Transport(#[from] reqwest_middleware::Error),
    #[error("Catalog returned {status} for {url}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("Failed to parse catalog response")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Catalog reported an unsuccessful response for {url}")]
    Unsuccessful { url: String },
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl CatalogApiError {
    /// Transport-level failures (timeouts, refused connections, 5xx) that a
    /// user-initiated retry may fix.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::ParseFailed { .. } | Self::Unsuccessful { .. } | Self::InvalidUrl(_) => false,
        }
    }
}
