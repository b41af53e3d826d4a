//! HTTP client for the upstream catalog API.

use crate::catalog::errors::CatalogApiError;
use crate::catalog::json::decode_with_context;
use crate::catalog::middleware::RequestLogMiddleware;
use crate::catalog::models::{CatalogResponse, Item, ItemId};
use crate::catalog::query::CatalogQuery;
use crate::utils::preview;
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// The upstream operations the coordinator depends on.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// List one page of items for a filtered (and optionally searched) query.
    async fn list_items(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogApiError>;

    /// Fetch detail records for already-listed items.
    async fn item_details(&self, ids: &[ItemId]) -> Result<Vec<Item>, CatalogApiError>;
}

pub struct CatalogClient {
    http: ClientWithMiddleware,
    base_url: Url,
    token: Option<String>,
}

impl CatalogClient {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CatalogApiError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(reqwest_middleware::Error::from)?;
        let http = ClientBuilder::new(http).with(RequestLogMiddleware).build();

        Ok(Self {
            http,
            base_url: normalize_base(base_url)?,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    async fn get_envelope(
        &self,
        url: Url,
        params: &[(&'static str, String)],
    ) -> Result<CatalogResponse, CatalogApiError> {
        let mut request = self.http.get(url.clone()).query(params);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(reqwest_middleware::Error::from)?;

        if !status.is_success() {
            return Err(CatalogApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: preview(&body, 512),
            });
        }

        let envelope: CatalogResponse =
            decode_with_context(&body).map_err(|source| CatalogApiError::ParseFailed {
                status: status.as_u16(),
                url: url.to_string(),
                source,
            })?;

        if envelope.success == Some(false) {
            return Err(CatalogApiError::Unsuccessful {
                url: url.to_string(),
            });
        }

        Ok(envelope)
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    async fn list_items(&self, query: &CatalogQuery) -> Result<CatalogResponse, CatalogApiError> {
        let url = self.base_url.join("items")?;
        self.get_envelope(url, &query.params()).await
    }

    async fn item_details(&self, ids: &[ItemId]) -> Result<Vec<Item>, CatalogApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = self.base_url.join("items/details")?;
        let joined = ids.iter().map(ItemId::as_str).collect::<Vec<_>>().join(",");
        let envelope = self.get_envelope(url, &[("ids", joined)]).await?;
        let items = envelope.items();
        debug!(requested = ids.len(), received = items.len(), "item details fetched");
        Ok(items)
    }
}

/// Parse the base URL, making sure relative joins append to its path.
fn normalize_base(base_url: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url.trim())?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
