//! Client side of the upstream catalog API.

pub mod client;
pub mod errors;
pub mod json;
pub mod middleware;
pub mod models;
pub mod query;

pub use client::{CatalogApi, CatalogClient};
pub use errors::CatalogApiError;
pub use models::{CatalogResponse, Item, ItemId, Page};
pub use query::CatalogQuery;
