//! Incremental fetch-and-cache coordinator for a motorcycle-parts catalog.
//!
//! Turns a mutable filter set, a debounced search box and a cursor-paginated
//! upstream API into one consistent result list. Start at
//! [`browser::CatalogBrowser`].

pub mod app;
pub mod browser;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod filters;
pub mod logging;
pub mod merge;
pub mod outcome;
pub mod search;
pub mod utils;

pub use browser::{BrowserSettings, BrowserSnapshot, CatalogBrowser};
pub use error::CatalogError;
pub use outcome::PageOutcome;
