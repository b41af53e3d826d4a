use crate::browser::{BrowserSettings, CatalogBrowser};
use crate::catalog::{CatalogApi, CatalogClient, Item};
use crate::cli::{BrowseArgs, Command, FilterArgs, SearchArgs};
use crate::config::Config;
use crate::error::CatalogError;
use crate::filters::SearchType;
use crate::outcome::PageOutcome;
use crate::utils::fmt_duration;
use anyhow::Context;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Wires the configured HTTP client into a browser and runs one command.
pub struct App {
    config: Config,
    api: Arc<dyn CatalogApi>,
}

impl App {
    pub fn new(config: Config) -> Result<Self, anyhow::Error> {
        let client = CatalogClient::new(
            &config.api_base_url,
            config.api_token.clone(),
            config.request_timeout,
        )
        .context("Failed to create catalog client")?;

        info!(
            base_url = %config.api_base_url,
            authenticated = config.api_token.is_some(),
            timeout = fmt_duration(config.request_timeout),
            "catalog client ready"
        );

        Ok(Self::with_api(config, Arc::new(client)))
    }

    pub fn with_api(config: Config, api: Arc<dyn CatalogApi>) -> Self {
        Self { config, api }
    }

    fn browser(&self, filters: &FilterArgs) -> CatalogBrowser {
        let mut settings: BrowserSettings = self.config.browser_settings();
        if let Some(sort) = filters.sort {
            settings.sort = sort;
        }
        CatalogBrowser::with_filters(self.api.clone(), settings, filters.filter_state())
    }

    pub async fn run(self, command: Command) -> ExitCode {
        let started = Instant::now();
        let result = match &command {
            Command::Browse(args) => self.browse(args).await,
            Command::Search(args) => self.search(args).await,
        };

        match result {
            Ok(count) => {
                info!(
                    items = count,
                    duration = fmt_duration(started.elapsed()),
                    "command finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!(error = ?e, "command failed");
                ExitCode::FAILURE
            }
        }
    }

    async fn browse(&self, args: &BrowseArgs) -> Result<usize, anyhow::Error> {
        let browser = self.browser(&args.filters);
        let result = self.collect(&browser, args.pages, None).await;
        browser.dispose();
        result
    }

    async fn search(&self, args: &SearchArgs) -> Result<usize, anyhow::Error> {
        let browser = self.browser(&args.filters);
        let result = self
            .collect(&browser, args.pages, Some((args.query.as_str(), args.search_type())))
            .await;
        browser.dispose();
        result
    }

    /// Load up to `pages` pages and print the merged list as JSON lines.
    async fn collect(
        &self,
        browser: &CatalogBrowser,
        pages: usize,
        search: Option<(&str, SearchType)>,
    ) -> Result<usize, anyhow::Error> {
        let first = match search {
            Some((query, search_type)) => browser.search_now(query, search_type).await,
            None => browser.fetch_page(false).await,
        };
        if let PageOutcome::Cleared = first.context("Failed to load first page")? {
            warn!(
                min = self.config.min_search_length,
                "query too short, nothing searched"
            );
            return Ok(0);
        }

        for page in 1..pages.max(1) {
            match browser.load_more().await {
                Ok(PageOutcome::Exhausted) => break,
                Ok(_) => {}
                Err(CatalogError::Disposed) => break,
                Err(e) => {
                    // keep what was already loaded
                    warn!(page = page + 1, error = %e, "stopped paging after failure");
                    break;
                }
            }
        }

        let snapshot = browser.snapshot();
        print_items(&snapshot.items)?;
        Ok(snapshot.items.len())
    }
}

fn print_items(items: &[Item]) -> Result<(), anyhow::Error> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for item in items {
        serde_json::to_writer(&mut out, item).context("Failed to encode item")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
