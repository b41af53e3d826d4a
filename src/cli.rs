use crate::filters::{FilterState, SearchType, SortKey};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Browse or search the parts catalog from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log output format
    #[arg(long, value_enum, default_value_t = default_tracing_format())]
    pub tracing: TracingFormat,

    /// Optional TOML file read before the environment
    #[arg(long, env = "CATALOG_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List items matching a filter set, one JSON object per line
    Browse(BrowseArgs),
    /// Run a name or SKU search
    Search(SearchArgs),
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long = "brand")]
    pub brands: Vec<String>,
    #[arg(long = "item-type")]
    pub item_types: Vec<String>,
    #[arg(long)]
    pub price_min: Option<f64>,
    #[arg(long)]
    pub price_max: Option<f64>,
    /// Include out-of-stock items
    #[arg(long)]
    pub any_stock: bool,
    /// Only items added in the last N days
    #[arg(long)]
    pub new_within: Option<u32>,
    /// Only items updated in the last N days
    #[arg(long)]
    pub updated_within: Option<u32>,
    #[arg(long, value_parser = parse_sort)]
    pub sort: Option<SortKey>,
}

impl FilterArgs {
    pub fn filter_state(&self) -> FilterState {
        let mut filters = FilterState::default()
            .with_price(self.price_min, self.price_max)
            .with_new_within_days(self.new_within)
            .with_updated_within_days(self.updated_within)
            .with_in_stock_only(!self.any_stock);
        for brand in &self.brands {
            filters = filters.with_brand(brand);
        }
        for item_type in &self.item_types {
            filters = filters.with_item_type(item_type);
        }
        filters
    }
}

#[derive(clap::Args, Debug)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub filters: FilterArgs,
    /// Number of pages to load
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

#[derive(clap::Args, Debug)]
pub struct SearchArgs {
    pub query: String,
    /// Match against SKUs instead of names
    #[arg(long)]
    pub sku: bool,
    #[command(flatten)]
    pub filters: FilterArgs,
    #[arg(long, default_value_t = 1)]
    pub pages: usize,
}

impl SearchArgs {
    pub fn search_type(&self) -> SearchType {
        if self.sku { SearchType::Sku } else { SearchType::Name }
    }
}

fn parse_sort(s: &str) -> Result<SortKey, String> {
    s.parse()
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable output on stderr
    Pretty,
    /// One JSON object per event
    Json,
}

/// Pretty for debug builds, JSON for release builds.
fn default_tracing_format() -> TracingFormat {
    if cfg!(debug_assertions) {
        TracingFormat::Pretty
    } else {
        TracingFormat::Json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_flags_build_filters() {
        let args = Args::try_parse_from([
            "parts-catalog",
            "browse",
            "--brand",
            "FMF",
            "--brand",
            "Pro Circuit",
            "--price-max",
            "200",
            "--any-stock",
            "--sort",
            "newest",
            "--pages",
            "3",
        ])
        .unwrap();

        let Command::Browse(browse) = args.command else {
            panic!("expected browse");
        };
        let filters = browse.filters.filter_state();
        assert_eq!(filters.brands.len(), 2);
        assert_eq!(filters.price.max, Some(200.0));
        assert!(!filters.in_stock_only);
        assert_eq!(browse.filters.sort, Some(SortKey::Newest));
        assert_eq!(browse.pages, 3);
    }

    #[test]
    fn search_defaults_to_name() {
        let args = Args::try_parse_from(["parts-catalog", "search", "brake pads"]).unwrap();
        let Command::Search(search) = args.command else {
            panic!("expected search");
        };
        assert_eq!(search.query, "brake pads");
        assert_eq!(search.search_type(), SearchType::Name);
        assert!(search.filters.filter_state().in_stock_only);
    }

    #[test]
    fn unknown_sort_is_rejected() {
        assert!(Args::try_parse_from(["parts-catalog", "browse", "--sort", "cheapest"]).is_err());
    }
}
