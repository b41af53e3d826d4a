//! Runtime configuration.
//!
//! Values come from an optional TOML file, then the process environment
//! (after `.env` is loaded by `main`). Environment keys are matched
//! case-insensitively, so `API_BASE_URL` fills `api_base_url`.

use crate::browser::BrowserSettings;
use crate::filters::SortKey;
use crate::search::SearchSettings;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use fundu::{DurationParser, TimeUnit};
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

#[derive(custom_debug_derive::Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the upstream catalog API, e.g. `https://api.example.com/v1`.
    pub api_base_url: String,
    #[serde(default)]
    #[debug(skip)]
    pub api_token: Option<String>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub default_sort: SortKey,
    #[serde(default = "default_cache_ttl", deserialize_with = "deserialize_duration")]
    pub cache_ttl: Duration,
    #[serde(
        default = "default_sweep_interval",
        deserialize_with = "deserialize_duration"
    )]
    pub cache_sweep_interval: Duration,
    #[serde(default = "default_debounce", deserialize_with = "deserialize_duration")]
    pub search_debounce: Duration,
    #[serde(default = "default_min_search_length")]
    pub min_search_length: usize,
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub request_timeout: Duration,
    #[serde(default)]
    pub enrich_details: bool,
}

impl Config {
    /// Load from `file` (if it exists) overlaid with the environment.
    pub fn load(file: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        let mut figment = Figment::new();
        if let Some(path) = file {
            figment = figment.merge(Toml::file(path));
        }
        Self::from_figment(figment.merge(Env::raw()))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, Box<figment::Error>> {
        figment.extract().map_err(Box::new)
    }

    pub fn browser_settings(&self) -> BrowserSettings {
        BrowserSettings {
            page_size: self.page_size.clamp(1, 100),
            sort: self.default_sort,
            cache_ttl: self.cache_ttl,
            sweep_interval: self.cache_sweep_interval,
            search: SearchSettings {
                debounce: self.search_debounce,
                min_query_len: self.min_search_length.max(1),
            },
            enrich_details: self.enrich_details,
        }
    }
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_page_size() -> u32 {
    20
}

fn default_cache_ttl() -> Duration {
    crate::cache::DEFAULT_TTL
}

fn default_sweep_interval() -> Duration {
    crate::cache::DEFAULT_SWEEP_INTERVAL
}

fn default_debounce() -> Duration {
    crate::search::DEFAULT_DEBOUNCE
}

fn default_min_search_length() -> usize {
    crate::search::MIN_QUERY_LEN
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Parse a duration string such as `"300ms"`, `"90s"` or `"5m"`. A bare
/// number is read as seconds.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let parser = DurationParser::with_time_units(&[
        TimeUnit::MilliSecond,
        TimeUnit::Second,
        TimeUnit::Minute,
        TimeUnit::Hour,
    ]);
    let parsed = parser
        .parse(input.trim())
        .map_err(|e| format!("invalid duration {input:?}: {e}"))?;
    Duration::try_from(parsed).map_err(|e| format!("invalid duration {input:?}: {e}"))
}

/// Accepts either a duration string or an integer number of seconds.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}
