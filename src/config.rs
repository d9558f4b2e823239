//! Configuration management for the quote engine

use serde::Deserialize;
use std::env;

use crate::anchor::LocatorStrategy;
use crate::error::{Error, Result};
use crate::marks::MarkConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub marks: MarkConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    pub locator_strategy: LocatorStrategy,
    /// Selection debounce window in milliseconds
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub database_url: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            locator_strategy: LocatorStrategy::Text,
            debounce_ms: 500,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        FetchConfig {
            timeout_secs: 10,
            user_agent: concat!("quote-anchor/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            database_url: "sqlite:./quotes.db".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Config::default();

        let locator_strategy = match lookup("QUOTE_LOCATOR_STRATEGY") {
            Some(value) => value.parse().map_err(Error::Config)?,
            None => defaults.engine.locator_strategy,
        };

        Ok(Config {
            engine: EngineConfig {
                locator_strategy,
                debounce_ms: parse_or("QUOTE_DEBOUNCE_MS", &lookup, defaults.engine.debounce_ms)?,
            },
            marks: MarkConfig {
                class_prefix: lookup("QUOTE_MARK_CLASS").unwrap_or(defaults.marks.class_prefix),
                include_inline_styles: parse_or(
                    "QUOTE_MARK_INLINE_STYLES",
                    &lookup,
                    defaults.marks.include_inline_styles,
                )?,
                ..defaults.marks
            },
            fetch: FetchConfig {
                timeout_secs: parse_or("QUOTE_FETCH_TIMEOUT_SECS", &lookup, defaults.fetch.timeout_secs)?,
                user_agent: lookup("QUOTE_FETCH_USER_AGENT").unwrap_or(defaults.fetch.user_agent),
            },
            store: StoreConfig {
                database_url: lookup("DATABASE_URL").unwrap_or(defaults.store.database_url),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &str,
    lookup: &impl Fn(&str) -> Option<String>,
    default: T,
) -> Result<T> {
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {}: {}", key, value))),
        None => Ok(default),
    }
}
