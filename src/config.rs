//! Runtime configuration read from the environment (and `.env` via dotenvy).

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::jobs::record_formatter::CompletenessCheck;
use crate::models::ticker::MarketSuffix;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query2.finance.yahoo.com";
pub const DEFAULT_YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_FORMAT_CONCURRENCY: usize = 4;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_service_key: String,
    pub yahoo_base_url: String,
    pub yahoo_cookie_url: String,
    pub user_agent: String,
    pub market_suffix: MarketSuffix,
    pub http_timeout: Duration,
    pub format_concurrency: usize,
    pub completeness: CompletenessCheck,
}

impl Config {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through an arbitrary lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let supabase_url = get("SUPABASE_URL").ok_or(ConfigError::Missing("SUPABASE_URL"))?;
        let supabase_service_key = get("SUPABASE_SERVICE_ROLE_KEY")
            .ok_or(ConfigError::Missing("SUPABASE_SERVICE_ROLE_KEY"))?;

        let http_timeout_secs: u64 = parse_or(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            DEFAULT_HTTP_TIMEOUT_SECS,
        )?;

        let format_concurrency: usize = parse_or(
            "FORMAT_CONCURRENCY",
            get("FORMAT_CONCURRENCY"),
            DEFAULT_FORMAT_CONCURRENCY,
        )?;
        if format_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: "FORMAT_CONCURRENCY",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let completeness = match get("RECORD_COMPLETENESS") {
            Some(value) => CompletenessCheck::from_name(value.trim()).ok_or_else(|| {
                ConfigError::Invalid {
                    name: "RECORD_COMPLETENESS",
                    value: value.clone(),
                    reason: "expected trailing_peg_ratio or metadata_present".to_string(),
                }
            })?,
            None => CompletenessCheck::default(),
        };

        let market_suffix = match get("MARKET_SUFFIX") {
            Some(value) => MarketSuffix::new(value.trim()).ok_or_else(|| ConfigError::Invalid {
                name: "MARKET_SUFFIX",
                value: value.clone(),
                reason: "suffix must start with '.'".to_string(),
            })?,
            None => MarketSuffix::default(),
        };

        Ok(Self {
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_service_key,
            yahoo_base_url: get("YAHOO_BASE_URL")
                .unwrap_or_else(|| DEFAULT_YAHOO_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            yahoo_cookie_url: get("YAHOO_COOKIE_URL")
                .unwrap_or_else(|| DEFAULT_YAHOO_COOKIE_URL.to_string()),
            user_agent: get("USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            market_suffix,
            http_timeout: Duration::from_secs(http_timeout_secs),
            format_concurrency,
            completeness,
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: value.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
