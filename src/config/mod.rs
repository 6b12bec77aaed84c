//! Configuration management
//!
//! The data layer does not interpret connection parameters itself; it hands
//! them to the store executor. Only the second-pass join tuning and the
//! default page size are read by the core.

use std::env;

use anyhow::{Context, Result, bail};

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the SPARQL store
    pub store_url: String,

    /// Logical database name sent with every request
    pub store_database: String,

    /// Basic auth user name
    pub store_username: Option<String>,

    /// Basic auth password
    pub store_password: Option<String>,

    /// HTTP timeout for a single store request
    pub store_timeout_secs: u64,

    /// Number of IRIs bound per batched second-pass query
    pub related_batch_size: usize,

    /// Number of second-pass batches in flight at once
    pub related_concurrency: usize,

    /// Page size applied when the caller gives no `first` (None = everything)
    pub default_page_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_url: "http://localhost:5820".to_string(),
            store_database: "cyio".to_string(),
            store_username: None,
            store_password: None,
            store_timeout_secs: 30,
            related_batch_size: 50,
            related_concurrency: 4,
            default_page_size: None,
        }
    }
}

impl Config {
    /// Load `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_source<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let related_batch_size = match lookup("RELATED_BATCH_SIZE") {
            Some(v) => v.parse().context("Invalid RELATED_BATCH_SIZE")?,
            None => defaults.related_batch_size,
        };
        let related_concurrency = match lookup("RELATED_CONCURRENCY") {
            Some(v) => v.parse().context("Invalid RELATED_CONCURRENCY")?,
            None => defaults.related_concurrency,
        };
        if related_batch_size == 0 || related_concurrency == 0 {
            bail!("RELATED_BATCH_SIZE and RELATED_CONCURRENCY must be greater than zero");
        }

        Ok(Self {
            store_url: lookup("STORE_URL").unwrap_or(defaults.store_url),

            store_database: lookup("STORE_DATABASE").unwrap_or(defaults.store_database),

            store_username: lookup("STORE_USERNAME").filter(|v| !v.is_empty()),

            store_password: lookup("STORE_PASSWORD").filter(|v| !v.is_empty()),

            store_timeout_secs: match lookup("STORE_TIMEOUT_SECS") {
                Some(v) => v.parse().context("Invalid STORE_TIMEOUT_SECS")?,
                None => defaults.store_timeout_secs,
            },

            related_batch_size,

            related_concurrency,

            default_page_size: match lookup("DEFAULT_PAGE_SIZE") {
                Some(v) if !v.is_empty() => {
                    Some(v.parse().context("Invalid DEFAULT_PAGE_SIZE")?)
                }
                _ => defaults.default_page_size,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_source(lookup_from(&[])).unwrap();
        assert_eq!(config.store_url, "http://localhost:5820");
        assert_eq!(config.store_database, "cyio");
        assert_eq!(config.related_batch_size, 50);
        assert_eq!(config.default_page_size, None);
    }

    #[test]
    fn test_values_are_read() {
        let config = Config::from_source(lookup_from(&[
            ("STORE_URL", "https://store.internal:5820"),
            ("STORE_DATABASE", "inventory"),
            ("STORE_USERNAME", "admin"),
            ("RELATED_CONCURRENCY", "8"),
            ("DEFAULT_PAGE_SIZE", "25"),
        ]))
        .unwrap();
        assert_eq!(config.store_database, "inventory");
        assert_eq!(config.store_username.as_deref(), Some("admin"));
        assert_eq!(config.store_password, None);
        assert_eq!(config.related_concurrency, 8);
        assert_eq!(config.default_page_size, Some(25));
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        assert!(Config::from_source(lookup_from(&[("STORE_TIMEOUT_SECS", "soon")])).is_err());
        assert!(Config::from_source(lookup_from(&[("RELATED_BATCH_SIZE", "0")])).is_err());
    }
}
