//! Service configuration from environment variables.

use std::str::FromStr;

pub const LATEST_LIMIT_ENV: &str = "STOCKLEDGER_LATEST_LIMIT";
pub const MAX_CONFLICT_RETRIES_ENV: &str = "STOCKLEDGER_MAX_CONFLICT_RETRIES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Size of the "latest products" list.
    pub latest_products_limit: usize,
    /// Re-reads allowed when a concurrent adjustment wins the version race.
    pub max_conflict_retries: u32,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            latest_products_limit: 3,
            max_conflict_retries: 5,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset keys keep their default;
    /// unparsable ones keep it too, with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let latest_products_limit =
            read(&lookup, LATEST_LIMIT_ENV, defaults.latest_products_limit).max(1);
        Self {
            latest_products_limit,
            max_conflict_retries: read(&lookup, MAX_CONFLICT_RETRIES_ENV, defaults.max_conflict_retries),
        }
    }
}

fn read<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr + Copy + core::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, %default, "unparsable config value; using default");
            default
        }),
    }
}
