//! TOML configuration for logs and traversal.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::entry_io::{DEFAULT_CONCURRENCY, FetchOptions};
use crate::error::LogError;

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StrandConfig {
    /// Append behaviour.
    pub log: LogSection,
    /// Ancestor traversal bounds.
    pub fetch: FetchSection,
}

/// `[log]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Ancestor pointers recorded per append. Defaults to 1.
    pub pointer_count: Option<usize>,
}

/// `[fetch]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FetchSection {
    /// Concurrent store reads. Defaults to 32.
    pub concurrency: Option<usize>,
    /// Entries to resolve per traversal. Unbounded if omitted.
    pub amount: Option<usize>,
    /// Traversal timeout in milliseconds. None if omitted.
    pub timeout_ms: Option<u64>,
}

impl StrandConfig {
    /// Load config from a TOML file, or use defaults if no path given.
    pub fn load(path: Option<&Path>) -> Result<Self, LogError> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)
                    .map_err(|e| LogError::Config(format!("{}: {e}", p.display())))?;
                Self::from_toml(&content)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml(s: &str) -> Result<Self, LogError> {
        Ok(toml::from_str(s)?)
    }

    /// Effective pointer count (at least 1).
    pub fn pointer_count(&self) -> usize {
        self.log.pointer_count.unwrap_or(1).max(1)
    }

    /// Effective read concurrency (at least 1).
    pub fn concurrency(&self) -> usize {
        self.fetch.concurrency.unwrap_or(DEFAULT_CONCURRENCY).max(1)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.fetch.timeout_ms.map(Duration::from_millis)
    }

    /// Traversal options built from the `[fetch]` section.
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            amount: self.fetch.amount,
            concurrency: self.concurrency(),
            timeout: self.timeout(),
            ..FetchOptions::default()
        }
    }
}
