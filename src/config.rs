use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::batch::BatchOptions;
use crate::error::{Context, Result};
use crate::retry::RetryPolicy;

/// Tuning knobs for the resolution pipeline. `builtin()` carries the
/// deployed defaults; a JSON file with any subset of the fields can
/// override them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum age of a cached quote before it is treated as stale.
    pub cache_ttl_secs: u64,
    /// Codes resolved per batch; also the concurrency cap within a batch.
    pub batch_size: usize,
    /// Pause between consecutive batches, to stay friendly to the feeds.
    pub batch_pause_ms: u64,
    /// Upper bound on any single provider request.
    pub request_timeout_secs: u64,
    pub retry: RetryConfig,
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Full passes over the provider chain per code.
    pub max_attempts: usize,
    /// Base delay for the linear backoff between passes.
    pub base_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Real-time quote endpoint shared by the exchange feeds.
    pub mis_endpoint: String,
    /// Quote endpoint of the general fallback service.
    pub yahoo_endpoint: String,
    /// Market suffix appended to purely numeric codes for the fallback
    /// service.
    pub numeric_symbol_suffix: String,
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 20,
            batch_size: 10,
            batch_pause_ms: 300,
            request_timeout_secs: 10,
            retry: RetryConfig::default(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 500,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            mis_endpoint: "https://mis.twse.com.tw/stock/api/getStockInfo.jsp".to_string(),
            yahoo_endpoint: "https://query1.finance.yahoo.com/v7/finance/quote".to_string(),
            numeric_symbol_suffix: ".TW".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
        }
    }
}

impl Config {
    pub fn builtin() -> Self {
        Self::default()
    }

    /// Load overrides from a JSON file; absent fields keep their builtin
    /// values.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(raw).context("Failed to parse config JSON")?;
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            batch_size: self.batch_size,
            pause: Duration::from_millis(self.batch_pause_ms),
        }
    }
}
