//! Market-data provider adapters.
//!
//! Each adapter wraps one external quote feed behind the same contract:
//! given a normalized code, return a price or nothing. Transport errors
//! and malformed payloads are logged and converted to absence inside the
//! adapter; nothing propagates past its boundary.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;
use crate::error::Result;

pub mod mis;
pub mod yahoo;

pub use mis::MisQuoteProvider;
pub use yahoo::YahooQuoteProvider;

/// A resolved price with its provenance.
#[derive(Debug, Clone, Serialize)]
pub struct PriceQuote {
    pub price: f64,
    /// Name of the provider that produced the price.
    pub source: &'static str,
    pub fetched_at: DateTime<Local>,
}

impl PriceQuote {
    pub fn new(price: f64, source: &'static str) -> Self {
        Self {
            price,
            source,
            fetched_at: Local::now(),
        }
    }
}

/// One external quote source. Providers are held as an ordered list and
/// tried in priority order by the resolver.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this provider should be queried for the given normalized
    /// code. Only the primary exchange feed restricts by code shape.
    fn supports(&self, code: &str) -> bool {
        let _ = code;
        true
    }

    /// Fetch a price for a normalized code. Absence covers both "the
    /// feed has no data" and "the feed could not be reached".
    async fn fetch_price(&self, code: &str) -> Option<f64>;
}

/// Build the HTTP client shared by every adapter. The timeout bounds each
/// provider call so a hung feed cannot stall a batch.
pub fn shared_client(config: &Config) -> Result<Client> {
    let client = Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.providers.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Extract a finite numeric value from a JSON field that may arrive as a
/// number or as a numeric string. The feeds use `"-"` and empty strings
/// for "no data".
pub(crate) fn numeric_field(value: &Value) -> Option<f64> {
    if let Some(number) = value.as_f64() {
        return number.is_finite().then_some(number);
    }

    let text = value.as_str()?.trim();
    if text.is_empty() || text == "-" {
        return None;
    }

    text.parse::<f64>().ok().filter(|n| n.is_finite())
}
