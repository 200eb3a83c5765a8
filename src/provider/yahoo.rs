//! General-purpose quote adapter used as the last link in the fallback
//! chain. Accepts any code the exchange feeds could not resolve.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::Value;

use crate::config::Config;
use crate::error::{Context, Result};
use crate::provider::{numeric_field, QuoteProvider};

/// Price fields checked in order; the first non-null numeric one wins.
const PRICE_FIELDS: [&str; 5] = [
    "regularMarketPrice",
    "postMarketPrice",
    "preMarketPrice",
    "regularMarketPreviousClose",
    "previousClose",
];

pub struct YahooQuoteProvider {
    client: Client,
    endpoint: String,
    numeric_symbol_suffix: String,
}

impl YahooQuoteProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            endpoint: config.providers.yahoo_endpoint.clone(),
            numeric_symbol_suffix: config.providers.numeric_symbol_suffix.clone(),
        }
    }

    /// Purely numeric codes are assumed to be domestic listed equities and
    /// get the market suffix; anything else is passed through verbatim.
    fn symbol_for(&self, code: &str) -> String {
        if !code.is_empty() && code.bytes().all(|b| b.is_ascii_digit()) {
            format!("{}{}", code, self.numeric_symbol_suffix)
        } else {
            code.to_string()
        }
    }

    async fn request_quote(&self, code: &str) -> Result<Option<f64>> {
        let symbol = self.symbol_for(code);
        let url = format!("{}?symbols={}", self.endpoint, symbol);

        let response = self.client.get(&url).send().await?.error_for_status()?;
        let payload: Value = response
            .json()
            .await
            .context("Failed to parse quote JSON")?;

        Ok(parse_quote_payload(&payload))
    }
}

#[async_trait]
impl QuoteProvider for YahooQuoteProvider {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_price(&self, code: &str) -> Option<f64> {
        match self.request_quote(code).await {
            Ok(Some(price)) => {
                debug!("yahoo returned {} for {}", price, code);
                Some(price)
            }
            Ok(None) => {
                debug!("yahoo has no price for {}", code);
                None
            }
            Err(err) => {
                warn!("yahoo request failed for {}: {}", code, err);
                None
            }
        }
    }
}

fn parse_quote_payload(payload: &Value) -> Option<f64> {
    let result = payload["quoteResponse"]["result"].as_array()?.first()?;

    PRICE_FIELDS
        .iter()
        .find_map(|field| numeric_field(&result[*field]))
}
