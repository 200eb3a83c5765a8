//! Adapter over the TWSE MIS real-time quote endpoint, which serves both
//! the primary exchange (`tse`) and the alternate market (`otc`) behind
//! one URL scheme.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::REFERER;
use reqwest::Client;
use serde_json::Value;

use crate::code::is_listed_equity;
use crate::config::Config;
use crate::error::{Context, Result};
use crate::provider::{numeric_field, QuoteProvider};

const MIS_REFERER: &str = "https://mis.twse.com.tw/stock/index.jsp";

/// Market segment tag carried in the `ex_ch` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MisMarket {
    Tse,
    Otc,
}

impl MisMarket {
    fn tag(self) -> &'static str {
        match self {
            MisMarket::Tse => "tse",
            MisMarket::Otc => "otc",
        }
    }
}

/// Real-time quote adapter for one MIS market segment. The `tse` instance
/// is the primary feed and only accepts listed-equity shaped codes; the
/// `otc` instance is the secondary feed and is tried for any code.
pub struct MisQuoteProvider {
    client: Client,
    endpoint: String,
    market: MisMarket,
}

impl MisQuoteProvider {
    pub fn tse(client: Client, config: &Config) -> Self {
        Self::with_market(client, config, MisMarket::Tse)
    }

    pub fn otc(client: Client, config: &Config) -> Self {
        Self::with_market(client, config, MisMarket::Otc)
    }

    fn with_market(client: Client, config: &Config, market: MisMarket) -> Self {
        Self {
            client,
            endpoint: config.providers.mis_endpoint.clone(),
            market,
        }
    }

    async fn request_quote(&self, code: &str) -> Result<Option<f64>> {
        let url = format!(
            "{}?ex_ch={}_{}.tw&json=1&delay=0",
            self.endpoint,
            self.market.tag(),
            code
        );

        let response = self
            .client
            .get(&url)
            .header(REFERER, MIS_REFERER)
            .send()
            .await?
            .error_for_status()?;

        let payload: Value = response.json().await.context("Failed to parse MIS JSON")?;
        Ok(parse_mis_payload(&payload))
    }
}

#[async_trait]
impl QuoteProvider for MisQuoteProvider {
    fn name(&self) -> &'static str {
        match self.market {
            MisMarket::Tse => "twse",
            MisMarket::Otc => "tpex",
        }
    }

    fn supports(&self, code: &str) -> bool {
        match self.market {
            MisMarket::Tse => is_listed_equity(code),
            MisMarket::Otc => true,
        }
    }

    async fn fetch_price(&self, code: &str) -> Option<f64> {
        match self.request_quote(code).await {
            Ok(Some(price)) => {
                debug!("{} returned {} for {}", self.name(), price, code);
                Some(price)
            }
            Ok(None) => {
                debug!("{} has no price for {}", self.name(), code);
                None
            }
            Err(err) => {
                warn!("{} request failed for {}: {}", self.name(), code, err);
                None
            }
        }
    }
}

/// Pull a price out of a MIS quote payload: last-traded field `z`, falling
/// back to previous-close field `y` when the market has not traded.
fn parse_mis_payload(payload: &Value) -> Option<f64> {
    let quote = payload["msgArray"].as_array()?.first()?;
    numeric_field(&quote["z"]).or_else(|| numeric_field(&quote["y"]))
}
