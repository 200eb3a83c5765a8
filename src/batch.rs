//! Batched fan-out over arbitrary-length code lists.
//!
//! Raw codes are normalized and deduplicated, then resolved in fixed-size
//! batches. Codes within a batch run concurrently (the batch size is also
//! the concurrency cap); batches run strictly one after another with a
//! short pause in between to respect provider rate limits.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use log::{debug, info};
use tokio::time::sleep;

use crate::code::normalize_code;
use crate::provider::PriceQuote;
use crate::resolver::Resolver;

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Codes per batch; doubles as the concurrency cap within a batch.
    pub batch_size: usize,
    /// Pause inserted before every batch after the first.
    pub pause: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            pause: Duration::from_millis(300),
        }
    }
}

/// Resolve every distinct normalized code in `raw_codes` and return the
/// resulting mapping.
///
/// Codes with no resolvable price are omitted from the mapping; the
/// operation itself never fails, so total provider outage degrades to an
/// empty result.
pub async fn resolve_all(
    resolver: &Resolver,
    raw_codes: &[String],
    options: &BatchOptions,
) -> HashMap<String, PriceQuote> {
    let codes = dedupe_codes(raw_codes);
    if codes.is_empty() {
        return HashMap::new();
    }

    let batch_size = options.batch_size.max(1);
    let batch_count = codes.len().div_ceil(batch_size);
    info!(
        "resolving {} codes in {} batches of up to {}",
        codes.len(),
        batch_count,
        batch_size
    );

    let mut prices = HashMap::new();

    for (index, batch) in codes.chunks(batch_size).enumerate() {
        if index > 0 && !options.pause.is_zero() {
            sleep(options.pause).await;
        }

        let resolved = resolve_batch(resolver, batch).await;
        debug!(
            "batch {}/{}: {} of {} codes resolved",
            index + 1,
            batch_count,
            resolved.len(),
            batch.len()
        );
        prices.extend(resolved);
    }

    info!("resolved {} of {} codes", prices.len(), codes.len());
    prices
}

/// Resolve one batch concurrently. Completion order within the batch is
/// not significant; results are keyed by code.
async fn resolve_batch(resolver: &Resolver, batch: &[String]) -> Vec<(String, PriceQuote)> {
    stream::iter(batch)
        .map(|code| async move {
            let quote = resolver.resolve(code).await;
            quote.map(|quote| (code.clone(), quote))
        })
        .buffer_unordered(batch.len().max(1))
        .filter_map(|resolved| async move { resolved })
        .collect()
        .await
}

/// Normalize, drop empties, and deduplicate while preserving first-seen
/// order.
fn dedupe_codes(raw_codes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut codes = Vec::new();

    for raw in raw_codes {
        let code = normalize_code(raw);
        if code.is_empty() {
            continue;
        }
        if seen.insert(code.clone()) {
            codes.push(code);
        }
    }

    codes
}
