//! Short-lived in-memory cache of resolved quotes, keyed by normalized
//! code.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::provider::PriceQuote;

struct CacheEntry {
    quote: PriceQuote,
    inserted_at: Instant,
}

/// Process-wide quote cache with a fixed TTL. Entries past the TTL are
/// treated as a miss on read and overwritten by the next successful
/// resolution; there is no background sweep.
pub struct PriceCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached quote for `code` if it is still within the TTL
    /// window. Stale entries are left in place.
    pub fn get(&self, code: &str) -> Option<PriceQuote> {
        let entries = self.entries.lock().unwrap();
        let entry = entries.get(code)?;

        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }

        Some(entry.quote.clone())
    }

    /// Insert or overwrite the quote for `code`, restarting its TTL.
    pub fn put(&self, code: &str, quote: PriceQuote) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(
            code.to_string(),
            CacheEntry {
                quote,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Drop every entry. Idempotent; used for operational resets.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
