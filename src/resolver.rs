//! Per-code orchestration: cache check, ordered provider fallback,
//! retry-with-backoff, cache write-through.

use std::sync::Arc;

use log::debug;

use crate::cache::PriceCache;
use crate::config::Config;
use crate::error::Result;
use crate::provider::{
    shared_client, MisQuoteProvider, PriceQuote, QuoteProvider, YahooQuoteProvider,
};
use crate::retry::{self, RetryPolicy};

/// Resolves one normalized code to a price by walking the provider list
/// in priority order. The cache is the only shared mutable state; it is
/// read before any provider call and written only on success.
pub struct Resolver {
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: Arc<PriceCache>,
    retry: RetryPolicy,
}

impl Resolver {
    /// Build the deployed provider chain: primary exchange feed, alternate
    /// market feed, then the general quote service.
    pub fn new(config: &Config) -> Result<Self> {
        let client = shared_client(config)?;

        let providers: Vec<Arc<dyn QuoteProvider>> = vec![
            Arc::new(MisQuoteProvider::tse(client.clone(), config)),
            Arc::new(MisQuoteProvider::otc(client.clone(), config)),
            Arc::new(YahooQuoteProvider::new(client, config)),
        ];

        Ok(Self::with_providers(
            providers,
            Arc::new(PriceCache::new(config.cache_ttl())),
            config.retry_policy(),
        ))
    }

    /// Assemble a resolver from explicit parts. Also the seam the tests
    /// use to inject fake providers.
    pub fn with_providers(
        providers: Vec<Arc<dyn QuoteProvider>>,
        cache: Arc<PriceCache>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            providers,
            cache,
            retry,
        }
    }

    pub fn cache(&self) -> &Arc<PriceCache> {
        &self.cache
    }

    /// Resolve a price for one normalized code. Returns `None` when no
    /// provider had data after exhausting all retry attempts; never errors.
    pub async fn resolve(&self, code: &str) -> Option<PriceQuote> {
        if let Some(quote) = self.cache.get(code) {
            debug!("cache hit for {} ({})", code, quote.source);
            return Some(quote);
        }

        let quote = retry::with_backoff(&self.retry, || self.try_providers(code)).await?;

        self.cache.put(code, quote.clone());
        Some(quote)
    }

    /// One pass over the provider chain in priority order. Adapters whose
    /// `supports` rejects the code are skipped.
    async fn try_providers(&self, code: &str) -> Option<PriceQuote> {
        for provider in &self.providers {
            if !provider.supports(code) {
                continue;
            }

            if let Some(price) = provider.fetch_price(code).await {
                return Some(PriceQuote::new(price, provider.name()));
            }

            debug!("{} yielded nothing for {}, trying next", provider.name(), code);
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted provider: returns `price` after `fail_first` calls have
    /// yielded nothing, counts invocations, and records its name in a
    /// shared call log.
    struct FakeProvider {
        name: &'static str,
        price: Option<f64>,
        fail_first: usize,
        only_listed: bool,
        calls: AtomicUsize,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeProvider {
        fn new(name: &'static str, price: Option<f64>, log: Arc<Mutex<Vec<&'static str>>>) -> Self {
            Self {
                name,
                price,
                fail_first: 0,
                only_listed: false,
                calls: AtomicUsize::new(0),
                log,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteProvider for FakeProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn supports(&self, code: &str) -> bool {
            !self.only_listed || crate::code::is_listed_equity(code)
        }

        async fn fetch_price(&self, _code: &str) -> Option<f64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            self.log.lock().unwrap().push(self.name);

            if call < self.fail_first {
                return None;
            }
            self.price
        }
    }

    fn instant_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    fn resolver_with(
        providers: Vec<Arc<dyn QuoteProvider>>,
        ttl: Duration,
        retry: RetryPolicy,
    ) -> Resolver {
        Resolver::with_providers(providers, Arc::new(PriceCache::new(ttl)), retry)
    }

    #[tokio::test]
    async fn cached_code_skips_every_provider() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(FakeProvider::new("primary", Some(605.0), log));
        let resolver = resolver_with(
            vec![provider.clone()],
            Duration::from_secs(60),
            instant_retry(2),
        );

        let first = resolver.resolve("2330").await.expect("first resolve");
        assert_eq!(first.price, 605.0);
        assert_eq!(provider.calls(), 1);

        let second = resolver.resolve("2330").await.expect("cached resolve");
        assert_eq!(second.price, 605.0);
        // still one call: the cache short-circuited the provider chain
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_refetch_and_overwrite() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(FakeProvider::new("primary", Some(605.0), log));
        let resolver = resolver_with(
            vec![provider.clone()],
            Duration::from_millis(10),
            instant_retry(1),
        );

        resolver.resolve("2330").await.expect("first resolve");
        tokio::time::sleep(Duration::from_millis(25)).await;

        resolver.resolve("2330").await.expect("resolve after expiry");
        assert_eq!(provider.calls(), 2);
        // the refetch rewrote the entry, so it is fresh again
        assert!(resolver.cache().get("2330").is_some());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn falls_through_to_the_last_provider_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = Arc::new(FakeProvider {
            only_listed: true,
            ..FakeProvider::new("primary", None, log.clone())
        });
        let secondary = Arc::new(FakeProvider::new("secondary", None, log.clone()));
        let fallback = Arc::new(FakeProvider::new("fallback", Some(42.5), log.clone()));

        let resolver = resolver_with(
            vec![primary.clone(), secondary.clone(), fallback.clone()],
            Duration::from_secs(60),
            instant_retry(1),
        );

        let quote = resolver.resolve("2330").await.expect("fallback resolves");
        assert_eq!(quote.price, 42.5);
        assert_eq!(quote.source, "fallback");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["primary", "secondary", "fallback"]
        );
    }

    #[tokio::test]
    async fn non_equity_codes_skip_the_primary_feed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let primary = Arc::new(FakeProvider {
            only_listed: true,
            ..FakeProvider::new("primary", Some(1.0), log.clone())
        });
        let fallback = Arc::new(FakeProvider::new("fallback", Some(189.5), log.clone()));

        let resolver = resolver_with(
            vec![primary.clone(), fallback.clone()],
            Duration::from_secs(60),
            instant_retry(1),
        );

        let quote = resolver.resolve("AAPL").await.expect("fallback resolves");
        assert_eq!(quote.source, "fallback");
        assert_eq!(primary.calls(), 0);
    }

    #[tokio::test]
    async fn exhausted_retries_yield_absence_without_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(FakeProvider::new("primary", None, log));
        let resolver = resolver_with(
            vec![provider.clone()],
            Duration::from_secs(60),
            instant_retry(2),
        );

        assert!(resolver.resolve("2330").await.is_none());
        // two full passes over the chain, one per retry attempt
        assert_eq!(provider.calls(), 2);
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn transient_failure_recovers_on_the_second_attempt() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let provider = Arc::new(FakeProvider {
            fail_first: 1,
            ..FakeProvider::new("primary", Some(605.0), log)
        });
        let resolver = resolver_with(
            vec![provider.clone()],
            Duration::from_secs(60),
            instant_retry(2),
        );

        let quote = resolver.resolve("2330").await.expect("second pass succeeds");
        assert_eq!(quote.price, 605.0);
        assert_eq!(provider.calls(), 2);
        assert!(resolver.cache().get("2330").is_some());
    }
}
