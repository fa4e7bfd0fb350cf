use crate::core::rate::KeyRateProvider;
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

struct CachedRate {
    rate: Decimal,
    fetched_at: Instant,
}

/// Caches the key rate for a time-to-live. When the inner source fails, the
/// fallback rate is served and cached in its place.
pub struct CachingKeyRateProvider<T: KeyRateProvider> {
    inner: T,
    ttl: Duration,
    fallback: Decimal,
    cached: Mutex<Option<CachedRate>>,
}

impl<T: KeyRateProvider> CachingKeyRateProvider<T> {
    pub fn new(inner: T, ttl: Duration, fallback: Decimal) -> Self {
        Self {
            inner,
            ttl,
            fallback,
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<T: KeyRateProvider> KeyRateProvider for CachingKeyRateProvider<T> {
    async fn key_rate(&self) -> Result<Decimal> {
        // Held across the fetch so concurrent callers share a single request
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                debug!("Cache hit for key rate");
                return Ok(entry.rate);
            }
        }
        debug!("Cache miss for key rate");

        let rate = match self.inner.key_rate().await {
            Ok(rate) => {
                info!(%rate, "Fetched key rate");
                rate
            }
            Err(e) => {
                warn!(error = %e, fallback = %self.fallback, "Key rate unavailable, using fallback");
                self.fallback
            }
        };
        *cached = Some(CachedRate {
            rate,
            fetched_at: Instant::now(),
        });
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct MockInnerProvider {
        call_count: AtomicUsize,
        fail: bool,
    }

    impl MockInnerProvider {
        fn new(fail: bool) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl KeyRateProvider for &MockInnerProvider {
        async fn key_rate(&self) -> Result<Decimal> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(anyhow!("service unavailable"))
            } else {
                Ok(dec!(21))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_caching_key_rate_provider() {
        let inner_provider = MockInnerProvider::new(false);
        let caching_provider =
            CachingKeyRateProvider::new(&inner_provider, Duration::from_secs(3600), dec!(16));

        // First call - should hit inner provider
        assert_eq!(caching_provider.key_rate().await.unwrap(), dec!(21));
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 1);

        // Second call - should be cached
        assert_eq!(caching_provider.key_rate().await.unwrap(), dec!(21));
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 1);

        // After the TTL the rate is fetched again
        tokio::time::advance(Duration::from_secs(3601)).await;
        assert_eq!(caching_provider.key_rate().await.unwrap(), dec!(21));
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_serves_and_caches_fallback() {
        let inner_provider = MockInnerProvider::new(true);
        let caching_provider =
            CachingKeyRateProvider::new(&inner_provider, Duration::from_secs(3600), dec!(16));

        assert_eq!(caching_provider.key_rate().await.unwrap(), dec!(16));
        assert_eq!(caching_provider.key_rate().await.unwrap(), dec!(16));
        assert_eq!(inner_provider.call_count.load(Ordering::SeqCst), 1);
    }
}
