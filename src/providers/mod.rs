pub mod caching;
pub mod rate_service;
pub mod util;

use crate::core::config::RatesConfig;
use crate::core::rate::{FixedKeyRate, KeyRateProvider};
use caching::CachingKeyRateProvider;
use rate_service::RateServiceProvider;
use std::sync::Arc;

/// Builds the key-rate source described by the `rates` configuration section.
pub fn key_rate_provider(config: &RatesConfig) -> Arc<dyn KeyRateProvider> {
    match &config.base_url {
        Some(base_url) => Arc::new(CachingKeyRateProvider::new(
            RateServiceProvider::new(base_url),
            config.cache_ttl(),
            config.fallback_key_rate,
        )),
        None => Arc::new(FixedKeyRate(config.default_key_rate)),
    }
}
