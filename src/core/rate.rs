//! Key-rate abstractions

use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Opaque source of the central bank key rate, in percent.
#[async_trait]
pub trait KeyRateProvider: Send + Sync {
    async fn key_rate(&self) -> Result<Decimal>;
}

/// Always answers with the configured rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedKeyRate(pub Decimal);

#[async_trait]
impl KeyRateProvider for FixedKeyRate {
    async fn key_rate(&self) -> Result<Decimal> {
        Ok(self.0)
    }
}
