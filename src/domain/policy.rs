use std::sync::Arc;

use chrono::Duration;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::money::Money;
use crate::error::{Result, SettlementError};

/// Business policy computing the platform fee for a gross session amount.
///
/// The fee schedule is an external business input (flat percentage, tiered
/// by volume, per-professional overrides), so the engine only depends on
/// this trait.
pub trait FeePolicy: Send + Sync {
    fn platform_fee(&self, professional_id: Uuid, gross: Money) -> Money;
}

pub type FeePolicyRef = Arc<dyn FeePolicy>;

/// Flat percentage fee, rounded to cents.
pub struct FlatRatePolicy {
    rate: Decimal,
}

impl FlatRatePolicy {
    pub fn new(rate: Decimal) -> Result<Self> {
        if rate < Decimal::ZERO || rate > Decimal::ONE {
            return Err(SettlementError::Validation(format!(
                "fee rate must be within [0, 1], got {rate}"
            )));
        }
        Ok(Self { rate })
    }
}

impl FeePolicy for FlatRatePolicy {
    fn platform_fee(&self, _professional_id: Uuid, gross: Money) -> Money {
        gross.percent_of(self.rate)
    }
}

/// Bounds on collection attempts and the spacing between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::days(1),
        }
    }
}
