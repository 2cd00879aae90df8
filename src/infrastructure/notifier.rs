use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::fee_charge::FeeCharge;
use crate::domain::ports::Notifier;

/// Notifier that logs charge outcomes instead of delivering them.
///
/// Stands in for the marketplace's email/push pipeline; deployments plug in
/// their own `Notifier`. Either way the calls stay fire-and-forget.
#[derive(Default, Clone)]
pub struct TracingNotifier;

impl TracingNotifier {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    async fn charge_succeeded(&self, charge: &FeeCharge) {
        info!(
            charge_id = %charge.id,
            professional_id = %charge.professional_id,
            amount = %charge.total_fee,
            "notify: platform fee collected"
        );
    }

    async fn charge_failed(&self, charge: &FeeCharge, reason: &str) {
        warn!(
            charge_id = %charge.id,
            professional_id = %charge.professional_id,
            attempts = charge.attempts,
            "notify: platform fee collection failed: {reason}"
        );
    }
}
