use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::confirmation::Confirmation;
use super::cycle::CycleId;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarningStatus {
    PendingCharge,
    Charged,
    Failed,
}

/// Per-session financial record derived from a resolved confirmation.
///
/// One earning exists per qualifying confirmation (unique insert on the
/// confirmation id). The amounts always satisfy `gross == net + platform_fee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Earning {
    pub id: Uuid,
    pub confirmation_id: Uuid,
    pub professional_id: Uuid,
    pub cycle_id: CycleId,
    pub gross: Money,
    pub platform_fee: Money,
    pub net: Money,
    pub status: EarningStatus,
}

impl Earning {
    /// Derives the earning for a resolved confirmation. The net amount is
    /// computed from gross and fee, so the amount invariant holds by
    /// construction.
    pub fn from_confirmation(confirmation: &Confirmation, gross: Money, platform_fee: Money) -> Self {
        Self {
            id: Uuid::new_v4(),
            confirmation_id: confirmation.id,
            professional_id: confirmation.professional_id,
            cycle_id: confirmation.cycle_id,
            gross,
            platform_fee,
            net: gross - platform_fee,
            status: EarningStatus::PendingCharge,
        }
    }
}
