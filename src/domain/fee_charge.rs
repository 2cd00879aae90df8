use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cycle::CycleId;
use super::money::Money;
use crate::error::{Result, SettlementError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeeChargeStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Retrying,
}

/// Aggregated platform-fee collection against one professional for one cycle.
///
/// At most one charge exists per (professional, cycle) pair, enforced by the
/// store's unique insert. Collection follows
/// `Pending -> Processing -> Succeeded | Retrying`; a retrying charge is
/// picked up again once its backoff elapses, until attempts are exhausted
/// and the charge lands in terminal `Failed`. The `Processing` claim is a
/// compare-and-swap in the store, so overlapping runs cannot both submit
/// the same charge to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeCharge {
    pub id: Uuid,
    pub professional_id: Uuid,
    pub cycle_id: CycleId,
    pub total_fee: Money,
    pub status: FeeChargeStatus,
    pub attempts: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub gateway_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FeeCharge {
    pub fn new(
        professional_id: Uuid,
        cycle_id: CycleId,
        total_fee: Money,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            professional_id,
            cycle_id,
            total_fee,
            status: FeeChargeStatus::Pending,
            attempts: 0,
            last_attempt_at: None,
            last_error: None,
            gateway_reference: None,
            created_at: now,
        }
    }

    /// States a run may claim for processing.
    pub fn is_claimable(&self) -> bool {
        matches!(
            self.status,
            FeeChargeStatus::Pending | FeeChargeStatus::Retrying
        )
    }

    /// Marks the charge as claimed by the current run. Store adapters call
    /// this under their compare-and-swap guard.
    pub fn begin_processing(&mut self, now: DateTime<Utc>) {
        self.status = FeeChargeStatus::Processing;
        self.last_attempt_at = Some(now);
    }

    pub fn record_success(&mut self, reference: String, now: DateTime<Utc>) -> Result<()> {
        if self.status != FeeChargeStatus::Processing {
            return Err(SettlementError::Validation(format!(
                "charge {} cannot succeed from {:?}",
                self.id, self.status
            )));
        }
        self.status = FeeChargeStatus::Succeeded;
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.last_error = None;
        self.gateway_reference = Some(reference);
        Ok(())
    }

    /// Records a failed collection attempt. Returns the resulting status:
    /// `Retrying` while attempts remain, terminal `Failed` once exhausted.
    pub fn record_failure(
        &mut self,
        reason: &str,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<FeeChargeStatus> {
        if self.status != FeeChargeStatus::Processing {
            return Err(SettlementError::Validation(format!(
                "charge {} cannot fail from {:?}",
                self.id, self.status
            )));
        }
        self.attempts += 1;
        self.last_attempt_at = Some(now);
        self.last_error = Some(reason.to_string());
        self.status = if self.attempts >= max_attempts {
            FeeChargeStatus::Failed
        } else {
            FeeChargeStatus::Retrying
        };
        Ok(self.status)
    }

    pub fn is_due_for_retry(&self, backoff: Duration, now: DateTime<Utc>) -> bool {
        self.status == FeeChargeStatus::Retrying
            && self
                .last_attempt_at
                .is_some_and(|at| at + backoff <= now)
    }

    pub fn is_stuck(&self, threshold: Duration, now: DateTime<Utc>) -> bool {
        self.status == FeeChargeStatus::Processing
            && self
                .last_attempt_at
                .is_some_and(|at| at + threshold <= now)
    }
}
