use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::confirmation::{Confirmation, ConfirmationStatus};
use super::cycle::CycleId;
use super::earning::{Earning, EarningStatus};
use super::fee_charge::{FeeCharge, FeeChargeStatus};
use super::money::Money;
use super::session::AppointmentSession;
use crate::error::Result;

/// Outcome of an idempotent insert against a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Completed sessions whose end time has passed as of `as_of`.
    async fn completed_ended_before(&self, as_of: DateTime<Utc>) -> Result<Vec<AppointmentSession>>;
    async fn get(&self, session_id: Uuid) -> Result<Option<AppointmentSession>>;
}

#[async_trait]
pub trait ConfirmationStore: Send + Sync {
    /// Inserts unless a confirmation for the same session already exists.
    async fn insert_unique(&self, confirmation: Confirmation) -> Result<InsertOutcome>;
    async fn get(&self, id: Uuid) -> Result<Option<Confirmation>>;
    /// Pending confirmations whose resolution deadline has passed.
    async fn pending_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Confirmation>>;
    /// Confirmations in a confirmed-equivalent state.
    async fn resolved(&self) -> Result<Vec<Confirmation>>;
    /// Conditional status transition; returns false if the current status no
    /// longer matches `from` (another run got there first).
    async fn transition(
        &self,
        id: Uuid,
        from: ConfirmationStatus,
        to: ConfirmationStatus,
        at: DateTime<Utc>,
    ) -> Result<bool>;
}

#[async_trait]
pub trait EarningStore: Send + Sync {
    /// Inserts unless an earning for the same confirmation already exists.
    async fn insert_unique(&self, earning: Earning) -> Result<InsertOutcome>;
    async fn pending_charge(&self) -> Result<Vec<Earning>>;
    async fn for_cycle(&self, cycle_id: &CycleId, professional_id: Uuid) -> Result<Vec<Earning>>;
    /// Moves every earning of one (professional, cycle) pair from one status
    /// to another; returns the number updated.
    async fn set_status_for_pair(
        &self,
        professional_id: Uuid,
        cycle_id: &CycleId,
        from: EarningStatus,
        to: EarningStatus,
    ) -> Result<u64>;
}

#[async_trait]
pub trait FeeChargeStore: Send + Sync {
    /// Inserts unless a charge for the same (professional, cycle) pair
    /// already exists.
    async fn insert_unique(&self, charge: FeeCharge) -> Result<InsertOutcome>;
    async fn get(&self, id: Uuid) -> Result<Option<FeeCharge>>;
    async fn in_status(&self, status: FeeChargeStatus) -> Result<Vec<FeeCharge>>;
    /// Atomically claims a charge for processing: succeeds only when the
    /// charge is still in a claimable state, marking it `Processing` and
    /// returning the claimed row. `None` means another run won the claim.
    async fn claim(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<FeeCharge>>;
    /// Conditional status transition; returns false when the current status
    /// no longer matches `from`.
    async fn transition(
        &self,
        id: Uuid,
        from: FeeChargeStatus,
        to: FeeChargeStatus,
    ) -> Result<bool>;
    /// Persists the outcome recorded on a charge the caller has claimed.
    async fn update(&self, charge: FeeCharge) -> Result<()>;
}

/// Receipt returned by the gateway for a successful collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReceipt {
    pub reference: String,
}

/// External payment processor collecting platform fees from the
/// professional's on-file payment method. The gateway may not be idempotent;
/// the fee-charge claim protocol is what prevents duplicate submission.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn collect(&self, professional_id: Uuid, amount: Money) -> Result<CollectionReceipt>;
}

/// Fire-and-forget notification sink for charge outcomes. Implementations
/// swallow their own failures; a broken notifier never fails a payment run.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn charge_succeeded(&self, charge: &FeeCharge);
    async fn charge_failed(&self, charge: &FeeCharge, reason: &str);
}

pub type SessionStoreRef = Arc<dyn SessionStore>;
pub type ConfirmationStoreRef = Arc<dyn ConfirmationStore>;
pub type EarningStoreRef = Arc<dyn EarningStore>;
pub type FeeChargeStoreRef = Arc<dyn FeeChargeStore>;
pub type PaymentGatewayRef = Arc<dyn PaymentGateway>;
pub type NotifierRef = Arc<dyn Notifier>;
