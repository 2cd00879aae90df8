use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::confirmation::{Confirmation, ConfirmationStatus};
use crate::domain::cycle::CycleId;
use crate::domain::earning::{Earning, EarningStatus};
use crate::domain::fee_charge::{FeeCharge, FeeChargeStatus};
use crate::domain::ports::{
    ConfirmationStore, EarningStore, FeeChargeStore, InsertOutcome, SessionStore,
};
use crate::domain::session::AppointmentSession;
use crate::error::Result;

/// In-memory session view, seeded by tests or a local deployment.
///
/// Uses `Arc<RwLock<HashMap>>` for shared concurrent access, with uniqueness
/// and conditional updates performed under the write lock so they behave
/// like the constraint-backed operations of a relational store.
#[derive(Default, Clone)]
pub struct InMemorySessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, AppointmentSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session: AppointmentSession) {
        self.sessions.write().await.insert(session.id, session);
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn completed_ended_before(&self, as_of: DateTime<Utc>) -> Result<Vec<AppointmentSession>> {
        let sessions = self.sessions.read().await;
        Ok(sessions
            .values()
            .filter(|s| s.completed && s.has_ended_by(as_of))
            .cloned()
            .collect())
    }

    async fn get(&self, session_id: Uuid) -> Result<Option<AppointmentSession>> {
        Ok(self.sessions.read().await.get(&session_id).cloned())
    }
}

/// In-memory confirmation store with a unique index on the session id.
#[derive(Default, Clone)]
pub struct InMemoryConfirmationStore {
    inner: Arc<RwLock<ConfirmationRows>>,
}

#[derive(Default)]
struct ConfirmationRows {
    by_id: HashMap<Uuid, Confirmation>,
    by_session: HashMap<Uuid, Uuid>,
}

impl InMemoryConfirmationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConfirmationStore for InMemoryConfirmationStore {
    async fn insert_unique(&self, confirmation: Confirmation) -> Result<InsertOutcome> {
        let mut rows = self.inner.write().await;
        if rows.by_session.contains_key(&confirmation.session_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.by_session
            .insert(confirmation.session_id, confirmation.id);
        rows.by_id.insert(confirmation.id, confirmation);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Confirmation>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn pending_expired(&self, as_of: DateTime<Utc>) -> Result<Vec<Confirmation>> {
        let rows = self.inner.read().await;
        Ok(rows
            .by_id
            .values()
            .filter(|c| c.is_expired(as_of))
            .cloned()
            .collect())
    }

    async fn resolved(&self) -> Result<Vec<Confirmation>> {
        let rows = self.inner.read().await;
        Ok(rows
            .by_id
            .values()
            .filter(|c| c.status.counts_for_earnings())
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        id: Uuid,
        from: ConfirmationStatus,
        to: ConfirmationStatus,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut rows = self.inner.write().await;
        match rows.by_id.get_mut(&id) {
            Some(confirmation) if confirmation.status == from => {
                confirmation.status = to;
                confirmation.resolved_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// In-memory earning store with a unique index on the confirmation id.
#[derive(Default, Clone)]
pub struct InMemoryEarningStore {
    inner: Arc<RwLock<EarningRows>>,
}

#[derive(Default)]
struct EarningRows {
    by_id: HashMap<Uuid, Earning>,
    by_confirmation: HashMap<Uuid, Uuid>,
}

impl InMemoryEarningStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EarningStore for InMemoryEarningStore {
    async fn insert_unique(&self, earning: Earning) -> Result<InsertOutcome> {
        let mut rows = self.inner.write().await;
        if rows.by_confirmation.contains_key(&earning.confirmation_id) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.by_confirmation
            .insert(earning.confirmation_id, earning.id);
        rows.by_id.insert(earning.id, earning);
        Ok(InsertOutcome::Inserted)
    }

    async fn pending_charge(&self) -> Result<Vec<Earning>> {
        let rows = self.inner.read().await;
        Ok(rows
            .by_id
            .values()
            .filter(|e| e.status == EarningStatus::PendingCharge)
            .cloned()
            .collect())
    }

    async fn for_cycle(&self, cycle_id: &CycleId, professional_id: Uuid) -> Result<Vec<Earning>> {
        let rows = self.inner.read().await;
        Ok(rows
            .by_id
            .values()
            .filter(|e| e.cycle_id == *cycle_id && e.professional_id == professional_id)
            .cloned()
            .collect())
    }

    async fn set_status_for_pair(
        &self,
        professional_id: Uuid,
        cycle_id: &CycleId,
        from: EarningStatus,
        to: EarningStatus,
    ) -> Result<u64> {
        let mut rows = self.inner.write().await;
        let mut updated = 0;
        for earning in rows.by_id.values_mut() {
            if earning.professional_id == professional_id
                && earning.cycle_id == *cycle_id
                && earning.status == from
            {
                earning.status = to;
                updated += 1;
            }
        }
        Ok(updated)
    }
}

/// In-memory fee charge store with a unique index on the
/// (professional, cycle) pair and a compare-and-swap claim.
#[derive(Default, Clone)]
pub struct InMemoryFeeChargeStore {
    inner: Arc<RwLock<FeeChargeRows>>,
}

#[derive(Default)]
struct FeeChargeRows {
    by_id: HashMap<Uuid, FeeCharge>,
    by_pair: HashMap<(Uuid, CycleId), Uuid>,
}

impl InMemoryFeeChargeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeeChargeStore for InMemoryFeeChargeStore {
    async fn insert_unique(&self, charge: FeeCharge) -> Result<InsertOutcome> {
        let mut rows = self.inner.write().await;
        let pair = (charge.professional_id, charge.cycle_id);
        if rows.by_pair.contains_key(&pair) {
            return Ok(InsertOutcome::AlreadyExists);
        }
        rows.by_pair.insert(pair, charge.id);
        rows.by_id.insert(charge.id, charge);
        Ok(InsertOutcome::Inserted)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FeeCharge>> {
        Ok(self.inner.read().await.by_id.get(&id).cloned())
    }

    async fn in_status(&self, status: FeeChargeStatus) -> Result<Vec<FeeCharge>> {
        let rows = self.inner.read().await;
        Ok(rows
            .by_id
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect())
    }

    async fn claim(&self, id: Uuid, at: DateTime<Utc>) -> Result<Option<FeeCharge>> {
        let mut rows = self.inner.write().await;
        match rows.by_id.get_mut(&id) {
            Some(charge) if charge.is_claimable() => {
                charge.begin_processing(at);
                Ok(Some(charge.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn transition(
        &self,
        id: Uuid,
        from: FeeChargeStatus,
        to: FeeChargeStatus,
    ) -> Result<bool> {
        let mut rows = self.inner.write().await;
        match rows.by_id.get_mut(&id) {
            Some(charge) if charge.status == from => {
                charge.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update(&self, charge: FeeCharge) -> Result<()> {
        self.inner.write().await.by_id.insert(charge.id, charge);
        Ok(())
    }
}
