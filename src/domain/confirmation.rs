use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cycle::{CycleId, PaymentCycle};
use super::session::AppointmentSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfirmationStatus {
    Pending,
    Confirmed,
    Disputed,
    AutoResolved,
}

impl ConfirmationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ConfirmationStatus::Pending)
    }

    /// Confirmed-equivalent states that qualify for earnings creation.
    /// Silence past the deadline counts as confirmation; a dispute does not.
    pub fn counts_for_earnings(&self) -> bool {
        matches!(
            self,
            ConfirmationStatus::Confirmed | ConfirmationStatus::AutoResolved
        )
    }
}

/// A professional's (or the system's) attestation that a session occurred.
///
/// Exactly one confirmation exists per session; the store's unique insert on
/// the session id enforces this. A pending confirmation left untouched past
/// its resolution deadline is auto-resolved by the scheduled run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    pub id: Uuid,
    pub session_id: Uuid,
    pub professional_id: Uuid,
    pub cycle_id: CycleId,
    pub status: ConfirmationStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    /// The owning cycle's cutoff; unresolved confirmations auto-resolve here.
    pub resolution_deadline: DateTime<Utc>,
}

impl Confirmation {
    /// Creates the pending confirmation for a completed session. The owning
    /// cycle is the one containing the session's end instant.
    pub fn pending(session: &AppointmentSession, cycle: &PaymentCycle, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session.id,
            professional_id: session.professional_id,
            cycle_id: cycle.id(),
            status: ConfirmationStatus::Pending,
            created_at: now,
            resolved_at: None,
            resolution_deadline: cycle.cutoff_at,
        }
    }

    pub fn is_expired(&self, as_of: DateTime<Utc>) -> bool {
        self.status == ConfirmationStatus::Pending && self.resolution_deadline <= as_of
    }
}
