use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::confirmation::{Confirmation, ConfirmationStatus};
use crate::domain::cycle::PaymentCycle;
use crate::domain::ports::{ConfirmationStoreRef, InsertOutcome, SessionStoreRef};
use crate::error::Result;

/// Turns completed sessions into pending confirmations and resolves the
/// ones left unacknowledged past their deadline.
pub struct ConfirmationManager {
    sessions: SessionStoreRef,
    confirmations: ConfirmationStoreRef,
}

impl ConfirmationManager {
    pub fn new(sessions: SessionStoreRef, confirmations: ConfirmationStoreRef) -> Self {
        Self {
            sessions,
            confirmations,
        }
    }

    /// Creates a pending confirmation for every completed session that has
    /// ended and has none yet. The session's cycle is the one containing its
    /// end instant, and the resolution deadline is that cycle's cutoff.
    /// Repeated invocations are no-ops thanks to the unique insert.
    pub async fn create_pending(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let sessions = self.sessions.completed_ended_before(as_of).await?;
        let mut created = 0;
        for session in sessions {
            let cycle = PaymentCycle::containing(session.ends_at);
            let confirmation = Confirmation::pending(&session, &cycle, as_of);
            match self.confirmations.insert_unique(confirmation).await {
                Ok(InsertOutcome::Inserted) => created += 1,
                Ok(InsertOutcome::AlreadyExists) => {}
                Err(err) => {
                    warn!(session_id = %session.id, %err, "skipping session while creating confirmations");
                }
            }
        }
        Ok(created)
    }

    /// Moves pending confirmations past their deadline to auto-resolved.
    /// Silence counts as confirmation; a dispute requires explicit action
    /// before the deadline.
    pub async fn auto_resolve_expired(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let expired = self.confirmations.pending_expired(as_of).await?;
        let mut resolved = 0;
        for confirmation in expired {
            let transitioned = self
                .confirmations
                .transition(
                    confirmation.id,
                    ConfirmationStatus::Pending,
                    ConfirmationStatus::AutoResolved,
                    as_of,
                )
                .await;
            match transitioned {
                Ok(true) => resolved += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(confirmation_id = %confirmation.id, %err, "skipping confirmation during auto-resolve");
                }
            }
        }
        Ok(resolved)
    }
}
