use tracing::warn;
use uuid::Uuid;

use crate::domain::cycle::CycleId;
use crate::domain::earning::Earning;
use crate::domain::money::Money;
use crate::domain::policy::FeePolicyRef;
use crate::domain::ports::{ConfirmationStoreRef, EarningStoreRef, InsertOutcome, SessionStoreRef};
use crate::error::{Result, SettlementError};

/// Rolls resolved confirmations up into per-session earnings.
pub struct EarningsAggregator {
    sessions: SessionStoreRef,
    confirmations: ConfirmationStoreRef,
    earnings: EarningStoreRef,
    fee_policy: FeePolicyRef,
    default_rate: Money,
}

impl EarningsAggregator {
    pub fn new(
        sessions: SessionStoreRef,
        confirmations: ConfirmationStoreRef,
        earnings: EarningStoreRef,
        fee_policy: FeePolicyRef,
        default_rate: Money,
    ) -> Self {
        Self {
            sessions,
            confirmations,
            earnings,
            fee_policy,
            default_rate,
        }
    }

    /// Creates an earning for every confirmed or auto-resolved confirmation
    /// that has none yet. Gross comes from the session rate (or the
    /// configured default), the platform fee from the fee policy, and net is
    /// the difference. Idempotent through the unique insert on the
    /// confirmation id.
    pub async fn create_for_resolved(&self) -> Result<u64> {
        let resolved = self.confirmations.resolved().await?;
        let mut created = 0;
        for confirmation in resolved {
            let session = match self.sessions.get(confirmation.session_id).await {
                Ok(Some(session)) => session,
                Ok(None) => {
                    let err = SettlementError::MissingSession(confirmation.session_id);
                    warn!(confirmation_id = %confirmation.id, %err, "skipping confirmation");
                    continue;
                }
                Err(err) => {
                    warn!(confirmation_id = %confirmation.id, %err, "skipping confirmation while creating earnings");
                    continue;
                }
            };

            let gross = session.rate.unwrap_or(self.default_rate);
            let fee = self
                .fee_policy
                .platform_fee(confirmation.professional_id, gross);
            let earning = Earning::from_confirmation(&confirmation, gross, fee);
            match self.earnings.insert_unique(earning).await {
                Ok(InsertOutcome::Inserted) => created += 1,
                Ok(InsertOutcome::AlreadyExists) => {}
                Err(err) => {
                    warn!(confirmation_id = %confirmation.id, %err, "skipping earning insert");
                }
            }
        }
        Ok(created)
    }

    /// Read-only aggregation used by reporting, identical for every caller.
    pub async fn earnings_for_cycle(
        &self,
        cycle_id: &CycleId,
        professional_id: Uuid,
    ) -> Result<Vec<Earning>> {
        self.earnings.for_cycle(cycle_id, professional_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::confirmation::ConfirmationStatus;
    use crate::domain::cycle::PaymentCycle;
    use crate::domain::policy::FlatRatePolicy;
    use crate::domain::ports::{ConfirmationStore, EarningStore};
    use crate::domain::session::AppointmentSession;
    use crate::infrastructure::in_memory::{
        InMemoryConfirmationStore, InMemoryEarningStore, InMemorySessionStore,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        sessions: Arc<InMemorySessionStore>,
        confirmations: Arc<InMemoryConfirmationStore>,
        earnings: Arc<InMemoryEarningStore>,
        aggregator: EarningsAggregator,
    }

    fn fixture() -> Fixture {
        let sessions = Arc::new(InMemorySessionStore::new());
        let confirmations = Arc::new(InMemoryConfirmationStore::new());
        let earnings = Arc::new(InMemoryEarningStore::new());
        let aggregator = EarningsAggregator::new(
            sessions.clone(),
            confirmations.clone(),
            earnings.clone(),
            Arc::new(FlatRatePolicy::new(dec!(0.15)).unwrap()),
            Money::new(dec!(50.00)),
        );
        Fixture {
            sessions,
            confirmations,
            earnings,
            aggregator,
        }
    }

    async fn seed_resolved(
        fixture: &Fixture,
        rate: Option<Money>,
        status: ConfirmationStatus,
        ends_at: DateTime<Utc>,
    ) -> crate::domain::confirmation::Confirmation {
        let session = AppointmentSession {
            id: uuid::Uuid::new_v4(),
            professional_id: uuid::Uuid::new_v4(),
            starts_at: ends_at - chrono::Duration::hours(1),
            ends_at,
            rate,
            completed: true,
        };
        fixture.sessions.insert(session.clone()).await;

        let cycle = PaymentCycle::containing(ends_at);
        let mut confirmation =
            crate::domain::confirmation::Confirmation::pending(&session, &cycle, ends_at);
        confirmation.status = status;
        fixture
            .confirmations
            .insert_unique(confirmation.clone())
            .await
            .unwrap();
        confirmation
    }

    fn sunday() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 7, 23, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn test_creates_one_earning_per_resolved_confirmation() {
        let fixture = fixture();
        let confirmation = seed_resolved(
            &fixture,
            Some(Money::new(dec!(80.00))),
            ConfirmationStatus::AutoResolved,
            sunday(),
        )
        .await;

        assert_eq!(fixture.aggregator.create_for_resolved().await.unwrap(), 1);
        // Second pass finds the earning already present.
        assert_eq!(fixture.aggregator.create_for_resolved().await.unwrap(), 0);

        let earnings = fixture
            .earnings
            .for_cycle(&confirmation.cycle_id, confirmation.professional_id)
            .await
            .unwrap();
        assert_eq!(earnings.len(), 1);
        assert_eq!(earnings[0].gross, Money::new(dec!(80.00)));
        assert_eq!(earnings[0].platform_fee, Money::new(dec!(12.00)));
        assert_eq!(earnings[0].net, Money::new(dec!(68.00)));
        assert_eq!(earnings[0].gross, earnings[0].net + earnings[0].platform_fee);
    }

    #[tokio::test]
    async fn test_default_rate_fallback() {
        let fixture = fixture();
        let confirmation =
            seed_resolved(&fixture, None, ConfirmationStatus::Confirmed, sunday()).await;

        fixture.aggregator.create_for_resolved().await.unwrap();
        let earnings = fixture
            .earnings
            .for_cycle(&confirmation.cycle_id, confirmation.professional_id)
            .await
            .unwrap();
        assert_eq!(earnings[0].gross, Money::new(dec!(50.00)));
        assert_eq!(earnings[0].platform_fee, Money::new(dec!(7.50)));
    }

    #[tokio::test]
    async fn test_disputed_confirmations_do_not_earn() {
        let fixture = fixture();
        seed_resolved(&fixture, None, ConfirmationStatus::Disputed, sunday()).await;
        seed_resolved(&fixture, None, ConfirmationStatus::Pending, sunday()).await;

        assert_eq!(fixture.aggregator.create_for_resolved().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_session_is_skipped_not_fatal() {
        let fixture = fixture();
        let kept = seed_resolved(
            &fixture,
            Some(Money::new(dec!(40.00))),
            ConfirmationStatus::Confirmed,
            sunday(),
        )
        .await;

        // A confirmation whose session is gone from the booking subsystem.
        let orphan_session = AppointmentSession {
            id: uuid::Uuid::new_v4(),
            professional_id: uuid::Uuid::new_v4(),
            starts_at: sunday() - chrono::Duration::hours(1),
            ends_at: sunday(),
            rate: None,
            completed: true,
        };
        let cycle = PaymentCycle::containing(sunday());
        let mut orphan =
            crate::domain::confirmation::Confirmation::pending(&orphan_session, &cycle, sunday());
        orphan.status = ConfirmationStatus::Confirmed;
        fixture.confirmations.insert_unique(orphan).await.unwrap();

        assert_eq!(fixture.aggregator.create_for_resolved().await.unwrap(), 1);
        let earnings = fixture
            .earnings
            .for_cycle(&kept.cycle_id, kept.professional_id)
            .await
            .unwrap();
        assert_eq!(earnings.len(), 1);
    }
}
