use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::cycle::{CycleId, PaymentCycle};
use crate::domain::earning::EarningStatus;
use crate::domain::fee_charge::{FeeCharge, FeeChargeStatus};
use crate::domain::money::Money;
use crate::domain::policy::RetryPolicy;
use crate::domain::ports::{
    CollectionReceipt, EarningStoreRef, FeeChargeStoreRef, InsertOutcome, NotifierRef,
    PaymentGatewayRef,
};
use crate::error::{Result, SettlementError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChargeOutcome {
    pub succeeded: u64,
    pub failed: u64,
}

/// Creates fee charges from aggregated earnings and drives their collection
/// through the payment gateway.
pub struct FeeChargeProcessor {
    earnings: EarningStoreRef,
    charges: FeeChargeStoreRef,
    gateway: PaymentGatewayRef,
    notifier: NotifierRef,
    retry_policy: RetryPolicy,
    gateway_timeout: Duration,
}

impl FeeChargeProcessor {
    pub fn new(
        earnings: EarningStoreRef,
        charges: FeeChargeStoreRef,
        gateway: PaymentGatewayRef,
        notifier: NotifierRef,
        retry_policy: RetryPolicy,
        gateway_timeout: Duration,
    ) -> Self {
        Self {
            earnings,
            charges,
            gateway,
            notifier,
            retry_policy,
            gateway_timeout,
        }
    }

    /// Groups uncharged earnings of cycles whose cutoff has passed by
    /// (professional, cycle) and creates one pending charge per group. The
    /// unique insert on the pair keeps repeated runs from creating a second
    /// charge.
    pub async fn create_charges(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let pending = self.earnings.pending_charge().await?;
        let mut totals: HashMap<(Uuid, CycleId), Money> = HashMap::new();
        for earning in pending {
            if !PaymentCycle::for_id(&earning.cycle_id).is_cutoff_passed(as_of) {
                continue;
            }
            *totals
                .entry((earning.professional_id, earning.cycle_id))
                .or_insert(Money::ZERO) += earning.platform_fee;
        }

        let mut created = 0;
        for ((professional_id, cycle_id), total_fee) in totals {
            if total_fee == Money::ZERO {
                continue;
            }
            let charge = FeeCharge::new(professional_id, cycle_id, total_fee, as_of);
            match self.charges.insert_unique(charge).await {
                Ok(InsertOutcome::Inserted) => created += 1,
                Ok(InsertOutcome::AlreadyExists) => {}
                Err(err) => {
                    warn!(%professional_id, %cycle_id, %err, "skipping fee charge insert");
                }
            }
        }
        Ok(created)
    }

    /// Collects every pending charge, plus retrying charges whose backoff has
    /// elapsed. Each charge is claimed through the store's compare-and-swap
    /// before the gateway sees it, so an overlapping run cannot submit the
    /// same charge twice.
    pub async fn process_pending(&self, as_of: DateTime<Utc>) -> Result<ChargeOutcome> {
        let mut candidates = self.charges.in_status(FeeChargeStatus::Pending).await?;
        let retrying = self.charges.in_status(FeeChargeStatus::Retrying).await?;
        candidates.extend(
            retrying
                .into_iter()
                .filter(|c| c.is_due_for_retry(self.retry_policy.backoff, as_of)),
        );

        let mut outcome = ChargeOutcome::default();
        for candidate in candidates {
            let Some(claimed) = self.charges.claim(candidate.id, as_of).await? else {
                continue;
            };
            match self.collect(&claimed).await {
                Ok(receipt) => {
                    self.settle_success(claimed, receipt, as_of).await?;
                    outcome.succeeded += 1;
                }
                Err(err) => {
                    self.settle_failure(claimed, &err, as_of).await?;
                    outcome.failed += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Re-queues retrying charges whose backoff has elapsed so the next run
    /// picks them up as pending. Catches charges a broken processing step
    /// left behind.
    pub async fn requeue_retrying(&self, as_of: DateTime<Utc>) -> Result<u64> {
        let retrying = self.charges.in_status(FeeChargeStatus::Retrying).await?;
        let mut requeued = 0;
        for charge in retrying {
            if !charge.is_due_for_retry(self.retry_policy.backoff, as_of) {
                continue;
            }
            if self
                .charges
                .transition(charge.id, FeeChargeStatus::Retrying, FeeChargeStatus::Pending)
                .await?
            {
                requeued += 1;
            }
        }
        Ok(requeued)
    }

    /// Resets charges stuck in processing (an unclean shutdown mid-claim)
    /// back to retrying so a later run can pick them up.
    pub async fn reclaim_stuck(
        &self,
        as_of: DateTime<Utc>,
        threshold: chrono::Duration,
    ) -> Result<u64> {
        let processing = self.charges.in_status(FeeChargeStatus::Processing).await?;
        let mut reclaimed = 0;
        for charge in processing {
            if !charge.is_stuck(threshold, as_of) {
                continue;
            }
            if self
                .charges
                .transition(
                    charge.id,
                    FeeChargeStatus::Processing,
                    FeeChargeStatus::Retrying,
                )
                .await?
            {
                warn!(charge_id = %charge.id, "reclaimed stuck charge");
                reclaimed += 1;
            }
        }
        Ok(reclaimed)
    }

    /// Gateway call with a hard upper bound; an elapsed timeout counts as a
    /// failed attempt, never as a success.
    async fn collect(&self, charge: &FeeCharge) -> Result<CollectionReceipt> {
        match tokio::time::timeout(
            self.gateway_timeout,
            self.gateway.collect(charge.professional_id, charge.total_fee),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SettlementError::GatewayTimeout(self.gateway_timeout)),
        }
    }

    async fn settle_success(
        &self,
        mut charge: FeeCharge,
        receipt: CollectionReceipt,
        as_of: DateTime<Utc>,
    ) -> Result<()> {
        charge.record_success(receipt.reference, as_of)?;
        self.charges.update(charge.clone()).await?;
        self.earnings
            .set_status_for_pair(
                charge.professional_id,
                &charge.cycle_id,
                EarningStatus::PendingCharge,
                EarningStatus::Charged,
            )
            .await?;
        info!(charge_id = %charge.id, amount = %charge.total_fee, "fee charge collected");
        self.notifier.charge_succeeded(&charge).await;
        Ok(())
    }

    async fn settle_failure(
        &self,
        mut charge: FeeCharge,
        err: &SettlementError,
        as_of: DateTime<Utc>,
    ) -> Result<()> {
        let reason = err.to_string();
        let status = charge.record_failure(&reason, self.retry_policy.max_attempts, as_of)?;
        self.charges.update(charge.clone()).await?;
        if status == FeeChargeStatus::Failed {
            self.earnings
                .set_status_for_pair(
                    charge.professional_id,
                    &charge.cycle_id,
                    EarningStatus::PendingCharge,
                    EarningStatus::Failed,
                )
                .await?;
        }
        warn!(
            charge_id = %charge.id,
            attempts = charge.attempts,
            ?status,
            "fee charge collection failed: {reason}"
        );
        self.notifier.charge_failed(&charge, &reason).await;
        Ok(())
    }
}
