use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use super::charges::FeeChargeProcessor;
use super::confirmations::ConfirmationManager;
use super::earnings::EarningsAggregator;
use super::retry_transient;
use crate::domain::fee_charge::FeeChargeStatus;
use crate::domain::ports::{ConfirmationStoreRef, FeeChargeStoreRef};
use crate::error::{Result, SettlementError};

/// Statistics for one scheduled settlement pass. Returned to the trigger
/// caller; never persisted by the engine itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub as_of: DateTime<Utc>,
    pub confirmations_created: u64,
    pub confirmations_auto_resolved: u64,
    pub earnings_created: u64,
    pub charges_created: u64,
    pub charges_succeeded: u64,
    pub charges_failed: u64,
    pub charges_requeued: u64,
    pub duration_ms: u64,
    pub success: bool,
    pub errors: Vec<String>,
}

impl RunReport {
    fn new(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            confirmations_created: 0,
            confirmations_auto_resolved: 0,
            earnings_created: 0,
            charges_created: 0,
            charges_succeeded: 0,
            charges_failed: 0,
            charges_requeued: 0,
            duration_ms: 0,
            success: false,
            errors: Vec::new(),
        }
    }

    fn record_error(&mut self, step: &str, err: &SettlementError) {
        error!(%err, "settlement step '{step}' failed");
        self.errors.push(format!("{step}: {err}"));
    }
}

/// Read-only snapshot of conditions an operator should look at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub healthy: bool,
    pub stuck_processing_charges: u64,
    pub overdue_pending_confirmations: u64,
    pub pending_charge_backlog: u64,
    pub checked_at: DateTime<Utc>,
}

/// Sequences the settlement steps of one scheduled invocation.
///
/// Every step runs against the same instant captured at run start. A step's
/// failure is recorded in the report and the remaining steps still run;
/// nothing escapes to the trigger boundary.
pub struct ScheduledRunner {
    confirmations: ConfirmationManager,
    earnings: EarningsAggregator,
    charges: FeeChargeProcessor,
    confirmation_store: ConfirmationStoreRef,
    charge_store: FeeChargeStoreRef,
    stuck_threshold: Duration,
}

impl ScheduledRunner {
    pub fn new(
        confirmations: ConfirmationManager,
        earnings: EarningsAggregator,
        charges: FeeChargeProcessor,
        confirmation_store: ConfirmationStoreRef,
        charge_store: FeeChargeStoreRef,
        stuck_threshold: Duration,
    ) -> Self {
        Self {
            confirmations,
            earnings,
            charges,
            confirmation_store,
            charge_store,
            stuck_threshold,
        }
    }

    /// Runs one settlement pass against the current time.
    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    /// Runs one settlement pass against a fixed instant.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let started = Instant::now();
        let mut report = RunReport::new(now);
        info!(%now, "starting settlement run");

        match retry_transient("create pending confirmations", || {
            self.confirmations.create_pending(now)
        })
        .await
        {
            Ok(count) => report.confirmations_created = count,
            Err(err) => report.record_error("create pending confirmations", &err),
        }

        match retry_transient("auto-resolve expired confirmations", || {
            self.confirmations.auto_resolve_expired(now)
        })
        .await
        {
            Ok(count) => report.confirmations_auto_resolved = count,
            Err(err) => report.record_error("auto-resolve expired confirmations", &err),
        }

        match retry_transient("create earnings", || self.earnings.create_for_resolved()).await {
            Ok(count) => report.earnings_created = count,
            Err(err) => report.record_error("create earnings", &err),
        }

        match retry_transient("create fee charges", || self.charges.create_charges(now)).await {
            Ok(count) => report.charges_created = count,
            Err(err) => report.record_error("create fee charges", &err),
        }

        match retry_transient("process pending charges", || {
            self.charges.process_pending(now)
        })
        .await
        {
            Ok(outcome) => {
                report.charges_succeeded = outcome.succeeded;
                report.charges_failed = outcome.failed;
            }
            Err(err) => report.record_error("process pending charges", &err),
        }

        match retry_transient("requeue retrying charges", || {
            self.charges.requeue_retrying(now)
        })
        .await
        {
            Ok(count) => report.charges_requeued = count,
            Err(err) => report.record_error("requeue retrying charges", &err),
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        report.success = report.errors.is_empty();
        info!(
            success = report.success,
            duration_ms = report.duration_ms,
            errors = report.errors.len(),
            "settlement run finished"
        );
        report
    }

    /// Lightweight read-only checks; mutates nothing.
    pub async fn health(&self, now: DateTime<Utc>) -> Result<HealthReport> {
        let processing = self
            .charge_store
            .in_status(FeeChargeStatus::Processing)
            .await?;
        let stuck = processing
            .iter()
            .filter(|charge| charge.is_stuck(self.stuck_threshold, now))
            .count() as u64;
        let overdue = self.confirmation_store.pending_expired(now).await?.len() as u64;
        let backlog = self
            .charge_store
            .in_status(FeeChargeStatus::Pending)
            .await?
            .len() as u64;

        Ok(HealthReport {
            healthy: stuck == 0,
            stuck_processing_charges: stuck,
            overdue_pending_confirmations: overdue,
            pending_charge_backlog: backlog,
            checked_at: now,
        })
    }

    /// Resets charges flagged as stuck by the health check back to retrying.
    pub async fn reclaim_stuck_charges(&self, now: DateTime<Utc>) -> Result<u64> {
        self.charges.reclaim_stuck(now, self.stuck_threshold).await
    }
}
