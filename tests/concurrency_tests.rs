mod common;

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use common::{ScriptedGateway, completed_session, harness_with_gateway};
use paycycle::application::confirmations::ConfirmationManager;
use paycycle::domain::fee_charge::{FeeCharge, FeeChargeStatus};
use paycycle::domain::money::Money;
use paycycle::domain::ports::{ConfirmationStore, FeeChargeStore};
use rust_decimal_macros::dec;
use uuid::Uuid;

fn sunday_evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 7, 23, 30, 0).unwrap()
}

fn after_cutoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 8, 16, 0, 0).unwrap()
}

#[tokio::test]
async fn test_overlapping_runs_collect_each_charge_once() {
    let gateway = ScriptedGateway::with_delay(Duration::from_millis(50));
    let h = harness_with_gateway(gateway, Duration::from_secs(5));
    h.sessions
        .insert(completed_session(
            Uuid::new_v4(),
            sunday_evening(),
            Some(Money::new(dec!(50.00))),
        ))
        .await;

    // A manual trigger lands while the scheduled run is in flight.
    let second_runner = common::build_runner(
        h.sessions.clone(),
        h.confirmations.clone(),
        h.earnings.clone(),
        h.charges.clone(),
        h.gateway.clone(),
        Duration::from_secs(5),
    );

    let now = after_cutoff();
    let (a, b) = tokio::join!(h.runner.run_at(now), second_runner.run_at(now));

    assert!(a.success && b.success);
    assert_eq!(a.confirmations_created + b.confirmations_created, 1);
    assert_eq!(
        a.confirmations_auto_resolved + b.confirmations_auto_resolved,
        1
    );
    assert_eq!(a.earnings_created + b.earnings_created, 1);
    assert_eq!(a.charges_created + b.charges_created, 1);
    assert_eq!(a.charges_succeeded + b.charges_succeeded, 1);
    assert_eq!(a.charges_failed + b.charges_failed, 0);

    // The gateway saw exactly one collection.
    assert_eq!(h.gateway.calls(), 1);
    let succeeded = h.charges.in_status(FeeChargeStatus::Succeeded).await.unwrap();
    assert_eq!(succeeded.len(), 1);
}

#[tokio::test]
async fn test_claim_race_on_a_staged_charge() {
    let gateway = ScriptedGateway::with_delay(Duration::from_millis(50));
    let h = harness_with_gateway(gateway, Duration::from_secs(5));

    let cycle = paycycle::domain::cycle::PaymentCycle::containing(sunday_evening());
    let charge = FeeCharge::new(
        Uuid::new_v4(),
        cycle.id(),
        Money::new(dec!(12.50)),
        after_cutoff(),
    );
    h.charges.insert_unique(charge).await.unwrap();

    let second_runner = common::build_runner(
        h.sessions.clone(),
        h.confirmations.clone(),
        h.earnings.clone(),
        h.charges.clone(),
        h.gateway.clone(),
        Duration::from_secs(5),
    );

    let now = after_cutoff();
    let (a, b) = tokio::join!(h.runner.run_at(now), second_runner.run_at(now));

    assert_eq!(a.charges_succeeded + b.charges_succeeded, 1);
    assert_eq!(h.gateway.calls(), 1);
}

#[tokio::test]
async fn test_concurrent_confirmation_creation_inserts_once() {
    let h = harness_with_gateway(ScriptedGateway::succeeding(), Duration::from_secs(5));
    h.sessions
        .insert(completed_session(Uuid::new_v4(), sunday_evening(), None))
        .await;

    let manager_a = ConfirmationManager::new(h.sessions.clone(), h.confirmations.clone());
    let manager_b = ConfirmationManager::new(h.sessions.clone(), h.confirmations.clone());

    let as_of = Utc.with_ymd_and_hms(2024, 1, 8, 1, 0, 0).unwrap();
    let (a, b) = tokio::join!(
        manager_a.create_pending(as_of),
        manager_b.create_pending(as_of)
    );

    assert_eq!(a.unwrap() + b.unwrap(), 1);
    let pending = h.confirmations.pending_expired(after_cutoff()).await.unwrap();
    assert_eq!(pending.len(), 1);
}
