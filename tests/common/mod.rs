use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use paycycle::application::charges::FeeChargeProcessor;
use paycycle::application::confirmations::ConfirmationManager;
use paycycle::application::earnings::EarningsAggregator;
use paycycle::application::runner::ScheduledRunner;
use paycycle::domain::fee_charge::FeeCharge;
use paycycle::domain::money::Money;
use paycycle::domain::policy::{FlatRatePolicy, RetryPolicy};
use paycycle::domain::ports::{CollectionReceipt, Notifier, PaymentGateway};
use paycycle::domain::session::AppointmentSession;
use paycycle::error::{Result, SettlementError};
use paycycle::infrastructure::in_memory::{
    InMemoryConfirmationStore, InMemoryEarningStore, InMemoryFeeChargeStore, InMemorySessionStore,
};
use rust_decimal_macros::dec;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Gateway stub returning scripted outcomes in order, succeeding once the
/// script runs out. An optional per-call delay widens race windows and
/// triggers the processor's timeout handling.
pub struct ScriptedGateway {
    outcomes: Mutex<VecDeque<Result<CollectionReceipt>>>,
    delay: Option<Duration>,
    calls: AtomicU64,
}

impl ScriptedGateway {
    pub fn new(outcomes: Vec<Result<CollectionReceipt>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            delay: None,
            calls: AtomicU64::new(0),
        })
    }

    pub fn succeeding() -> Arc<Self> {
        Self::new(vec![])
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(VecDeque::new()),
            delay: Some(delay),
            calls: AtomicU64::new(0),
        })
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn collect(&self, _professional_id: Uuid, _amount: Money) -> Result<CollectionReceipt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcomes.lock().await.pop_front().unwrap_or(Ok(CollectionReceipt {
            reference: format!("ref-{}", self.calls.load(Ordering::SeqCst)),
        }))
    }
}

pub struct SilentNotifier;

#[async_trait]
impl Notifier for SilentNotifier {
    async fn charge_succeeded(&self, _charge: &FeeCharge) {}
    async fn charge_failed(&self, _charge: &FeeCharge, _reason: &str) {}
}

pub struct Harness {
    pub sessions: Arc<InMemorySessionStore>,
    pub confirmations: Arc<InMemoryConfirmationStore>,
    pub earnings: Arc<InMemoryEarningStore>,
    pub charges: Arc<InMemoryFeeChargeStore>,
    pub gateway: Arc<ScriptedGateway>,
    pub runner: ScheduledRunner,
}

pub fn harness() -> Harness {
    harness_with_gateway(ScriptedGateway::succeeding(), Duration::from_secs(5))
}

pub fn harness_with_gateway(gateway: Arc<ScriptedGateway>, gateway_timeout: Duration) -> Harness {
    let sessions = Arc::new(InMemorySessionStore::new());
    let confirmations = Arc::new(InMemoryConfirmationStore::new());
    let earnings = Arc::new(InMemoryEarningStore::new());
    let charges = Arc::new(InMemoryFeeChargeStore::new());

    let runner = build_runner(
        sessions.clone(),
        confirmations.clone(),
        earnings.clone(),
        charges.clone(),
        gateway.clone(),
        gateway_timeout,
    );

    Harness {
        sessions,
        confirmations,
        earnings,
        charges,
        gateway,
        runner,
    }
}

pub fn build_runner(
    sessions: Arc<InMemorySessionStore>,
    confirmations: Arc<InMemoryConfirmationStore>,
    earnings: Arc<InMemoryEarningStore>,
    charges: Arc<InMemoryFeeChargeStore>,
    gateway: Arc<ScriptedGateway>,
    gateway_timeout: Duration,
) -> ScheduledRunner {
    ScheduledRunner::new(
        ConfirmationManager::new(sessions.clone(), confirmations.clone()),
        EarningsAggregator::new(
            sessions,
            confirmations.clone(),
            earnings.clone(),
            // 10% flat rate: a 50.00 session yields a 5.00 fee.
            Arc::new(FlatRatePolicy::new(dec!(0.10)).unwrap()),
            Money::new(dec!(50.00)),
        ),
        FeeChargeProcessor::new(
            earnings,
            charges.clone(),
            gateway,
            Arc::new(SilentNotifier),
            RetryPolicy::default(),
            gateway_timeout,
        ),
        confirmations,
        charges,
        chrono::Duration::hours(1),
    )
}

pub fn completed_session(
    professional_id: Uuid,
    ends_at: DateTime<Utc>,
    rate: Option<Money>,
) -> AppointmentSession {
    AppointmentSession {
        id: Uuid::new_v4(),
        professional_id,
        starts_at: ends_at - chrono::Duration::hours(1),
        ends_at,
        rate,
        completed: true,
    }
}

pub fn declined() -> Result<CollectionReceipt> {
    Err(SettlementError::Gateway("card declined".to_string()))
}
