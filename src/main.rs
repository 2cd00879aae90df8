use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use paycycle::application::charges::FeeChargeProcessor;
use paycycle::application::confirmations::ConfirmationManager;
use paycycle::application::earnings::EarningsAggregator;
use paycycle::application::runner::ScheduledRunner;
use paycycle::domain::money::Money;
use paycycle::domain::policy::{FlatRatePolicy, RetryPolicy};
use paycycle::domain::ports::{
    ConfirmationStoreRef, EarningStoreRef, FeeChargeStoreRef, NotifierRef, PaymentGatewayRef,
    SessionStoreRef,
};
use paycycle::infrastructure::http_gateway::HttpPaymentGateway;
use paycycle::infrastructure::in_memory::{
    InMemoryConfirmationStore, InMemoryEarningStore, InMemoryFeeChargeStore, InMemorySessionStore,
};
use paycycle::infrastructure::notifier::TracingNotifier;
use paycycle::interfaces::http::{ApiState, router};
use rust_decimal::Decimal;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Weekly payout settlement engine", long_about = None)]
struct Cli {
    /// Address to serve the trigger endpoint on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Bearer token required by the trigger endpoint; unset leaves it open.
    #[arg(long, env = "TRIGGER_TOKEN")]
    trigger_token: Option<String>,

    /// Payment gateway base URL.
    #[arg(long, env = "GATEWAY_ENDPOINT", default_value = "http://payment-gateway:8080")]
    gateway_endpoint: String,

    /// Seconds before an in-flight gateway call counts as failed.
    #[arg(long, default_value_t = 10)]
    gateway_timeout_secs: u64,

    /// Flat platform fee rate applied to gross session amounts.
    #[arg(long, default_value = "0.15")]
    platform_fee_rate: Decimal,

    /// Gross amount assumed for sessions without an agreed rate.
    #[arg(long, default_value = "50.00")]
    default_session_rate: Decimal,

    /// Collection attempts before a charge fails for good.
    #[arg(long, default_value_t = 3)]
    max_charge_attempts: u32,

    /// Days between collection attempts for a retrying charge.
    #[arg(long, default_value_t = 1)]
    charge_backoff_days: i64,

    /// Minutes after which an in-flight charge counts as stuck.
    #[arg(long, default_value_t = 60)]
    stuck_charge_threshold_mins: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let gateway_timeout = Duration::from_secs(cli.gateway_timeout_secs);

    let sessions: SessionStoreRef = Arc::new(InMemorySessionStore::new());
    let confirmations: ConfirmationStoreRef = Arc::new(InMemoryConfirmationStore::new());
    let earnings: EarningStoreRef = Arc::new(InMemoryEarningStore::new());
    let charges: FeeChargeStoreRef = Arc::new(InMemoryFeeChargeStore::new());

    let gateway: PaymentGatewayRef = Arc::new(
        HttpPaymentGateway::new(&cli.gateway_endpoint, gateway_timeout).into_diagnostic()?,
    );
    let notifier: NotifierRef = Arc::new(TracingNotifier::new());

    let fee_policy = Arc::new(FlatRatePolicy::new(cli.platform_fee_rate).into_diagnostic()?);
    let retry_policy = RetryPolicy {
        max_attempts: cli.max_charge_attempts,
        backoff: chrono::Duration::days(cli.charge_backoff_days),
    };

    let runner = ScheduledRunner::new(
        ConfirmationManager::new(sessions.clone(), confirmations.clone()),
        EarningsAggregator::new(
            sessions.clone(),
            confirmations.clone(),
            earnings.clone(),
            fee_policy,
            Money::new(cli.default_session_rate),
        ),
        FeeChargeProcessor::new(
            earnings.clone(),
            charges.clone(),
            gateway,
            notifier,
            retry_policy,
            gateway_timeout,
        ),
        confirmations.clone(),
        charges.clone(),
        chrono::Duration::minutes(cli.stuck_charge_threshold_mins),
    );

    let state = ApiState {
        runner: Arc::new(runner),
        trigger_token: cli.trigger_token,
    };

    let listener = TcpListener::bind(cli.bind).await.into_diagnostic()?;
    info!("listening on {}", listener.local_addr().into_diagnostic()?);
    axum::serve(listener, router(state).into_make_service())
        .await
        .into_diagnostic()?;

    Ok(())
}
