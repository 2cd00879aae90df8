//! Application layer: the settlement batch steps and their orchestration.
//!
//! Each manager owns one step of the scheduled run and talks to the stores
//! through the domain ports. `ScheduledRunner` sequences the steps against a
//! single captured instant.

pub mod charges;
pub mod confirmations;
pub mod earnings;
pub mod runner;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::Result;

const STORE_RETRY_ATTEMPTS: u32 = 3;
const STORE_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Retries an operation a bounded number of times on transient store errors.
/// Anything else propagates immediately.
pub(crate) async fn retry_transient<T, F, Fut>(label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt + 1 < STORE_RETRY_ATTEMPTS => {
                attempt += 1;
                warn!(%err, attempt, "{label}: transient store error, retrying");
                tokio::time::sleep(STORE_RETRY_DELAY * attempt).await;
            }
            Err(err) => return Err(err),
        }
    }
}
