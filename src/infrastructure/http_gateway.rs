use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::money::Money;
use crate::domain::ports::{CollectionReceipt, PaymentGateway};
use crate::error::{Result, SettlementError};

/// Payment gateway adapter speaking JSON over HTTP.
///
/// The gateway collects the given amount from the professional's on-file
/// payment method. Timeouts surface as failures so an uncertain charge is
/// never presumed to have succeeded.
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    collect_url: String,
    timeout: Duration,
}

impl HttpPaymentGateway {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| SettlementError::Config(err.to_string()))?;
        Ok(Self {
            client,
            collect_url: format!("{}/collections", endpoint.trim_end_matches('/')),
            timeout,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CollectRequest {
    professional_id: Uuid,
    amount: Money,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CollectResponse {
    success: bool,
    reference_id: Option<String>,
    reason: Option<String>,
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn collect(&self, professional_id: Uuid, amount: Money) -> Result<CollectionReceipt> {
        let response = self
            .client
            .post(&self.collect_url)
            .json(&CollectRequest {
                professional_id,
                amount,
            })
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    SettlementError::GatewayTimeout(self.timeout)
                } else {
                    SettlementError::Gateway(err.to_string())
                }
            })?;

        let response = response
            .error_for_status()
            .map_err(|err| SettlementError::Gateway(err.to_string()))?;
        let body: CollectResponse = response
            .json()
            .await
            .map_err(|err| SettlementError::Gateway(err.to_string()))?;

        if body.success {
            Ok(CollectionReceipt {
                reference: body.reference_id.unwrap_or_default(),
            })
        } else {
            Err(SettlementError::Gateway(
                body.reason
                    .unwrap_or_else(|| "collection declined".to_string()),
            ))
        }
    }
}
