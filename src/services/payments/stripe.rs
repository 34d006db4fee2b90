use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::{ChargeMetadata, PaymentInitiation, PaymentProvider, PaymentVerification};

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

pub struct StripeProvider {
    api_url: String,
    secret_key: String,
    client: reqwest::Client,
}

impl StripeProvider {
    pub fn new(api_url: String, secret_key: String) -> Self {
        Self {
            api_url,
            secret_key,
            client: reqwest::Client::new(),
        }
    }

    /// Retries only transient transport failures. An HTTP response, even an
    /// error status, is a definitive answer and is never retried here; the
    /// admission logic upstream fails fast instead.
    async fn send_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> anyhow::Result<reqwest::Response> {
        let mut backoff = BASE_BACKOFF;
        let mut attempt = 1;
        loop {
            match build().send().await {
                Ok(response) => return Ok(response),
                Err(e) if (e.is_connect() || e.is_timeout()) && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(error = %e, attempt, "payment API connection failed, retrying");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                    attempt += 1;
                }
                Err(e) => return Err(e).context("payment API request failed"),
            }
        }
    }
}

#[derive(Deserialize)]
struct PaymentIntentResponse {
    id: String,
    client_secret: Option<String>,
    status: String,
    amount: i64,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

fn metadata_field(map: &serde_json::Map<String, serde_json::Value>, key: &str) -> Option<String> {
    map.get(key).and_then(|v| v.as_str()).map(str::to_string)
}

#[async_trait]
impl PaymentProvider for StripeProvider {
    async fn initiate(
        &self,
        amount: f64,
        currency: &str,
        metadata: &ChargeMetadata,
    ) -> anyhow::Result<PaymentInitiation> {
        let url = format!("{}/v1/payment_intents", self.api_url);
        // Stripe wants minor units.
        let amount_minor = (amount * 100.0).round() as i64;
        let amount_str = amount_minor.to_string();

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .basic_auth(&self.secret_key, None::<&str>)
                    .form(&[
                        ("amount", amount_str.as_str()),
                        ("currency", currency),
                        ("metadata[user_id]", metadata.user_id.as_str()),
                        ("metadata[turf_id]", metadata.turf_id.as_str()),
                        ("metadata[date]", metadata.date.as_str()),
                        ("metadata[slot]", metadata.slot.as_str()),
                    ])
            })
            .await?
            .error_for_status()
            .context("payment API rejected intent creation")?;

        let intent: PaymentIntentResponse = response
            .json()
            .await
            .context("malformed payment intent response")?;

        Ok(PaymentInitiation {
            client_secret: intent.client_secret.unwrap_or_default(),
            confirmation_token: intent.id,
        })
    }

    async fn verify(&self, confirmation_token: &str) -> anyhow::Result<PaymentVerification> {
        let url = format!("{}/v1/payment_intents/{confirmation_token}", self.api_url);

        let response = self
            .send_with_retry(|| self.client.get(&url).basic_auth(&self.secret_key, None::<&str>))
            .await?
            .error_for_status()
            .context("payment API rejected intent lookup")?;

        let intent: PaymentIntentResponse = response
            .json()
            .await
            .context("malformed payment intent response")?;

        let metadata = match (
            metadata_field(&intent.metadata, "user_id"),
            metadata_field(&intent.metadata, "turf_id"),
            metadata_field(&intent.metadata, "date"),
            metadata_field(&intent.metadata, "slot"),
        ) {
            (Some(user_id), Some(turf_id), Some(date), Some(slot)) => Some(ChargeMetadata {
                user_id,
                turf_id,
                date,
                slot,
            }),
            _ => None,
        };

        Ok(PaymentVerification {
            succeeded: intent.status == "succeeded",
            amount: intent.amount as f64 / 100.0,
            metadata,
        })
    }
}
