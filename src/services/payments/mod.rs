pub mod stripe;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Metadata pinned onto a charge when it is initiated. Verification replays
/// it back so the reservation guard can check the paid-for slot is the
/// requested one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChargeMetadata {
    pub user_id: String,
    pub turf_id: String,
    pub date: String,
    pub slot: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentInitiation {
    pub confirmation_token: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct PaymentVerification {
    pub succeeded: bool,
    pub amount: f64,
    pub metadata: Option<ChargeMetadata>,
}

/// Boundary to the external payment processor. Implementations return Err
/// only for transport-level failures; a declined or unpaid charge is an Ok
/// verification with `succeeded` false.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn initiate(
        &self,
        amount: f64,
        currency: &str,
        metadata: &ChargeMetadata,
    ) -> anyhow::Result<PaymentInitiation>;

    async fn verify(&self, confirmation_token: &str) -> anyhow::Result<PaymentVerification>;
}
