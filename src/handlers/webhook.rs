use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::errors::AppError;
use crate::handlers::bookings::BookingResponse;
use crate::services::reservation::{self, ReservationError, ReservationRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct PaymentEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub confirmation_token: String,
}

fn validate_signature(secret: &str, signature: &str, payload: &[u8]) -> bool {
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    let expected: String = mac
        .finalize()
        .into_bytes()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();

    expected == signature
}

// POST /webhook/payments
//
// The processor delivers payment-success events asynchronously; admission
// goes through the same guard as POST /bookings, so a slot claimed in the
// meantime yields the same 400 and the processor stops retrying.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, AppError> {
    // Signature check is skipped when no secret is configured — dev mode.
    if !state.config.payment_webhook_secret.is_empty() {
        let signature = headers
            .get("x-payment-signature")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");

        if !validate_signature(&state.config.payment_webhook_secret, signature, &body) {
            tracing::warn!("invalid payment webhook signature");
            return Err(AppError::BadRequest("Invalid signature".to_string()));
        }
    }

    let event: PaymentEvent = serde_json::from_slice(&body)
        .map_err(|_| AppError::BadRequest("Malformed webhook payload".to_string()))?;

    if event.kind != "payment.succeeded" {
        tracing::debug!(kind = %event.kind, "ignoring payment event");
        return Ok(Json(serde_json::json!({"received": true})));
    }

    // Resolve what was paid for, then run the ordinary admission path. The
    // guard re-verifies the token, so a forged event cannot book a slot.
    let verification = state
        .payments
        .verify(&event.confirmation_token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "webhook verification unreachable");
            ReservationError::PaymentGatewayUnavailable
        })?;

    let metadata = verification
        .metadata
        .ok_or(ReservationError::PaymentDetailMismatch)?;

    let outcome = reservation::reserve(
        &state,
        ReservationRequest {
            user_id: metadata.user_id,
            turf_id: metadata.turf_id,
            date: metadata.date,
            slot: metadata.slot,
            payment_method: "card".to_string(),
            payment_intent_id: Some(event.confirmation_token),
        },
    )
    .await?;

    Ok(Json(serde_json::json!({
        "received": true,
        "booking": BookingResponse::from_model(outcome.booking),
    })))
}
