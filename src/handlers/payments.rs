use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::handlers::bookings::PaymentResponse;
use crate::services::payments::{ChargeMetadata, PaymentInitiation};
use crate::services::reservation::ReservationError;
use crate::state::AppState;

// GET /user/payments?user_id=...
#[derive(Deserialize)]
pub struct PaymentsQuery {
    pub user_id: String,
}

pub async fn payment_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PaymentsQuery>,
) -> Result<Json<Vec<PaymentResponse>>, AppError> {
    let payments = {
        let db = state.db.lock().unwrap();
        queries::payments_for_user(&db, &query.user_id)?
    };

    Ok(Json(
        payments.into_iter().map(PaymentResponse::from_model).collect(),
    ))
}

// POST /payments/initiate
//
// Creates the processor-side charge before the client confirms it; the
// returned confirmation token is what POST /bookings later verifies.
#[derive(Deserialize)]
pub struct InitiatePaymentRequest {
    pub user_id: String,
    pub turf_id: String,
    pub date: String,
    pub slot: String,
}

pub async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<InitiatePaymentRequest>,
) -> Result<Json<PaymentInitiation>, AppError> {
    let turf = {
        let db = state.db.lock().unwrap();
        queries::get_turf(&db, &body.turf_id)?
            .ok_or(ReservationError::TurfNotFound)?
    };

    let metadata = ChargeMetadata {
        user_id: body.user_id,
        turf_id: body.turf_id,
        date: body.date,
        slot: body.slot,
    };

    let initiation = state
        .payments
        .initiate(turf.price, &state.config.currency, &metadata)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "payment initiation failed");
            ReservationError::PaymentGatewayUnavailable
        })?;

    Ok(Json(initiation))
}
