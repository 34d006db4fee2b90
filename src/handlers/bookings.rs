use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{AdminContact, Booking, NotificationType, Payment};
use crate::services::reservation::{self, ReservationRequest};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateBookingRequest {
    pub user_id: String,
    pub turf_id: String,
    pub date: String,
    pub slot: String,
    #[serde(default = "default_payment_method")]
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
}

fn default_payment_method() -> String {
    "cash".to_string()
}

#[derive(Serialize)]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub turf_id: String,
    pub date: String,
    pub slot: String,
    pub status: String,
    pub payment_method: String,
    pub admin_contact: AdminContact,
    pub booking_date: String,
}

impl BookingResponse {
    pub fn from_model(b: Booking) -> Self {
        Self {
            id: b.id,
            user_id: b.user_id,
            turf_id: b.turf_id,
            date: b.date.format("%Y-%m-%d").to_string(),
            slot: b.slot,
            status: b.status.as_str().to_string(),
            payment_method: b.payment_method.as_str().to_string(),
            admin_contact: b.admin_contact,
            booking_date: b.booking_date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub booking_id: String,
    pub amount: f64,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: String,
    pub date: String,
}

impl PaymentResponse {
    pub fn from_model(p: Payment) -> Self {
        Self {
            id: p.id,
            booking_id: p.booking_id,
            amount: p.amount,
            payment_method: p.payment_method.as_str().to_string(),
            status: p.status.as_str().to_string(),
            transaction_id: p.transaction_id,
            date: p.date.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Serialize)]
pub struct BookingCreatedResponse {
    pub booking: BookingResponse,
    pub payment: PaymentResponse,
}

// POST /bookings
pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingCreatedResponse>), AppError> {
    let outcome = reservation::reserve(
        &state,
        ReservationRequest {
            user_id: body.user_id,
            turf_id: body.turf_id,
            date: body.date,
            slot: body.slot,
            payment_method: body.payment_method,
            payment_intent_id: body.payment_intent_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(BookingCreatedResponse {
            booking: BookingResponse::from_model(outcome.booking),
            payment: PaymentResponse::from_model(outcome.payment),
        }),
    ))
}

// GET /bookings/slots/:turf_id?date=YYYY-MM-DD
//
// Advisory only: the client greys out these tokens, but the admission guard
// re-arbitrates on insert.
#[derive(Deserialize)]
pub struct SlotsQuery {
    pub date: String,
}

pub async fn booked_slots(
    State(state): State<Arc<AppState>>,
    Path(turf_id): Path<String>,
    Query(query): Query<SlotsQuery>,
) -> Result<Json<Vec<String>>, AppError> {
    let date = NaiveDate::parse_from_str(&query.date, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid date: {}", query.date)))?;

    let slots = {
        let db = state.db.lock().unwrap();
        queries::booked_slots(&db, &turf_id, date)?
    };

    Ok(Json(slots))
}

// PUT /bookings/:id/cancel
pub async fn cancel_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let db = state.db.lock().unwrap();

    let booking = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if !queries::cancel_booking(&db, &id)? {
        return Err(AppError::BadRequest("Booking already cancelled".to_string()));
    }

    // Fan-out to the turf owner; a missing turf only loses the notification.
    match queries::get_turf(&db, &booking.turf_id) {
        Ok(Some(turf)) => {
            let message = format!(
                "Booking cancelled for {} on {} at {}",
                turf.name, booking.date, booking.slot
            );
            if let Err(e) = queries::insert_notification(
                &db,
                &booking.user_id,
                &turf.owner_id,
                &turf.id,
                NotificationType::Cancellation,
                &message,
            ) {
                tracing::error!(error = %e, booking_id = %id, "failed to persist cancellation notification");
            }
        }
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, booking_id = %id, "failed to load turf for cancellation notice");
        }
    }

    tracing::info!(booking_id = %id, "booking cancelled");

    let cancelled = queries::get_booking(&db, &id)?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(BookingResponse::from_model(cancelled)))
}

// GET /bookings/history?user_id=...
#[derive(Deserialize)]
pub struct HistoryQuery {
    pub user_id: String,
}

pub async fn booking_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = {
        let db = state.db.lock().unwrap();
        queries::bookings_for_user(&db, &query.user_id)?
    };

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from_model).collect(),
    ))
}
