use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use crate::db::queries;
use crate::models::{
    slot, AdminContact, Booking, BookingStatus, NotificationType, Payment, PaymentMethod,
    PaymentStatus, Turf, User,
};
use crate::services::payments::ChargeMetadata;
use crate::state::AppState;

/// Everything that can deny an admission, one variant per failure mode so
/// callers branch on kind instead of matching message strings. Display
/// strings double as the client-facing messages.
#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    #[error("Turf not found")]
    TurfNotFound,

    #[error("Turf admin not found")]
    TurfOwnerNotFound,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unknown time slot: {0}")]
    InvalidSlot(String),

    #[error("Unsupported payment method: {0}")]
    InvalidPaymentMethod(String),

    #[error("Payment has not been confirmed")]
    PaymentNotConfirmed,

    #[error("Payment does not match the requested booking")]
    PaymentDetailMismatch,

    #[error("This slot is already booked")]
    SlotAlreadyBooked,

    #[error("Payment gateway is temporarily unavailable")]
    PaymentGatewayUnavailable,

    #[error("unknown error")]
    Unknown(#[source] anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct ReservationRequest {
    pub user_id: String,
    pub turf_id: String,
    pub date: String,
    pub slot: String,
    pub payment_method: String,
    pub payment_intent_id: Option<String>,
}

#[derive(Debug)]
pub struct ReservationOutcome {
    pub booking: Booking,
    pub payment: Payment,
}

/// Admit or deny a reservation. Preconditions are checked in a fixed order,
/// each with its own error; the admission itself is a single insert that the
/// bookings unique index arbitrates. Post-admission side effects never undo
/// an admission: the booking row is the durable source of truth.
pub async fn reserve(
    state: &Arc<AppState>,
    req: ReservationRequest,
) -> Result<ReservationOutcome, ReservationError> {
    // Turf and owner snapshot. The lock is scoped so it is not held across
    // the payment-processor round trip below.
    let (turf, owner) = {
        let db = state.db.lock().unwrap();
        let turf = queries::get_turf(&db, &req.turf_id)
            .map_err(ReservationError::Unknown)?
            .ok_or(ReservationError::TurfNotFound)?;
        let owner = queries::get_user(&db, &turf.owner_id)
            .map_err(ReservationError::Unknown)?
            .ok_or(ReservationError::TurfOwnerNotFound)?;
        (turf, owner)
    };

    let date = NaiveDate::parse_from_str(&req.date, "%Y-%m-%d")
        .map_err(|_| ReservationError::InvalidDate(req.date.clone()))?;

    if !slot::is_valid_slot(&req.slot) {
        return Err(ReservationError::InvalidSlot(req.slot.clone()));
    }

    let method = PaymentMethod::parse(&req.payment_method)
        .ok_or_else(|| ReservationError::InvalidPaymentMethod(req.payment_method.clone()))?;

    let transaction_id = if method.requires_online_settlement() {
        let token = req
            .payment_intent_id
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(ReservationError::PaymentNotConfirmed)?;
        verify_payment(state, token, &req).await?;
        token.to_string()
    } else {
        format!("venue-{}", Uuid::new_v4())
    };

    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: req.user_id.clone(),
        turf_id: turf.id.clone(),
        date,
        slot: req.slot.clone(),
        status: BookingStatus::Confirmed,
        payment_method: method,
        admin_contact: AdminContact {
            name: owner.name.clone(),
            phone: owner.phone.clone(),
            email: owner.email.clone(),
        },
        booking_date: Utc::now().naive_utc(),
    };

    let payment = Payment {
        id: Uuid::new_v4().to_string(),
        user_id: req.user_id.clone(),
        booking_id: booking.id.clone(),
        turf_id: turf.id.clone(),
        amount: turf.price,
        payment_method: method,
        status: if method.requires_online_settlement() {
            PaymentStatus::Succeeded
        } else {
            PaymentStatus::Pending
        },
        transaction_id,
        date: Utc::now().naive_utc(),
    };

    {
        let db = state.db.lock().unwrap();

        match queries::insert_booking(&db, &booking) {
            Ok(()) => {}
            Err(e) if queries::is_unique_violation(&e) => {
                tracing::info!(
                    turf_id = %turf.id,
                    date = %req.date,
                    slot = %req.slot,
                    "admission lost to a concurrent booking"
                );
                return Err(ReservationError::SlotAlreadyBooked);
            }
            Err(e) => return Err(ReservationError::Unknown(e.into())),
        }

        // From here on the booking stands. Failures below are logged, not
        // propagated.
        record_side_effects(&db, &booking, &payment, &turf, &owner);
    }

    tracing::info!(
        booking_id = %booking.id,
        turf_id = %turf.id,
        user_id = %booking.user_id,
        slot = %booking.slot,
        method = method.as_str(),
        "booking admitted"
    );

    Ok(ReservationOutcome { booking, payment })
}

async fn verify_payment(
    state: &Arc<AppState>,
    token: &str,
    req: &ReservationRequest,
) -> Result<(), ReservationError> {
    let verification = state.payments.verify(token).await.map_err(|e| {
        tracing::warn!(error = %e, "payment verification unreachable");
        ReservationError::PaymentGatewayUnavailable
    })?;

    if !verification.succeeded {
        return Err(ReservationError::PaymentNotConfirmed);
    }

    let expected = ChargeMetadata {
        user_id: req.user_id.clone(),
        turf_id: req.turf_id.clone(),
        date: req.date.clone(),
        slot: req.slot.clone(),
    };

    match verification.metadata {
        Some(ref metadata) if *metadata == expected => Ok(()),
        _ => Err(ReservationError::PaymentDetailMismatch),
    }
}

fn record_side_effects(
    db: &rusqlite::Connection,
    booking: &Booking,
    payment: &Payment,
    turf: &Turf,
    owner: &User,
) {
    if let Err(e) = queries::insert_payment(db, payment) {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to persist payment record");
    }

    let message = format!(
        "New booking for {} on {} at {}",
        turf.name, booking.date, booking.slot
    );
    if let Err(e) = queries::insert_notification(
        db,
        &booking.user_id,
        &owner.id,
        &turf.id,
        NotificationType::Booking,
        &message,
    ) {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to persist notification");
    }

    if let Err(e) = queries::append_user_booking(db, &booking.user_id, &booking.id) {
        tracing::error!(error = %e, booking_id = %booking.id, "failed to append user booking");
    }
}
