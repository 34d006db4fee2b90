use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::services::reservation::ReservationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Reservation(#[from] ReservationError),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("something went wrong")]
    Internal(#[source] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Reservation(e) => match e {
                ReservationError::TurfNotFound | ReservationError::TurfOwnerNotFound => {
                    StatusCode::NOT_FOUND
                }
                ReservationError::InvalidDate(_)
                | ReservationError::InvalidSlot(_)
                | ReservationError::InvalidPaymentMethod(_)
                | ReservationError::PaymentNotConfirmed
                | ReservationError::PaymentDetailMismatch
                | ReservationError::SlotAlreadyBooked => StatusCode::BAD_REQUEST,
                ReservationError::PaymentGatewayUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ReservationError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self {
        AppError::Internal(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internals are logged with context, never surfaced to the caller.
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            match &self {
                AppError::Internal(source) => {
                    tracing::error!(error = ?source, "request failed");
                }
                AppError::Reservation(ReservationError::Unknown(source)) => {
                    tracing::error!(error = ?source, "reservation failed");
                }
                _ => {}
            }
            let body = serde_json::json!({ "message": "Something went wrong" });
            return (status, axum::Json(body)).into_response();
        }

        let mut body = serde_json::json!({ "message": self.to_string() });
        if matches!(
            self,
            AppError::Reservation(ReservationError::PaymentGatewayUnavailable)
        ) {
            body["try_other_methods"] = serde_json::json!(true);
        }

        (status, axum::Json(body)).into_response()
    }
}
