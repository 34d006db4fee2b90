use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub user_id: String,
    pub turf_id: String,
    pub date: NaiveDate,
    pub slot: String,
    pub status: BookingStatus,
    pub payment_method: PaymentMethod,
    pub admin_contact: AdminContact,
    pub booking_date: NaiveDateTime,
}

/// Snapshot of the turf owner's contact details taken at booking time.
/// Deliberately not refreshed when the owner's profile later changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancelled" => BookingStatus::Cancelled,
            _ => BookingStatus::Confirmed,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Phonepe,
    Gpay,
    Paytm,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Phonepe => "phonepe",
            PaymentMethod::Gpay => "gpay",
            PaymentMethod::Paytm => "paytm",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "card" => Some(PaymentMethod::Card),
            "phonepe" => Some(PaymentMethod::Phonepe),
            "gpay" => Some(PaymentMethod::Gpay),
            "paytm" => Some(PaymentMethod::Paytm),
            _ => None,
        }
    }

    /// Card payments are charged by the processor before admission; the
    /// other methods settle at the venue.
    pub fn requires_online_settlement(&self) -> bool {
        matches!(self, PaymentMethod::Card)
    }
}
