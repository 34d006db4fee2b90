use serde::{Deserialize, Serialize};

/// The slice of the account record the reservation workflow touches:
/// enough to snapshot owner contact details onto a booking. Registration
/// and authentication live upstream of this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: String,
}
