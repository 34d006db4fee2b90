use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub user_id: String,
    pub admin_id: String,
    pub turf_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub message: String,
    pub read: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Booking,
    Cancellation,
    Review,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Booking => "booking",
            NotificationType::Cancellation => "cancellation",
            NotificationType::Review => "review",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "cancellation" => NotificationType::Cancellation,
            "review" => NotificationType::Review,
            _ => NotificationType::Booking,
        }
    }
}
