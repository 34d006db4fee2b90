/// The bookable hour tokens a turf offers. Morning and evening blocks only,
/// matching what the booking client renders.
pub const SLOT_TOKENS: [&str; 9] = [
    "06:00-07:00",
    "07:00-08:00",
    "08:00-09:00",
    "09:00-10:00",
    "16:00-17:00",
    "17:00-18:00",
    "18:00-19:00",
    "19:00-20:00",
    "20:00-21:00",
];

pub fn is_valid_slot(token: &str) -> bool {
    SLOT_TOKENS.contains(&token)
}
