pub mod payments;
pub mod reservation;
