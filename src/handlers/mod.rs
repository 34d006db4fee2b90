pub mod bookings;
pub mod health;
pub mod notifications;
pub mod payments;
pub mod turfs;
pub mod webhook;
