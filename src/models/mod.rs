pub mod booking;
pub mod notification;
pub mod payment;
pub mod slot;
pub mod turf;
pub mod user;

pub use booking::{AdminContact, Booking, BookingStatus, PaymentMethod};
pub use notification::{Notification, NotificationType};
pub use payment::{Payment, PaymentStatus};
pub use turf::Turf;
pub use user::User;
