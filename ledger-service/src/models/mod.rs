pub mod account;
pub mod reservation;

pub use account::Account;
pub use reservation::{Reservation, ReservationStatus};
