pub mod account_repository;
pub mod reservation_repository;

pub use account_repository::AccountRepository;
pub use reservation_repository::ReservationRepository;
