pub mod payment_repository;
pub mod transaction_repository;

pub use payment_repository::PaymentRepository;
pub use transaction_repository::TransactionRepository;
