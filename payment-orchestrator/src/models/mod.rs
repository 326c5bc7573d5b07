pub mod payment;
pub mod transaction;

pub use payment::{Payment, PaymentStatus};
pub use transaction::{Transaction, TransactionStatus};
