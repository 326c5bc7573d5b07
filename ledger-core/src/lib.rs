pub mod client;
pub mod dto;
pub mod error;
pub mod ids;
pub mod money;

pub use client::{LedgerClient, TransactionRecordClient};
pub use error::{AppError, Result};
pub use ids::{AccountId, PaymentId, ReservationId, TransactionId};
pub use money::{Currency, Money};
