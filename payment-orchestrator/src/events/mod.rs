pub mod producer;
pub mod types;

pub use producer::{EventPublisher, ProducerConfig};
pub use types::{PaymentEventPayload, PaymentEventType, TransactionEventPayload, TransactionEventType};
