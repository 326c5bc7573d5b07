pub mod api;
pub mod config;
pub mod events;
pub mod idempotency;
pub mod ledger_client;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod saga;
pub mod txrecord_client;

pub use saga::PaymentOrchestrator;
