pub mod api;
pub mod cache;
pub mod config;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod service;

pub use service::LedgerEngine;
