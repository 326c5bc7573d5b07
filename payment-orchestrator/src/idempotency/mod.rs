pub mod handler;
pub mod key_generator;
pub mod storage;

pub use handler::{IdempotencyHandler, IdempotencyHandlerConfig};
pub use storage::{HybridIdempotencyStore, PostgresIdempotencyStore, RedisIdempotencyCache};
