pub mod balance_cache;

pub use balance_cache::{BalanceCache, CacheStats};
