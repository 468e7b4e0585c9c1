//! Key-value store adapters backing the content loader.

mod lock;
mod memory;
mod redis_store;

pub use memory::{Clock, ManualClock, MemoryKvStore, SystemClock};
pub use redis_store::RedisKvStore;
