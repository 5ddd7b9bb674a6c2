//! Directory and counter store implementations.

mod memory;
mod redis;

pub use self::memory::InMemoryStore;
pub use self::redis::RedisCounterStore;
