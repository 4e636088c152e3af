//! Concrete repositories backed by memory, SQLite or a remote API.

mod in_memory;
mod network;
mod sqlite;

pub use in_memory::InMemoryDataSource;
pub use network::NetworkDataSource;
pub use sqlite::{CacheDatabase, SqliteDataSource};
