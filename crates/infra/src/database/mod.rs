//! Database implementations

pub mod action_repository;
pub mod cache_repository;
pub mod manager;

pub use action_repository::SqliteActionStore;
pub use cache_repository::SqliteCacheStore;
pub use manager::{DbManager, SqliteConnection};
