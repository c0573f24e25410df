//! Task storage for the task list service.
//!
//! This crate provides the durable PostgreSQL store, the list cache (Redis or
//! in-process), the cache-aside [`TaskRepository`] that combines them, the
//! non-persistent [`MemoryTaskStore`], and the query rules shared by both
//! modes.

pub mod cache;
mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod repository;
mod traits;

pub use cache::{
    tasks_cache_key, CacheError, CacheResult, MemoryTaskCache, RedisTaskCache, TASKS_CACHE_TTL,
};
pub use error::*;
pub use memory::MemoryTaskStore;
pub use postgres::{PgStoreOptions, PgTaskStore};
pub use query::{RawTaskQuery, TaskFilter};
pub use repository::{CacheStatus, TaskListing, TaskRepository};
pub use traits::*;
