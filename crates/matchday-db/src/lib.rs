//! Matchday DB - PostgreSQL repository and Redis backends.
//!
//! This crate implements the core persistence traits:
//! - [`SportsRepository`] - catalog persistence over PostgreSQL
//! - [`RedisCache`] / [`RedisLock`] - Redis-backed cache and sync lock,
//!   with [`CacheBackend`] / [`LockBackend`] enums for optional Redis
//! - [`RedisDelayQueue`] / [`QueueBackend`] - delayed notification delivery

mod queue;
mod redis;
mod repository;

pub use queue::{QueueBackend, RedisDelayQueue};
pub use self::redis::{CacheBackend, LockBackend, RedisCache, RedisLock, connect};
pub use repository::SportsRepository;
