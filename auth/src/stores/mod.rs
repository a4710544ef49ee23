//! Storage implementations for auth system.
//!
//! This module provides persistent and ephemeral storage for authentication state:
//!
//! - **Session Store** (Redis) - Ephemeral session storage with TTL
//! - User, device, role, client, token and consent storage lives in `aegis-postgres`.

pub mod session_redis;

// Re-exports
pub use session_redis::RedisSessionStore;
