//! Core types and shared functionality for presetsync.
//!
//! This crate provides:
//! - Bounded in-memory response cache with TTL and LRU eviction
//! - Cache key derivation that never embeds credentials
//! - The `ApiError` taxonomy and user-facing error classification
//! - Unified error types
//! - Configuration structures

pub mod api_error;
pub mod cache;
pub mod config;
pub mod error;

pub use api_error::{ApiError, ErrorKind, ErrorValue, error_message, is_rate_limit_error};
pub use cache::{ApiCache, CacheStats, api_cache, generate_cache_key, init_api_cache};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
