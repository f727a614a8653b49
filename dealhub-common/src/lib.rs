//! # DealHub Common Library
//!
//! Shared code for the DealHub services including:
//! - Database schema, migrations and models
//! - Cache abstraction (Redis and in-process) and cache key patterns
//! - Fixed-window rate limiting
//! - Affiliate link helpers
//! - Configuration loading
//! - Utility functions

pub mod affiliate;
pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod rate_limit;
pub mod retailers;
pub mod time;
pub mod utils;

pub use error::{Error, Result};
