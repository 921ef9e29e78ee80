//! In-memory storage implementations
//!
//! Suitable for development, tests and single-process deployments.

mod oauth;

pub use oauth::MemoryOAuthStorage;
