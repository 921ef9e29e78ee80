//! OpenID Connect identity provider library crate.
//!
//! Authenticates end users through pluggable connectors, records their
//! consent, and issues signed ID and access tokens to registered clients,
//! including tokens for trusted peer clients.

pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod templates;
