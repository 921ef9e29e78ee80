//! Axum HTTP transport for the authorization server.

pub mod context;
mod handler_approval;
mod handler_authorize;
mod handler_oob;
mod handler_token;
mod handler_userinfo;
mod handler_well_known;
mod middleware_auth;
pub mod server;
mod utils_oauth;

pub use context::{AppEngine, AppState};
pub use server::{bind_listener, build_router};
