//! Application state shared by the HTTP handlers.

use axum_template::engine::Engine;
use std::sync::Arc;

use crate::oauth::OidcServer;

#[cfg(feature = "reload")]
use minijinja_autoreload::AutoReloader;

#[cfg(feature = "reload")]
/// Template engine with auto-reloading support for development.
pub type AppEngine = Engine<AutoReloader>;

#[cfg(feature = "embed")]
use minijinja::Environment;

#[cfg(feature = "embed")]
pub type AppEngine = Engine<Environment<'static>>;

#[cfg(not(any(feature = "reload", feature = "embed")))]
pub type AppEngine = Engine<minijinja::Environment<'static>>;

#[derive(Clone)]
pub struct AppState {
    /// Authorization flow engine
    pub server: Arc<OidcServer>,
    /// Template engine for rendering HTML responses.
    pub template_env: AppEngine,
}
