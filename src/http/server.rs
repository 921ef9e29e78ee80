//! Router configuration for the discovery, authorization, and token endpoints.

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    routing::get,
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::errors::HttpError;

use super::{
    context::AppState,
    handler_approval::{handle_approval_decision, handle_approval_page},
    handler_authorize::{handle_auth_index, handle_authorize, handle_callback},
    handler_oob::handle_oob,
    handler_token::handle_token,
    handler_userinfo::get_userinfo_handler,
    handler_well_known::{jwks_handler, openid_configuration_handler},
};

/// Bind the listening socket, failing early when the address is unavailable.
pub async fn bind_listener(bind_address: &str) -> Result<TcpListener, HttpError> {
    TcpListener::bind(bind_address)
        .await
        .map_err(|e| HttpError::BindFailed(bind_address.to_string(), e.to_string()))
}

/// Build the application router.
///
/// Endpoints are served under the issuer URL's path. `allowed_origins`
/// enables CORS for the endpoints browsers call directly.
pub fn build_router(ctx: AppState, allowed_origins: &[String]) -> Router {
    let mut api_routes = Router::new()
        .route(
            "/.well-known/openid-configuration",
            get(openid_configuration_handler),
        )
        .route("/keys", get(jwks_handler))
        .route("/token", axum::routing::post(handle_token))
        .route(
            "/userinfo",
            get(get_userinfo_handler).post(get_userinfo_handler),
        );

    if !allowed_origins.is_empty() {
        let allow_origin = if allowed_origins.iter().any(|origin| origin == "*") {
            AllowOrigin::any()
        } else {
            let origins: Vec<HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| match origin.parse::<HeaderValue>() {
                    Ok(value) => Some(value),
                    Err(e) => {
                        tracing::warn!(origin = %origin, error = ?e, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(origins)
        };
        let cors = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);
        api_routes = api_routes.layer(cors);
    }

    let flow_routes = Router::new()
        .route("/auth", get(handle_auth_index))
        .route("/auth/{connector}", get(handle_authorize))
        .route("/callback/{connector}", get(handle_callback))
        .route(
            "/approval",
            get(handle_approval_page).post(handle_approval_decision),
        )
        .route("/oob", get(handle_oob));

    let routes = api_routes.merge(flow_routes);
    let issuer_path = ctx.server.config().issuer_path();

    let router = if issuer_path.is_empty() {
        routes
    } else {
        Router::new().nest(&issuer_path, routes)
    };

    router.layer(TraceLayer::new_for_http()).with_state(ctx)
}
