//! Handles the authorization endpoint: GET /auth, GET /auth/{connector} and
//! GET /callback/{connector}

use axum::{
    extract::{Path, Query, RawQuery, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_template::TemplateEngine;
use serde_json::json;
use std::collections::HashMap;

use super::context::AppState;
use super::utils_oauth::{authorize_error_response, render_error};
use crate::errors::{HttpError, OAuthError};
use crate::oauth::{AuthorizeQuery, LoginAction};

/// GET /auth
///
/// Sends the browser straight to the only connector, or renders a chooser
/// that carries the original query to each connector's endpoint.
pub async fn handle_auth_index(
    State(state): State<AppState>,
    RawQuery(raw_query): RawQuery,
) -> Response {
    let config = state.server.config();
    let connector_url = |connector_id: &str| match raw_query.as_deref() {
        Some(query) if !query.is_empty() => {
            config.abs_path(&format!("/auth/{}?{}", connector_id, query))
        }
        _ => config.abs_path(&format!("/auth/{}", connector_id)),
    };

    let connectors = state.server.connectors();
    match connectors {
        [] => render_error(
            &state,
            &OAuthError::InvalidRequest("no connectors are configured".to_string()),
        ),
        [connector] => Redirect::to(&connector_url(connector.id())).into_response(),
        connectors => {
            let choices: Vec<_> = connectors
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id(),
                        "name": c.display_name(),
                        "url": connector_url(c.id()),
                    })
                })
                .collect();

            match state
                .template_env
                .render("login.html", json!({ "connectors": choices }))
            {
                Ok(html) => Html(html).into_response(),
                Err(e) => HttpError::TemplateRenderingFailed(e.to_string()).into_response(),
            }
        }
    }
}

/// GET /auth/{connector}
pub async fn handle_authorize(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> Response {
    match state.server.authorize(&connector_id, &query).await {
        Ok(LoginAction::Redirect(location)) => Redirect::to(&location).into_response(),
        Ok(LoginAction::Html(html)) => Html(html).into_response(),
        Err(error) => authorize_error_response(&state, error),
    }
}

/// GET /callback/{connector}
pub async fn handle_callback(
    State(state): State<AppState>,
    Path(connector_id): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    match state.server.callback(&connector_id, &params).await {
        Ok(location) => Redirect::to(&location).into_response(),
        Err(error) => authorize_error_response(&state, error),
    }
}
