//! Handles GET /oob - shows an out-of-band authorization code

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse, Response},
};
use axum_template::TemplateEngine;
use serde::Deserialize;
use serde_json::json;

use super::context::AppState;
use super::utils_oauth::render_error;
use crate::errors::{HttpError, OAuthError};

#[derive(Debug, Deserialize)]
pub struct OobQuery {
    pub code: Option<String>,
}

/// GET /oob?code=<code>
pub async fn handle_oob(State(state): State<AppState>, Query(query): Query<OobQuery>) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return render_error(
            &state,
            &OAuthError::InvalidRequest("missing code".to_string()),
        );
    };

    match state.template_env.render("oob.html", json!({ "code": code })) {
        Ok(html) => Html(html).into_response(),
        Err(e) => HttpError::TemplateRenderingFailed(e.to_string()).into_response(),
    }
}
