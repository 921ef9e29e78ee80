//! Handles GET|POST /approval - end user consent

use axum::{
    Form,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_template::TemplateEngine;
use serde::Deserialize;
use serde_json::json;

use super::context::AppState;
use super::utils_oauth::{authorize_error_response, render_error};
use crate::errors::{HttpError, OAuthError};

#[derive(Debug, Deserialize)]
pub struct ApprovalQuery {
    pub req: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApprovalForm {
    pub req: Option<String>,
    /// `approve` grants; anything else denies
    pub approval: Option<String>,
}

fn missing_request(state: &AppState) -> Response {
    render_error(
        state,
        &OAuthError::InvalidRequest("missing req parameter".to_string()),
    )
}

/// GET /approval?req=<id>
pub async fn handle_approval_page(
    State(state): State<AppState>,
    Query(query): Query<ApprovalQuery>,
) -> Response {
    let Some(request_id) = query.req.filter(|r| !r.is_empty()) else {
        return missing_request(&state);
    };

    let prompt = match state.server.request_approval(&request_id).await {
        Ok(prompt) => prompt,
        Err(error) => return authorize_error_response(&state, error),
    };

    let context = json!({
        "prompt": prompt,
        "action": state.server.config().abs_path("/approval"),
    });
    match state.template_env.render("approval.html", context) {
        Ok(html) => Html(html).into_response(),
        Err(e) => HttpError::TemplateRenderingFailed(e.to_string()).into_response(),
    }
}

/// POST /approval
pub async fn handle_approval_decision(
    State(state): State<AppState>,
    Form(form): Form<ApprovalForm>,
) -> Response {
    let Some(request_id) = form.req.filter(|r| !r.is_empty()) else {
        return missing_request(&state);
    };
    let approved = form.approval.as_deref() == Some("approve");

    match state.server.decide(&request_id, approved).await {
        Ok(location) => Redirect::to(&location).into_response(),
        Err(error) => authorize_error_response(&state, error),
    }
}
