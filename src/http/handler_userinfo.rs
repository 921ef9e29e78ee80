//! Handles GET|POST /userinfo - OpenID Connect UserInfo endpoint

use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};

use super::context::AppState;
use super::middleware_auth::{ExtractedBearer, bearer_challenge};

/// Get OpenID Connect UserInfo
/// GET /userinfo
///
/// Returns the claims of the signed access token, without token bookkeeping.
pub async fn get_userinfo_handler(
    State(state): State<AppState>,
    ExtractedBearer(access_token): ExtractedBearer,
) -> Response {
    match state.server.userinfo(&access_token).await {
        Ok(claims) => Json(claims).into_response(),
        Err(error) => {
            tracing::debug!(error = %error, "userinfo rejected");
            bearer_challenge(error)
        }
    }
}
