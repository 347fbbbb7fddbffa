//! Handles GET /authorize - Issues authorization codes for logged-in users

use axum::{
    Json,
    extract::{OriginalUri, Query, State, rejection::QueryRejection},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use serde_json::json;

use super::{
    context::AppState,
    utils_session::{SESSION_COOKIE_NAME, found, query_escape},
};
use crate::errors::OAuthError;
use crate::oauth::types::AuthorizationRequest;

/// GET /authorize
///
/// Without a live session the browser is sent to `/login`, carrying this exact request
/// as the post-login target so it replays unchanged.
pub async fn handle_oauth_authorize(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    jar: CookieJar,
    request: Result<Query<AuthorizationRequest>, QueryRejection>,
) -> Response {
    let session_id = jar.get(SESSION_COOKIE_NAME).map(|cookie| cookie.value());

    let result = match request {
        Ok(Query(request)) => state.auth_server.authorize(request, session_id).await,
        Err(rejection) => Err(OAuthError::InvalidRequest(rejection.body_text())),
    };

    match result {
        Ok(response) => found(&response.redirect_url),
        Err(OAuthError::AuthenticationRequired) => {
            let resume = uri
                .path_and_query()
                .map(|value| value.as_str())
                .unwrap_or("/authorize");
            found(&format!("/login?redirect={}", query_escape(resume)))
        }
        Err(e) => {
            let status = match e {
                OAuthError::ServerError(_) | OAuthError::TemporarilyUnavailable(_) => {
                    e.status_code()
                }
                _ => axum::http::StatusCode::BAD_REQUEST,
            };
            (
                status,
                Json(json!({
                    "error": e.error_code(),
                    "error_description": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}
