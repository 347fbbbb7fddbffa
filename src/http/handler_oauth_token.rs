//! Handles POST /token - Exchanges authorization codes for bearer access tokens

use axum::{
    Form, Json,
    extract::{State, rejection::FormRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::context::AppState;
use crate::errors::OAuthError;
use crate::oauth::{
    auth_server::extract_client_auth,
    types::{TokenForm, TokenRequest},
};

/// POST /token
pub async fn handle_oauth_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<Form<TokenForm>, FormRejection>,
) -> Response {
    let result = match form {
        Ok(Form(form)) => {
            let client_auth = extract_client_auth(&headers, &form);
            match TokenRequest::try_from(form) {
                Ok(request) => state.auth_server.token(request, client_auth).await,
                Err(e) => Err(e),
            }
        }
        Err(rejection) => Err(OAuthError::InvalidRequest(rejection.body_text())),
    };

    let mut response = match result {
        Ok(token) => (StatusCode::OK, Json(token)).into_response(),
        Err(e) => token_error(&e),
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    response
}

fn token_error(error: &OAuthError) -> Response {
    let status = error.status_code();
    let body = Json(json!({
        "error": error.error_code(),
        "error_description": error.to_string(),
    }));

    if status == StatusCode::UNAUTHORIZED {
        (
            status,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"))],
            body,
        )
            .into_response()
    } else {
        (status, body).into_response()
    }
}
