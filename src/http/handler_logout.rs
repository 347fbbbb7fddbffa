//! Handles GET/POST /logout - Ends the browser session

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;

use super::{
    context::AppState,
    handler_login::RedirectQuery,
    utils_session::{SESSION_COOKIE_NAME, expired_session_cookie, found, local_redirect},
};

/// GET|POST /logout
pub async fn handle_logout(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<RedirectQuery>,
) -> Response {
    if let Some(cookie) = jar.get(SESSION_COOKIE_NAME) {
        if let Err(e) = state.accounts.logout(cookie.value()).await {
            tracing::error!(error = ?e, "failed to delete session");
        }
    }

    let redirect = local_redirect(query.redirect.as_deref());
    let cleared = expired_session_cookie(*state.config.session_cookie_secure.as_ref());
    (jar.add(cleared), found(&redirect)).into_response()
}
