//! Router assembling the OAuth, account, and health endpoints.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use super::{
    context::AppState,
    handler_health::handle_health,
    handler_login::{handle_login_get, handle_login_post},
    handler_logout::handle_logout,
    handler_oauth_authorize::handle_oauth_authorize,
    handler_oauth_token::handle_oauth_token,
    handler_signup::{handle_signup_get, handle_signup_post},
};

/// Build the application router
pub fn build_router(ctx: AppState) -> Router {
    Router::new()
        .route("/authorize", get(handle_oauth_authorize))
        .route("/token", post(handle_oauth_token))
        .route("/login", get(handle_login_get).post(handle_login_post))
        .route("/signup", get(handle_signup_get).post(handle_signup_post))
        .route("/logout", get(handle_logout).post(handle_logout))
        .route("/healthz", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
