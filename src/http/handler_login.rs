//! Handles GET/POST /login - Password login that opens a browser session

use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use axum_template::RenderHtml;
use minijinja::context;
use serde::Deserialize;

use super::{
    context::AppState,
    utils_session::{found, local_redirect, query_escape, session_cookie},
};
use crate::errors::AccountError;

#[derive(Debug, Default, Deserialize)]
pub struct RedirectQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub pass: String,
    pub redirect: Option<String>,
}

/// GET /login
pub async fn handle_login_get(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let redirect = local_redirect(query.redirect.as_deref());
    render_login(&state, StatusCode::OK, &redirect, None)
}

/// POST /login
pub async fn handle_login_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    let redirect = local_redirect(form.redirect.as_deref());
    let username = form.user.trim();

    match state.accounts.login(username, &form.pass).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user_id, "user logged in");
            let cookie = session_cookie(
                session.session_id,
                state.accounts.session_lifetime(),
                *state.config.session_cookie_secure.as_ref(),
            );
            (jar.add(cookie), found(&redirect)).into_response()
        }
        Err(e) => {
            let status = e.status_code();
            if status.is_server_error() {
                tracing::error!(error = ?e, "login failed");
            } else {
                tracing::warn!(username = %username, error = %e, "login rejected");
            }
            let message = match e {
                AccountError::InvalidInput(message) => message,
                AccountError::InvalidCredentials => "Invalid username or password".to_string(),
                _ => "Login is temporarily unavailable".to_string(),
            };
            render_login(&state, status, &redirect, Some(&message))
        }
    }
}

fn render_login(state: &AppState, status: StatusCode, redirect: &str, error: Option<&str>) -> Response {
    (
        status,
        RenderHtml(
            "login.html",
            state.template_env.clone(),
            context! {
                redirect => redirect,
                redirect_query => query_escape(redirect),
                error => error,
            },
        ),
    )
        .into_response()
}
