//! Handles GET/POST /signup - Account registration followed by automatic login

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
    handler_login::RedirectQuery,
    utils_session::{found, local_redirect, query_escape, session_cookie},
};
use crate::errors::AccountError;
use crate::oauth::SignupForm;

#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    pub redirect: Option<String>,
}

/// GET /signup
pub async fn handle_signup_get(
    State(state): State<AppState>,
    Query(query): Query<RedirectQuery>,
) -> Response {
    let redirect = local_redirect(query.redirect.as_deref());
    render_signup(&state, StatusCode::OK, &redirect, "", "", None)
}

/// POST /signup
pub async fn handle_signup_post(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(request): Form<SignupRequest>,
) -> Response {
    let redirect = local_redirect(request.redirect.as_deref());
    let username = request.username.trim().to_string();
    let email = request.email.trim().to_string();

    let form = SignupForm {
        username: username.clone(),
        email: email.clone(),
        password: request.password,
        confirm_password: request.confirm_password,
    };

    match state.accounts.signup(form).await {
        Ok(session) => {
            let cookie = session_cookie(
                session.session_id,
                state.accounts.session_lifetime(),
                *state.config.session_cookie_secure.as_ref(),
            );
            (jar.add(cookie), found(&redirect)).into_response()
        }
        Err(e) => {
            let status = e.status_code();
            let message = match e {
                AccountError::InvalidInput(message) => message,
                AccountError::UsernameTaken => "Username is already taken".to_string(),
                AccountError::EmailTaken => "Email is already registered".to_string(),
                other => {
                    tracing::error!(error = ?other, "signup failed");
                    "Signup is temporarily unavailable".to_string()
                }
            };
            render_signup(&state, status, &redirect, &username, &email, Some(&message))
        }
    }
}

fn render_signup(
    state: &AppState,
    status: StatusCode,
    redirect: &str,
    username: &str,
    email: &str,
    error: Option<&str>,
) -> Response {
    (
        status,
        RenderHtml(
            "signup.html",
            state.template_env.clone(),
            context! {
                redirect => redirect,
                redirect_query => query_escape(redirect),
                username => username,
                email => email,
                error => error,
            },
        ),
    )
        .into_response()
}
