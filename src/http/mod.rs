//! Axum HTTP handlers for the OAuth endpoints and the account pages.

pub mod context;
mod handler_health;
mod handler_login;
mod handler_logout;
mod handler_oauth_authorize;
mod handler_oauth_token;
mod handler_signup;
pub mod server;
mod utils_session;

pub use context::{AppEngine, AppState};
pub use server::build_router;
