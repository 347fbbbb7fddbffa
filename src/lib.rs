//! OAuth 2.0 authorization server library crate.
//!
//! Implements the authorization code grant with PKCE on top of pluggable storage,
//! together with the login pages and session handling that the grant relies on.

pub mod config;
pub mod errors;
pub mod http;
pub mod oauth;
pub mod storage;
pub mod templates;
