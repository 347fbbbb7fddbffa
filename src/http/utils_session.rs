//! Session cookie and redirect helpers shared by the account and authorize handlers.

use axum::{
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite};

pub(crate) const SESSION_COOKIE_NAME: &str = "session_id";

/// Build the browser session cookie.
pub(crate) fn session_cookie(
    session_id: String,
    max_age: chrono::Duration,
    secure: bool,
) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, session_id))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(max_age.num_seconds()))
        .build()
}

/// Cookie that tells the browser to drop the session.
pub(crate) fn expired_session_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::ZERO)
        .build()
}

/// Accept only same-origin paths as post-login targets.
pub(crate) fn local_redirect(target: Option<&str>) -> String {
    match target {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => "/".to_string(),
    }
}

/// Percent-encode a value for use inside a query string.
pub(crate) fn query_escape(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// 302 Found to `location`.
pub(crate) fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_redirect() {
        assert_eq!(local_redirect(None), "/");
        assert_eq!(local_redirect(Some("")), "/");
        assert_eq!(
            local_redirect(Some("/authorize?client_id=c1")),
            "/authorize?client_id=c1"
        );
        assert_eq!(local_redirect(Some("//evil.example")), "/");
        assert_eq!(local_redirect(Some("https://evil.example")), "/");
        assert_eq!(local_redirect(Some("/\\evil.example")), "/");
    }

    #[test]
    fn test_session_cookie_attributes() {
        let cookie = session_cookie("abc".to_string(), chrono::Duration::hours(24), false);
        assert_eq!(cookie.name(), SESSION_COOKIE_NAME);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::hours(24)));

        let cleared = expired_session_cookie(true);
        assert_eq!(cleared.max_age(), Some(time::Duration::ZERO));
        assert_eq!(cleared.secure(), Some(true));
    }

    #[test]
    fn test_found() {
        let response = found("/login");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/login");
    }

    #[test]
    fn test_query_escape() {
        assert_eq!(
            query_escape("/authorize?client_id=c1&state=x y"),
            "%2Fauthorize%3Fclient_id%3Dc1%26state%3Dx+y"
        );
    }
}
