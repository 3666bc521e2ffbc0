//! Request credentials
//!
//! The admin token arrives in the `admin_token` cookie; passcodes arrive in
//! request bodies. [`AdminToken`] extracts the former and combines with the
//! latter into a [`Credential`] for the policy.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use salon_common::api::{Action, Credential, Resource};
use salon_common::db::Concert;
use std::convert::Infallible;

use super::error::ApiResult;
use crate::AppState;

/// Name of the admin cookie
pub const ADMIN_COOKIE_NAME: &str = "admin_token";

/// Admin cookie lifetime when granted (one week)
pub const ADMIN_COOKIE_MAX_AGE: u64 = 60 * 60 * 24 * 7;

/// Value of the admin cookie, if the request carried one
#[derive(Debug, Clone, Default)]
pub struct AdminToken(pub Option<String>);

impl AdminToken {
    /// Credential for this request, with the passcode from its body
    pub fn credential(&self, passcode: Option<String>) -> Credential {
        Credential {
            admin_token: self.0.clone(),
            passcode,
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AdminToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(AdminToken(cookie_value(&parts.headers, ADMIN_COOKIE_NAME)))
    }
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"').to_string())
}

/// `Set-Cookie` value for the admin cookie
///
/// `max_age == 0` revokes it.
pub fn admin_cookie(value: &str, max_age: u64, secure: bool) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}{}",
        ADMIN_COOKIE_NAME,
        value,
        max_age,
        if secure { "; Secure" } else { "" }
    )
}

/// Check `action` on `concert` for this credential
pub fn require_concert(
    state: &AppState,
    action: Action,
    concert: &Concert,
    credential: &Credential,
) -> ApiResult<()> {
    let resource = Resource::Concert {
        passcode: &concert.passcode,
        frozen: concert.frozen,
    };
    state
        .policy
        .require(action, &resource, credential, &concert.id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_value_finds_named_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; admin_token=abc123; lang=en"),
        );
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE_NAME).as_deref(), Some("abc123"));
        assert_eq!(cookie_value(&headers, "theme").as_deref(), Some("dark"));
        assert!(cookie_value(&headers, "missing").is_none());
    }

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::COOKIE, HeaderValue::from_static("admin_token=\"quoted\""));
        assert_eq!(cookie_value(&headers, ADMIN_COOKIE_NAME).as_deref(), Some("quoted"));
    }

    #[test]
    fn test_admin_cookie_attributes() {
        assert_eq!(
            admin_cookie("s3cret", ADMIN_COOKIE_MAX_AGE, false),
            "admin_token=s3cret; HttpOnly; SameSite=Strict; Path=/; Max-Age=604800"
        );
        assert_eq!(
            admin_cookie("", 0, true),
            "admin_token=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0; Secure"
        );
    }
}
