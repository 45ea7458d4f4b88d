//! Authenticated principal and token extraction
//!
//! Format-agnostic half of the auth guard chain: what a verified token
//! yields ([`Principal`]), how a guard reports its outcome
//! ([`AuthDecision`]), and where the raw token is read from.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Header carrying the credential unless configured otherwise
pub const DEFAULT_TOKEN_HEADER: &str = "token";

/// Rejection when no credential is presented
pub const NO_TOKEN_MESSAGE: &str = "No token provided";

/// Rejection when the credential fails verification
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// Rejection when the principal neither owns the target nor is an admin
pub const NOT_ALLOWED_MESSAGE: &str = "You are not allowed to perform this action";

/// Rejection when an admin-only route is hit by a non-admin
pub const ADMIN_REQUIRED_MESSAGE: &str = "Admin access required";

/// Identity decoded from a verified token
///
/// Inserted into the request extensions by the guards and available to
/// handlers as an extractor:
///
/// ```rust,ignore
/// async fn my_books(principal: Principal) -> ServiceResult<Vec<Book>> {
///     responses::success(books_owned_by(&principal.id).await)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Opaque user identifier
    pub id: String,

    /// Whether the user holds administrative rights
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,
}

impl Principal {
    /// A regular user
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }

    /// An administrator
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }

    /// Whether this principal owns the resource identified by `target_id`
    pub fn owns(&self, target_id: &str) -> bool {
        self.id == target_id
    }
}

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or_else(|| Error::Unauthorized(NO_TOKEN_MESSAGE.to_string()))
    }
}

/// Outcome of one step of the guard chain
///
/// `Start -> TokenChecked -> (Authenticated | Unauthenticated)`, then
/// `Authenticated -> (Authenticated | Forbidden)` for the authorization
/// steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthDecision {
    /// Token verified, request may proceed
    Authenticated(Principal),
    /// No usable token (401)
    Unauthenticated(String),
    /// Valid token without the required rights (403)
    Forbidden(String),
}

impl AuthDecision {
    /// Whether the request may proceed
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Apply an authorization rule to an authenticated principal
    ///
    /// Rejections pass through unchanged.
    #[must_use]
    pub fn and_then<F>(self, rule: F) -> Self
    where
        F: FnOnce(Principal) -> AuthDecision,
    {
        match self {
            Self::Authenticated(principal) => rule(principal),
            rejected => rejected,
        }
    }

    /// Convert into the principal or the error to respond with
    pub fn into_result(self) -> Result<Principal, Error> {
        match self {
            Self::Authenticated(principal) => Ok(principal),
            Self::Unauthenticated(reason) => Err(Error::Unauthorized(reason)),
            Self::Forbidden(reason) => Err(Error::Forbidden(reason)),
        }
    }
}

/// Verifies a raw token and yields the principal it was issued for
pub trait TokenValidator: Send + Sync + Clone {
    /// Validate a token and extract the principal
    fn verify(&self, token: &str) -> Result<Principal, Error>;
}

/// Read the token from `header`
///
/// A `Bearer ` prefix is accepted and stripped. Missing, empty and
/// non-UTF-8 values yield `None`.
pub fn extract_token(headers: &HeaderMap, header: &str) -> Option<String> {
    let value = headers.get(header)?.to_str().ok()?.trim();
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();

    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    #[test]
    fn test_principal_wire_format() {
        let principal: Principal =
            serde_json::from_str(r#"{"id": "u1", "isAdmin": true}"#).unwrap();
        assert_eq!(principal, Principal::admin("u1"));

        let principal: Principal = serde_json::from_str(r#"{"id": "u2"}"#).unwrap();
        assert!(!principal.is_admin);
    }

    #[test]
    fn test_extract_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers, "token"), None);

        headers.insert("token", HeaderValue::from_static("abc.def.ghi"));
        assert_eq!(extract_token(&headers, "token").as_deref(), Some("abc.def.ghi"));

        headers.insert("token", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_token(&headers, "token").as_deref(), Some("abc.def.ghi"));

        headers.insert("token", HeaderValue::from_static("   "));
        assert_eq!(extract_token(&headers, "token"), None);

        headers.insert("token", HeaderValue::from_bytes(b"\xfftoken").unwrap());
        assert_eq!(extract_token(&headers, "token"), None);
    }

    #[test]
    fn test_decision_chain() {
        let owner_only = |target: &'static str| {
            move |principal: Principal| {
                if principal.owns(target) {
                    AuthDecision::Authenticated(principal)
                } else {
                    AuthDecision::Forbidden(NOT_ALLOWED_MESSAGE.to_string())
                }
            }
        };

        let decision = AuthDecision::Authenticated(Principal::user("u1")).and_then(owner_only("u1"));
        assert!(decision.is_authenticated());

        let decision = AuthDecision::Authenticated(Principal::user("u1")).and_then(owner_only("u2"));
        assert!(matches!(decision.into_result(), Err(Error::Forbidden(_))));

        let decision = AuthDecision::Unauthenticated(NO_TOKEN_MESSAGE.to_string())
            .and_then(owner_only("u1"));
        assert!(matches!(decision.into_result(), Err(Error::Unauthorized(_))));
    }

    #[tokio::test]
    async fn test_principal_extractor() {
        let (mut parts, _) = Request::new(()).into_parts();
        let missing = Principal::from_request_parts(&mut parts, &()).await;
        assert!(matches!(missing, Err(Error::Unauthorized(_))));

        parts.extensions.insert(Principal::user("u9"));
        let found = Principal::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(found.id, "u9");
    }
}
