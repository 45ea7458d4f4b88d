//! Resource identifiers and the identifier guard
//!
//! Catalog documents are keyed by the store's native object identifier:
//! exactly 24 hexadecimal characters. Requests naming a malformed identifier
//! are rejected with `400 Invalid ID Format` before any guard or handler
//! touches the store.
//!
//! ```rust
//! use catalog_service::ids::{validate_id, ResourceId};
//!
//! assert!(validate_id("64b7f0c2a1e4d3b2c1a09f8e").is_ok());
//! assert!(validate_id("123").is_err());
//!
//! let id: ResourceId = "64B7F0C2A1E4D3B2C1A09F8E".parse().unwrap();
//! assert_eq!(id.as_str(), "64B7F0C2A1E4D3B2C1A09F8E");
//! ```
//!
//! # Guarding routes
//!
//! ```rust,ignore
//! use axum::{middleware, routing::get, Router};
//! use catalog_service::ids::{validate_id_param, IdGuard};
//!
//! let books = Router::new()
//!     .route("/books/{id}", get(show_book).delete(delete_book))
//!     .route_layer(middleware::from_fn(validate_id_param));
//!
//! let shelves = Router::new()
//!     .route("/shelves/{shelfId}/books", get(list_shelf))
//!     .route_layer(middleware::from_fn_with_state(
//!         IdGuard::param("shelfId"),
//!         IdGuard::middleware,
//!     ));
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use axum::{
    extract::{rejection::RawPathParamsRejection, FromRequestParts, RawPathParams, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Path parameter checked by [`validate_id_param`]
pub const DEFAULT_ID_PARAM: &str = "id";

static OBJECT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{24}$").expect("object id pattern should be valid")
});

/// Check that `raw` is a well-formed resource identifier
///
/// # Errors
///
/// Returns [`Error::InvalidId`] when it is not.
pub fn validate_id(raw: &str) -> Result<()> {
    if OBJECT_ID.is_match(raw) {
        Ok(())
    } else {
        Err(Error::InvalidId)
    }
}

/// A validated resource identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId(String);

impl ResourceId {
    /// The identifier as given, case preserved
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        validate_id(raw)?;
        Ok(Self(raw.to_string()))
    }
}

impl TryFrom<String> for ResourceId {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self> {
        validate_id(&raw)?;
        Ok(Self(raw))
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.0
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read a raw path parameter of the matched route
///
/// Returns `Ok(None)` when the route has no parameter called `name`. A
/// parameter that does not decode to UTF-8 cannot be an identifier and is
/// reported as [`Error::InvalidId`].
pub(crate) async fn path_param(parts: &mut Parts, name: &str) -> Result<Option<String>> {
    let params = RawPathParams::from_request_parts(parts, &())
        .await
        .map_err(|rejection| match rejection {
            RawPathParamsRejection::InvalidUtf8InPathParam(_) => Error::InvalidId,
            other => Error::Internal(other.body_text()),
        })?;

    Ok(params
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string()))
}

/// Identifier guard for a named path parameter
///
/// Must be applied with `route_layer` so the route, and therefore its path
/// parameters, are matched before the guard runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdGuard {
    param: String,
}

impl IdGuard {
    /// Guard the path parameter called `name`
    pub fn param(name: impl Into<String>) -> Self {
        Self { param: name.into() }
    }

    /// Name of the guarded parameter
    pub fn name(&self) -> &str {
        &self.param
    }

    /// Middleware function for axum
    ///
    /// Use with `axum::middleware::from_fn_with_state`.
    pub async fn middleware(
        State(guard): State<Self>,
        request: Request,
        next: Next,
    ) -> Result<Response> {
        guard.check(request, next).await
    }

    async fn check(&self, request: Request, next: Next) -> Result<Response> {
        let (mut parts, body) = request.into_parts();

        let raw = path_param(&mut parts, &self.param).await?.ok_or_else(|| {
            Error::Internal(format!("route has no path parameter '{}'", self.param))
        })?;

        if let Err(err) = validate_id(&raw) {
            tracing::debug!(param = %self.param, value = %raw, "Rejected malformed identifier");
            return Err(err);
        }

        Ok(next.run(Request::from_parts(parts, body)).await)
    }
}

impl Default for IdGuard {
    fn default() -> Self {
        Self::param(DEFAULT_ID_PARAM)
    }
}

/// Reject requests whose `{id}` path parameter is not a resource identifier
///
/// Use with `axum::middleware::from_fn` on routes declaring `{id}`.
pub async fn validate_id_param(request: Request, next: Next) -> Result<Response> {
    IdGuard::default().check(request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tower::ServiceExt;

    const VALID: &str = "64b7f0c2a1e4d3b2c1a09f8e";

    #[test]
    fn test_validate_id() {
        assert!(validate_id(VALID).is_ok());
        assert!(validate_id("64B7F0C2A1E4D3B2C1A09F8E").is_ok());
        for bad in ["123", "", "64b7f0c2a1e4d3b2c1a09f8g", "64b7f0c2a1e4d3b2c1a09f8e0"] {
            assert!(matches!(validate_id(bad), Err(Error::InvalidId)), "{bad}");
        }
    }

    #[test]
    fn test_resource_id_parsing_and_serde() {
        let id: ResourceId = VALID.parse().unwrap();
        assert_eq!(id.to_string(), VALID);
        assert_eq!(serde_json::to_value(&id).unwrap(), json!(VALID));

        let parsed: std::result::Result<ResourceId, _> = serde_json::from_value(json!("nope"));
        assert!(parsed.is_err());
    }

    fn app(hits: Arc<AtomicUsize>) -> Router {
        let counter = hits.clone();
        let by_id = Router::new()
            .route(
                "/books/{id}",
                get(move || {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        "found"
                    }
                }),
            )
            .route_layer(middleware::from_fn(validate_id_param));

        let by_book = Router::new()
            .route("/shelves/{shelfId}/books", get(|| async { "shelf" }))
            .route_layer(middleware::from_fn_with_state(
                IdGuard::param("shelfId"),
                IdGuard::middleware,
            ));

        by_id.merge(by_book)
    }

    async fn send(app: Router, uri: &str) -> (StatusCode, Vec<u8>) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn test_malformed_id_short_circuits() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (status, body) = send(app(hits.clone()), "/books/123").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 400);
        assert_eq!(body["message"], "Invalid ID Format");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_id_passes_through() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (status, body) = send(app(hits.clone()), &format!("/books/{VALID}")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"found");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_utf8_id_is_malformed() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (status, body) = send(app(hits.clone()), "/books/%FF%FE").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["message"], "Invalid ID Format");
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_named_parameter_guard() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (status, _) = send(app(hits.clone()), "/shelves/xyz/books").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(app(hits), &format!("/shelves/{VALID}/books")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"shelf");
    }
}
