//! JWT guards and token issuance
//!
//! [`AuthGuard`] verifies HS-signed tokens and exposes the three guards of
//! the chain as axum middleware. [`TokenIssuer`] signs tokens with the same
//! secret for login flows.
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::{middleware::from_fn_with_state, routing::{delete, get, put}, Router};
//! use catalog_service::prelude::*;
//!
//! let guard = AuthGuard::new(&config.jwt)?;
//!
//! let users = Router::new()
//!     .route("/users", get(list_users))
//!     .route_layer(from_fn_with_state(guard.clone(), AuthGuard::verify_admin))
//!     .merge(
//!         Router::new()
//!             .route("/users/{id}", put(update_user).delete(delete_user))
//!             .route_layer(from_fn_with_state(guard.clone(), AuthGuard::verify_ownership_or_admin))
//!             .route_layer(axum::middleware::from_fn(validate_id_param)),
//!     );
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::token::{
    extract_token, AuthDecision, Principal, TokenValidator, ADMIN_REQUIRED_MESSAGE,
    INVALID_TOKEN_MESSAGE, NOT_ALLOWED_MESSAGE, NO_TOKEN_MESSAGE,
};
use crate::{config::JwtConfig, error::Error, ids};

/// Claims carried by every token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Principal identifier
    pub id: String,

    /// Administrative rights
    #[serde(rename = "isAdmin", default)]
    pub is_admin: bool,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Issuer (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Audience (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl From<TokenClaims> for Principal {
    fn from(claims: TokenClaims) -> Self {
        Self {
            id: claims.id,
            is_admin: claims.is_admin,
        }
    }
}

fn config_error(message: String) -> Error {
    Error::Config(Box::new(figment::Error::from(message)))
}

fn parse_algorithm(alg: &str) -> Result<Algorithm, Error> {
    match alg.to_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(config_error(format!(
            "Unsupported JWT algorithm: {alg} (expected HS256, HS384 or HS512)"
        ))),
    }
}

fn secret(config: &JwtConfig) -> Result<&[u8], Error> {
    config
        .secret
        .as_deref()
        .filter(|secret| !secret.is_empty())
        .map(str::as_bytes)
        .ok_or_else(|| {
            config_error(
                "JWT secret is not configured\n\n\
                Set `jwt.secret` in config.toml or CATALOG_JWT__SECRET in the environment"
                    .to_string(),
            )
        })
}

/// Token verifier and guard middleware
///
/// Cheap to clone; the decoding key is shared.
#[derive(Clone)]
pub struct AuthGuard {
    decoding_key: Arc<DecodingKey>,
    validation: Validation,
    header: String,
}

impl AuthGuard {
    /// Build the guard from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when no secret is configured or the
    /// algorithm is not an HMAC algorithm.
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        let algorithm = parse_algorithm(&config.algorithm)?;
        let decoding_key = DecodingKey::from_secret(secret(config)?);

        let mut validation = Validation::new(algorithm);
        if let Some(issuer) = &config.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.audience {
            validation.set_audience(&[audience]);
        }

        Ok(Self {
            decoding_key: Arc::new(decoding_key),
            validation,
            header: config.header.clone(),
        })
    }

    /// Header the token is read from
    pub fn header(&self) -> &str {
        &self.header
    }

    /// Authenticate a request from its headers
    pub fn authenticate(&self, headers: &HeaderMap) -> AuthDecision {
        let Some(token) = extract_token(headers, &self.header) else {
            tracing::debug!(header = %self.header, "No token provided");
            return AuthDecision::Unauthenticated(NO_TOKEN_MESSAGE.to_string());
        };

        match self.verify(&token) {
            Ok(principal) => AuthDecision::Authenticated(principal),
            Err(err) => {
                tracing::debug!(error = %err, "Token verification failed");
                AuthDecision::Unauthenticated(INVALID_TOKEN_MESSAGE.to_string())
            }
        }
    }

    /// Allow the owner of `target_id`, or any admin
    pub fn authorize_owner(principal: Principal, target_id: Option<&str>) -> AuthDecision {
        let owns = target_id.is_some_and(|target| principal.owns(target));
        if owns || principal.is_admin {
            AuthDecision::Authenticated(principal)
        } else {
            tracing::debug!(principal = %principal.id, target = ?target_id, "Ownership check failed");
            AuthDecision::Forbidden(NOT_ALLOWED_MESSAGE.to_string())
        }
    }

    /// Allow admins only
    pub fn authorize_admin(principal: Principal) -> AuthDecision {
        if principal.is_admin {
            AuthDecision::Authenticated(principal)
        } else {
            tracing::debug!(principal = %principal.id, "Admin check failed");
            AuthDecision::Forbidden(ADMIN_REQUIRED_MESSAGE.to_string())
        }
    }

    /// Require a valid token and attach the [`Principal`] to the request
    ///
    /// Use with `axum::middleware::from_fn_with_state`.
    pub async fn verify_token(
        State(guard): State<Self>,
        mut request: Request,
        next: Next,
    ) -> Result<Response, Error> {
        let principal = guard.authenticate(request.headers()).into_result()?;
        request.extensions_mut().insert(principal);
        Ok(next.run(request).await)
    }

    /// Require a valid token whose principal owns the `{id}` path parameter
    /// or is an admin
    ///
    /// Apply with `route_layer` so path parameters are available.
    pub async fn verify_ownership_or_admin(
        State(guard): State<Self>,
        request: Request,
        next: Next,
    ) -> Result<Response, Error> {
        let (mut parts, body) = request.into_parts();

        let principal = guard.authenticate(&parts.headers).into_result()?;
        let target = ids::path_param(&mut parts, ids::DEFAULT_ID_PARAM).await?;
        let principal = Self::authorize_owner(principal, target.as_deref()).into_result()?;

        parts.extensions.insert(principal);
        Ok(next.run(Request::from_parts(parts, body)).await)
    }

    /// Require a valid token whose principal is an admin
    pub async fn verify_admin(
        State(guard): State<Self>,
        mut request: Request,
        next: Next,
    ) -> Result<Response, Error> {
        let principal = guard
            .authenticate(request.headers())
            .and_then(Self::authorize_admin)
            .into_result()?;
        request.extensions_mut().insert(principal);
        Ok(next.run(request).await)
    }
}

impl TokenValidator for AuthGuard {
    fn verify(&self, token: &str) -> Result<Principal, Error> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(token_data.claims.into())
    }
}

/// Signs tokens for principals
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: Arc<EncodingKey>,
    algorithm: Algorithm,
    issuer: Option<String>,
    audience: Option<String>,
    lifetime: TimeDelta,
}

impl TokenIssuer {
    /// Build the issuer from configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] under the same conditions as
    /// [`AuthGuard::new`].
    pub fn new(config: &JwtConfig) -> Result<Self, Error> {
        let algorithm = parse_algorithm(&config.algorithm)?;
        let encoding_key = EncodingKey::from_secret(secret(config)?);
        let lifetime = i64::try_from(config.token_lifetime_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Ok(Self {
            encoding_key: Arc::new(encoding_key),
            algorithm,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            lifetime,
        })
    }

    /// Sign a token valid for the configured lifetime
    pub fn issue(&self, principal: &Principal) -> Result<String, Error> {
        self.issue_with_lifetime(principal, self.lifetime)
    }

    /// Sign a token valid for `lifetime` from now
    pub fn issue_with_lifetime(
        &self,
        principal: &Principal,
        lifetime: TimeDelta,
    ) -> Result<String, Error> {
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            id: principal.id.clone(),
            is_admin: principal.is_admin,
            iat: now,
            exp: now.saturating_add(lifetime.num_seconds()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let header = Header::new(self.algorithm);
        Ok(encode(&header, &claims, &self.encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::StatusCode,
        middleware::from_fn_with_state,
        routing::{get, put},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt;

    const OWNER: &str = "64b7f0c2a1e4d3b2c1a09f8e";
    const OTHER: &str = "64b7f0c2a1e4d3b2c1a09f8f";

    fn config() -> JwtConfig {
        JwtConfig {
            secret: Some("test-secret-with-enough-entropy".to_string()),
            ..Default::default()
        }
    }

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(&config()).unwrap()
    }

    fn app() -> Router {
        let guard = AuthGuard::new(&config()).unwrap();

        let whoami = Router::new()
            .route(
                "/me",
                get(|principal: Principal| async move { principal.id }),
            )
            .route_layer(from_fn_with_state(guard.clone(), AuthGuard::verify_token));

        let owned = Router::new()
            .route("/users/{id}", put(|| async { "updated" }))
            .route_layer(from_fn_with_state(
                guard.clone(),
                AuthGuard::verify_ownership_or_admin,
            ));

        let admin = Router::new()
            .route("/admin/users", get(|| async { "all users" }))
            .route_layer(from_fn_with_state(guard, AuthGuard::verify_admin));

        whoami.merge(owned).merge(admin)
    }

    async fn send(method: &str, uri: &str, token: Option<&str>) -> (StatusCode, Value, String) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("token", token);
        }
        let response = app()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let json = serde_json::from_str(&text).unwrap_or(Value::Null);
        (status, json, text)
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let result = AuthGuard::new(&JwtConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));

        let empty = JwtConfig {
            secret: Some(String::new()),
            ..Default::default()
        };
        assert!(matches!(TokenIssuer::new(&empty), Err(Error::Config(_))));
    }

    #[test]
    fn test_unsupported_algorithm() {
        let config = JwtConfig {
            algorithm: "RS256".to_string(),
            ..config()
        };
        assert!(matches!(AuthGuard::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let guard = AuthGuard::new(&config()).unwrap();
        let token = issuer().issue(&Principal::admin(OWNER)).unwrap();
        assert_eq!(guard.verify(&token).unwrap(), Principal::admin(OWNER));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let other = JwtConfig {
            secret: Some("a-different-secret".to_string()),
            ..Default::default()
        };
        let token = TokenIssuer::new(&other)
            .unwrap()
            .issue(&Principal::user(OWNER))
            .unwrap();
        let guard = AuthGuard::new(&config()).unwrap();
        assert!(matches!(guard.verify(&token), Err(Error::Jwt(_))));
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let (status, body, _) = send("GET", "/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "No token provided");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_garbage_and_expired_tokens_are_unauthorized() {
        let (status, body, _) = send("GET", "/me", Some("not-a-jwt")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");

        let expired = issuer()
            .issue_with_lifetime(&Principal::user(OWNER), TimeDelta::hours(-2))
            .unwrap();
        let (status, body, _) = send("GET", "/me", Some(&expired)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn test_valid_token_attaches_principal() {
        let token = issuer().issue(&Principal::user(OWNER)).unwrap();
        let (status, _, text) = send("GET", "/me", Some(&format!("Bearer {token}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, OWNER);
    }

    #[tokio::test]
    async fn test_ownership_guard() {
        let owner = issuer().issue(&Principal::user(OWNER)).unwrap();
        let (status, _, text) = send("PUT", &format!("/users/{OWNER}"), Some(&owner)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "updated");

        let (status, body, _) = send("PUT", &format!("/users/{OTHER}"), Some(&owner)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You are not allowed to perform this action");

        let admin = issuer().issue(&Principal::admin(OTHER)).unwrap();
        let (status, _, _) = send("PUT", &format!("/users/{OWNER}"), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send("PUT", &format!("/users/{OWNER}"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_ownership_guard_non_utf8_target() {
        let owner = issuer().issue(&Principal::user(OWNER)).unwrap();
        let (status, body, _) = send("PUT", "/users/%FF%FE", Some(&owner)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid ID Format");
    }

    #[tokio::test]
    async fn test_admin_guard() {
        let user = issuer().issue(&Principal::user(OWNER)).unwrap();
        let (status, body, _) = send("GET", "/admin/users", Some(&user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Admin access required");

        let admin = issuer().issue(&Principal::admin(OWNER)).unwrap();
        let (status, _, text) = send("GET", "/admin/users", Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(text, "all users");
    }
}
