//! Terminal error translation
//!
//! Every [`Error`] that escapes a guard, handler or the query engine ends up
//! here and leaves the service as the failure envelope plus a `stack`
//! attribute:
//!
//! ```json
//! { "success": false, "statusCode": 400, "message": "Invalid ID Format", "stack": null }
//! ```
//!
//! Translation happens in two steps. `Error::into_response` classifies the
//! error and renders the production-safe body (`stack: null`), stashing the
//! classification in the response extensions. The [`ErrorTranslator`] layer,
//! installed outermost, re-renders that body with the diagnostic trace when
//! the service is not running in production.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::prelude::*;
//!
//! let config = Config::load()?;
//! let app = Router::new().nest("/books", book_routes(&config)?);
//! let app = ErrorTranslator::from_config(&config).install(app);
//! ```

use std::any::Any;

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;

use crate::config::Config;
use crate::error::{Error, INVALID_ID_MESSAGE};
use crate::middleware::INVALID_TOKEN_MESSAGE;
use crate::query::StorageErrorKind;
use crate::responses::Failure;

/// Message for failures that carry no message of their own
pub const DEFAULT_ERROR_MESSAGE: &str = "Something went wrong!";

/// Message for unique-index violations
pub const DUPLICATE_KEY_MESSAGE: &str = "Duplicate field value entered";

// Upper bound when reading the body of a framework rejection
const REJECTION_BODY_LIMIT: usize = 16 * 1024;

/// Classification of an error, stashed in the response extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedError {
    /// Status code sent to the client
    pub status: StatusCode,
    /// Message sent to the client
    pub message: String,
    /// Diagnostic trace, only sent outside production
    pub trace: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    #[serde(flatten)]
    failure: &'a Failure,
    stack: Option<&'a str>,
}

/// Turns errors into failure envelopes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorTranslator {
    production: bool,
}

impl ErrorTranslator {
    /// Translator that hides traces when `production` is set
    pub fn new(production: bool) -> Self {
        Self { production }
    }

    /// Translator that never exposes traces
    pub fn production() -> Self {
        Self::new(true)
    }

    /// Translator that always exposes traces
    pub fn development() -> Self {
        Self::new(false)
    }

    /// Translator matching the configured environment
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.service.is_production())
    }

    /// Whether traces are hidden
    pub fn is_production(&self) -> bool {
        self.production
    }

    /// Map an error to the status code and message the client sees
    pub fn classify(error: &Error) -> (StatusCode, String) {
        match error {
            Error::Storage(storage) => match storage.kind {
                StorageErrorKind::MalformedId => {
                    (StatusCode::BAD_REQUEST, INVALID_ID_MESSAGE.to_string())
                }
                StorageErrorKind::DuplicateKey => {
                    (StatusCode::BAD_REQUEST, DUPLICATE_KEY_MESSAGE.to_string())
                }
                _ => internal(&storage.message),
            },
            Error::Upload(message) => (StatusCode::BAD_REQUEST, message_or_default(message)),
            Error::InvalidId => (StatusCode::BAD_REQUEST, INVALID_ID_MESSAGE.to_string()),
            Error::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            Error::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message.clone()),
            Error::Jwt(_) => (StatusCode::UNAUTHORIZED, INVALID_TOKEN_MESSAGE.to_string()),
            Error::Forbidden(message) => (StatusCode::FORBIDDEN, message.clone()),
            Error::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
            Error::Status { status, message } => (*status, message_or_default(message)),
            Error::Config(err) => internal(&err.to_string()),
            Error::Internal(message) => internal(message),
        }
    }

    /// Translate an error into a complete response
    pub fn render(&self, error: &Error) -> Response {
        let (status, message) = Self::classify(error);

        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = ?error, "{}", message);
        } else {
            tracing::debug!(status = status.as_u16(), "{}", message);
        }

        let translated = TranslatedError {
            status,
            message,
            trace: format!("{error:?}"),
        };
        let mut response = self.body(&translated);
        response.extensions_mut().insert(translated);
        response
    }

    fn body(&self, translated: &TranslatedError) -> Response {
        let failure = Failure::new(translated.status, translated.message.as_str());
        let body = ErrorBody {
            failure: &failure,
            stack: (!self.production).then_some(translated.trace.as_str()),
        };
        (translated.status, Json(body)).into_response()
    }

    /// Re-render translated errors with this translator's trace policy
    ///
    /// Error responses produced by the framework itself (extractor
    /// rejections, `405 Method Not Allowed`) carry no translation and are
    /// rendered as failure envelopes here.
    ///
    /// Use with `axum::middleware::from_fn_with_state`, outside every layer
    /// that may produce an [`Error`].
    pub async fn middleware(
        State(translator): State<Self>,
        request: Request,
        next: Next,
    ) -> Response {
        let response = next.run(request).await;

        match response.extensions().get::<TranslatedError>().cloned() {
            Some(_) if translator.production => response,
            Some(translated) => {
                let (mut parts, _) = response.into_parts();
                let (_, body) = translator.body(&translated).into_parts();
                parts.headers.remove(header::CONTENT_LENGTH);
                Response::from_parts(parts, body)
            }
            None if response.status().is_client_error() || response.status().is_server_error() => {
                translator.translate_rejection(response).await
            }
            None => response,
        }
    }

    async fn translate_rejection(&self, response: Response) -> Response {
        let (parts, body) = response.into_parts();
        let message = axum::body::to_bytes(body, REJECTION_BODY_LIMIT)
            .await
            .map(|bytes| String::from_utf8_lossy(&bytes).trim().to_string())
            .unwrap_or_default();
        let message = if message.is_empty() {
            parts
                .status
                .canonical_reason()
                .unwrap_or(DEFAULT_ERROR_MESSAGE)
                .to_string()
        } else {
            message
        };

        let mut rendered = self.render(&Error::with_status(parts.status, message));
        if let Some(allow) = parts.headers.get(header::ALLOW) {
            rendered.headers_mut().insert(header::ALLOW, allow.clone());
        }
        rendered
    }

    /// Attach the not-found fallback, panic recovery and this translator to
    /// `router`
    ///
    /// Call after every route and guard layer has been added.
    pub fn install<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.fallback(not_found_fallback).layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(self, Self::middleware))
                .layer(CatchPanicLayer::custom(panic_response)),
        )
    }
}

fn internal(message: &str) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, message_or_default(message))
}

fn message_or_default(message: &str) -> String {
    if message.is_empty() {
        DEFAULT_ERROR_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// Router fallback for unmatched paths
pub async fn not_found_fallback(uri: Uri) -> Error {
    Error::NotFound(format!("Not found - {}", uri.path()))
}

fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response<Body> {
    let message = if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    };
    Error::Internal(message).into_response()
}
