//! Response envelope factory
//!
//! Every JSON body leaving the service is one of exactly two shapes:
//!
//! ```json
//! { "success": true,  "data": ... }
//! { "success": false, "statusCode": 404, "message": "Book not found" }
//! ```
//!
//! Handlers never build bodies by hand; they go through [`success`],
//! [`failure`], [`failure_message`] or [`not_found`].
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use catalog_service::responses::{self, ServiceResult};
//!
//! async fn show_book(Path(id): Path<String>) -> ServiceResult<Book> {
//!     match books.find_one(&id).await {
//!         Some(book) => responses::success(book),
//!         None => responses::not_found("book"),
//!     }
//! }
//! ```

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Status used by [`failure_message`] when none is given
pub const DEFAULT_FAILURE_STATUS: StatusCode = StatusCode::BAD_REQUEST;

/// Outcome of one service operation
///
/// `success` is the discriminant on the wire. A value is built once and
/// passed up the call chain unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceResult<T> {
    /// Operation succeeded with a payload
    Success {
        /// The payload, exactly as handed to [`success`]
        data: T,
    },
    /// Operation failed
    Failure(Failure),
}

/// Failure half of the envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    status_code: StatusCode,
    message: String,
}

impl Failure {
    /// Create a failure with an explicit status code
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
        }
    }

    /// HTTP status code reported in the body and on the response
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Client-facing message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl<T> ServiceResult<T> {
    /// Whether this is the success shape
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Borrow the payload of a success
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success { data } => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// Borrow the failure, if any
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Convert into a standard `Result`
    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success { data } => Ok(data),
            Self::Failure(failure) => Err(failure),
        }
    }
}

impl<T> From<Failure> for ServiceResult<T> {
    fn from(failure: Failure) -> Self {
        Self::Failure(failure)
    }
}

/// `{success: true, data}`
pub fn success<T>(data: T) -> ServiceResult<T> {
    ServiceResult::Success { data }
}

/// `{success: false, statusCode, message}`
pub fn failure<T>(status_code: StatusCode, message: impl Into<String>) -> ServiceResult<T> {
    ServiceResult::Failure(Failure::new(status_code, message))
}

/// Failure with the default 400 status
pub fn failure_message<T>(message: impl Into<String>) -> ServiceResult<T> {
    failure(DEFAULT_FAILURE_STATUS, message)
}

/// 404 failure reading `"<Target> not found"`
///
/// The target name is normalized: first letter uppercased, the rest
/// lowercased, so `"book"`, `"BOOK"` and `"bOoK"` all yield `"Book not found"`.
pub fn not_found<T>(target: &str) -> ServiceResult<T> {
    failure(
        StatusCode::NOT_FOUND,
        format!("{} not found", capitalize(target)),
    )
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

impl Serialize for Failure {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Failure", 3)?;
        state.serialize_field("success", &false)?;
        state.serialize_field("statusCode", &self.status_code.as_u16())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

impl<T: Serialize> Serialize for ServiceResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Success { data } => {
                let mut state = serializer.serialize_struct("Success", 2)?;
                state.serialize_field("success", &true)?;
                state.serialize_field("data", data)?;
                state.end()
            }
            Self::Failure(failure) => failure.serialize(serializer),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        (self.status_code, Json(self)).into_response()
    }
}

impl<T: Serialize> IntoResponse for ServiceResult<T> {
    fn into_response(self) -> Response {
        match self {
            Self::Success { .. } => (StatusCode::OK, Json(self)).into_response(),
            Self::Failure(failure) => failure.into_response(),
        }
    }
}
