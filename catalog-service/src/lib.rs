//! # catalog-service
//!
//! Shared request-processing core for catalog-style APIs (books, authors,
//! users): everything between the router and the handlers' business logic.
//!
//! ## Features
//!
//! - **Query engine**: generic pagination over any [`Collection`](query::Collection)
//!   with filtering, sorting, populate and field selection
//! - **Response envelope**: every body is `{success, data}` or
//!   `{success, statusCode, message}`
//! - **Guard chain**: identifier validation, JWT authentication, ownership and
//!   admin authorization as axum middleware
//! - **Error translation**: one place that maps failures to status codes,
//!   with diagnostic traces outside production
//!
//! ## Example
//!
//! ```rust,ignore
//! use axum::{middleware::{from_fn, from_fn_with_state}, routing::get, Router};
//! use catalog_service::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config)?;
//!
//!     let guard = AuthGuard::new(&config.jwt)?;
//!     let books = Router::new()
//!         .route("/books", get(list_books))
//!         .route("/books/{id}", get(show_book).delete(delete_book))
//!         .route_layer(from_fn_with_state(guard, AuthGuard::verify_token))
//!         .route_layer(from_fn(validate_id_param));
//!
//!     let app = ErrorTranslator::from_config(&config).install(books);
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod ids;
pub mod middleware;
pub mod observability;
pub mod query;
pub mod responses;
pub mod translator;

pub use error::{Error, Result};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{Config, JwtConfig, PaginationConfig, ServiceConfig};
    pub use crate::error::{Error, Result};
    pub use crate::ids::{validate_id, validate_id_param, IdGuard, ResourceId};
    pub use crate::middleware::{
        AuthDecision, AuthGuard, Principal, TokenIssuer, TokenValidator,
    };
    pub use crate::observability::init_tracing;
    pub use crate::query::{
        paginate, Collection, Filter, FilterCondition, FindQuery, ListParams, MemoryCollection,
        PaginatedResult, Projection, QueryOptions, Sort, SortDirection, StorageError,
        StorageErrorKind,
    };
    pub use crate::responses::{self, ServiceResult};
    pub use crate::translator::{not_found_fallback, ErrorTranslator};
}
