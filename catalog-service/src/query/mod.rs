//! Query engine: filtering, sorting, pagination
//!
//! Handlers describe what they want with [`QueryOptions`] (usually built from
//! [`ListParams`]) and hand it to [`paginate`] together with anything that
//! implements [`Collection`]. Storage failures surface as [`StorageError`]
//! inside [`Error::Storage`](crate::error::Error::Storage).
//!
//! # Example
//!
//! ```rust,ignore
//! use axum::extract::{Query, State};
//! use catalog_service::prelude::*;
//!
//! async fn list_books(
//!     State(state): State<AppState>,
//!     Query(params): Query<ListParams>,
//! ) -> Result<ServiceResult<PaginatedResult<Book>>> {
//!     let options = params
//!         .into_options(state.config.pagination.default_limit)?
//!         .with_filter(FilterCondition::eq("published", true));
//!     let page = paginate(&state.books, &options).await?;
//!     Ok(responses::success(page))
//! }
//! ```

mod collection;
mod engine;
mod error;
mod filter;
mod memory;
mod options;

pub use collection::{Collection, FindQuery, StorageResult};
pub use engine::{paginate, PaginatedResult};
pub use error::{StorageError, StorageErrorKind, StorageOperation};
pub use filter::{Filter, FilterCondition, FilterOperator, FilterValue};
pub use memory::{MemoryCollection, ID_FIELD};
pub use options::{
    ListParams, Projection, QueryOptions, Sort, SortDirection, DEFAULT_LIMIT, DEFAULT_SORT_FIELD,
};
