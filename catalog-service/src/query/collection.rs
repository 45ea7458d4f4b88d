//! Persistence query interface consumed by the pagination engine
//!
//! Implementations translate a [`FindQuery`] into the store's native query.
//! Both methods take `&self` and may be awaited concurrently against the same
//! collection.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::query::{Collection, Filter, FindQuery, StorageResult};
//!
//! struct BookCollection {
//!     client: StoreClient,
//! }
//!
//! impl Collection<Book> for BookCollection {
//!     async fn find(&self, query: &FindQuery) -> StorageResult<Vec<Book>> {
//!         self.client
//!             .find("books", query.filter(), query.sort(), query.skip(), query.limit())
//!             .await
//!             .map_err(into_storage_error)
//!     }
//!
//!     async fn count(&self, filter: &Filter) -> StorageResult<u64> {
//!         self.client.count("books", filter).await.map_err(into_storage_error)
//!     }
//! }
//! ```

use std::future::Future;
use std::sync::Arc;

use super::error::StorageError;
use super::filter::Filter;
use super::options::{Projection, QueryOptions, Sort};

/// Result type for collection operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// One bounded, sorted retrieval
#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    filter: Filter,
    sort: Sort,
    skip: u64,
    limit: u64,
    populate: Vec<String>,
    select: Option<Projection>,
}

impl FindQuery {
    /// Build the find half of a paginated query
    pub fn from_options(options: &QueryOptions) -> Self {
        Self {
            filter: options.filter().clone(),
            sort: options.sort().clone(),
            skip: options.skip(),
            limit: options.limit(),
            populate: options.populate().to_vec(),
            select: options.select().cloned(),
        }
    }

    /// Documents that must match
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Ordering applied before skip and limit
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Matching documents to skip
    pub fn skip(&self) -> u64 {
        self.skip
    }

    /// Maximum documents to return
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Relations to expand on every returned document
    pub fn populate(&self) -> &[String] {
        &self.populate
    }

    /// Projection applied to every returned document
    pub fn select(&self) -> Option<&Projection> {
        self.select.as_ref()
    }
}

/// A queryable collection of `T`
pub trait Collection<T>: Send + Sync {
    /// Return at most `query.limit()` documents matching the filter, ordered
    /// by the sort key, after skipping `query.skip()` matches
    fn find(&self, query: &FindQuery) -> impl Future<Output = StorageResult<Vec<T>>> + Send;

    /// Count every document matching `filter`, ignoring skip and limit
    fn count(&self, filter: &Filter) -> impl Future<Output = StorageResult<u64>> + Send;
}

impl<T, C> Collection<T> for Arc<C>
where
    C: Collection<T>,
{
    fn find(&self, query: &FindQuery) -> impl Future<Output = StorageResult<Vec<T>>> + Send {
        (**self).find(query)
    }

    fn count(&self, filter: &Filter) -> impl Future<Output = StorageResult<u64>> + Send {
        (**self).count(filter)
    }
}
