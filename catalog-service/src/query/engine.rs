//! Pagination engine
//!
//! [`paginate`] runs the bounded find and the filtered count against a
//! [`Collection`] concurrently and assembles a [`PaginatedResult`].

use serde::{Deserialize, Serialize};

use super::collection::{Collection, FindQuery};
use super::options::QueryOptions;
use crate::error::{Error, Result};

/// One page of a filtered, sorted collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    /// Items on this page, at most `limit`
    pub items: Vec<T>,
    /// Number of items matching the filter across all pages
    pub total_items: u64,
    /// The requested page
    pub current_page: u64,
    /// `ceil(total_items / limit)`
    pub total_pages: u64,
}

impl<T> PaginatedResult<T> {
    /// Whether a page follows this one
    pub fn has_next(&self) -> bool {
        self.current_page < self.total_pages
    }

    /// Whether a page precedes this one
    pub fn has_prev(&self) -> bool {
        self.current_page > 1 && self.total_items > 0
    }
}

/// Fetch one page of `collection` according to `options`
///
/// The find and the count are issued together and jointly awaited; if either
/// fails the whole operation fails with that storage error. An empty match
/// set yields an empty page for any page number, while a page past the end of
/// a non-empty match set is [`Error::NotFound`].
///
/// # Example
///
/// ```rust,ignore
/// let options = ListParams { page: Some(2), ..Default::default() }
///     .into_options(config.pagination.default_limit)?;
/// let page = paginate(&books, &options).await?;
/// Ok(responses::success(page))
/// ```
pub async fn paginate<T, C>(collection: &C, options: &QueryOptions) -> Result<PaginatedResult<T>>
where
    C: Collection<T>,
{
    let query = FindQuery::from_options(options);

    let (items, total_items) =
        tokio::try_join!(collection.find(&query), collection.count(options.filter()))?;

    let limit = options.limit();
    let total_pages = total_items.div_ceil(limit);
    let page = options.page();

    tracing::debug!(
        page,
        limit,
        skip = query.skip(),
        sort = %options.sort(),
        total_items,
        total_pages,
        "Paginated query"
    );

    if page > total_pages && total_items > 0 {
        return Err(Error::NotFound(format!(
            "page {page} not found, total pages available: {total_pages}"
        )));
    }

    Ok(PaginatedResult {
        items,
        total_items,
        current_page: page,
        total_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{
        Collection, Filter, FilterCondition, FindQuery, MemoryCollection, Projection, Sort,
        StorageErrorKind, StorageOperation, StorageResult,
    };
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::sync::Barrier;

    /// Collection whose find and count only complete once both are in flight
    struct Rendezvous {
        barrier: Barrier,
    }

    impl Collection<u64> for Rendezvous {
        async fn find(&self, query: &FindQuery) -> StorageResult<Vec<u64>> {
            self.barrier.wait().await;
            Ok((query.skip()..query.skip() + query.limit()).collect())
        }

        async fn count(&self, _filter: &Filter) -> StorageResult<u64> {
            self.barrier.wait().await;
            Ok(10)
        }
    }

    fn books(count: usize) -> MemoryCollection {
        MemoryCollection::new(
            (0..count)
                .map(|i| {
                    json!({
                        "_id": format!("{:024x}", i),
                        "title": format!("Book {i}"),
                        "year": 2000 + i as i64,
                        "createdAt": i as i64,
                    })
                })
                .collect(),
        )
    }

    fn options(page: u64, limit: u64) -> QueryOptions {
        QueryOptions::new(page).unwrap().with_limit(limit).unwrap()
    }

    #[tokio::test]
    async fn test_first_page_newest_first() {
        let collection = books(5);
        let result: PaginatedResult<Value> = paginate(&collection, &options(1, 2)).await.unwrap();

        assert_eq!(result.total_items, 5);
        assert_eq!(result.total_pages, 3);
        assert_eq!(result.current_page, 1);
        let titles: Vec<&str> = result
            .items
            .iter()
            .map(|b| b["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, ["Book 4", "Book 3"]);
        assert!(result.has_next());
        assert!(!result.has_prev());
    }

    #[tokio::test]
    async fn test_item_count_per_page() {
        let collection = books(5);
        for (page, expected) in [(1, 2), (2, 2), (3, 1)] {
            let result: PaginatedResult<Value> =
                paginate(&collection, &options(page, 2)).await.unwrap();
            assert_eq!(result.items.len(), expected, "page {page}");
        }
    }

    #[tokio::test]
    async fn test_page_past_end_is_not_found() {
        let collection = books(3);
        let err = paginate::<Value, _>(&collection, &options(5, 2))
            .await
            .unwrap_err();
        match err {
            Error::NotFound(message) => {
                assert_eq!(message, "page 5 not found, total pages available: 2")
            }
            other => panic!("Expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_collection_any_page() {
        let collection = books(0);
        for page in [1, 7] {
            let result: PaginatedResult<Value> =
                paginate(&collection, &options(page, 2)).await.unwrap();
            assert!(result.items.is_empty());
            assert_eq!(result.total_items, 0);
            assert_eq!(result.total_pages, 0);
            assert_eq!(result.current_page, page);
        }
    }

    #[tokio::test]
    async fn test_filter_sort_and_select() {
        let collection = books(6);
        let options = options(1, 10)
            .with_filter(FilterCondition::gte("year", 2003_i64))
            .with_sort(Sort::asc("year"))
            .with_select(Projection::include(["title"]));

        let result: PaginatedResult<Value> = paginate(&collection, &options).await.unwrap();
        assert_eq!(result.total_items, 3);
        assert_eq!(result.total_pages, 1);
        assert_eq!(result.items[0]["title"], "Book 3");
        assert!(result.items[0].get("year").is_none());
        assert!(result.items[0].get("_id").is_some());
    }

    #[tokio::test]
    async fn test_storage_failure_propagates() {
        let collection = books(3).failing(StorageErrorKind::Unavailable);
        let err = paginate::<Value, _>(&collection, &options(1, 2))
            .await
            .unwrap_err();
        match err {
            Error::Storage(storage) => {
                assert_eq!(storage.kind, StorageErrorKind::Unavailable);
                assert!(matches!(
                    storage.operation,
                    StorageOperation::Find | StorageOperation::Count
                ));
            }
            other => panic!("Expected Storage, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_find_and_count_run_together() {
        let collection = Rendezvous {
            barrier: Barrier::new(2),
        };
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            paginate(&collection, &options(2, 3)),
        )
        .await
        .expect("find and count should be awaited jointly")
        .unwrap();

        assert_eq!(result.items, vec![3, 4, 5]);
        assert_eq!(result.total_items, 10);
        assert_eq!(result.total_pages, 4);
    }

    #[test]
    fn test_serializes_camel_case() {
        let result = PaginatedResult {
            items: vec![1, 2],
            total_items: 5,
            current_page: 1,
            total_pages: 3,
        };
        assert_eq!(
            serde_json::to_value(result).unwrap(),
            json!({"items": [1, 2], "totalItems": 5, "currentPage": 1, "totalPages": 3})
        );
    }
}
