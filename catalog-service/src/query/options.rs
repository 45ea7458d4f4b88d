//! Query options and list parameters
//!
//! [`QueryOptions`] is what the pagination engine consumes. [`ListParams`] is
//! the raw query-string form a handler extracts with `axum::extract::Query`
//! and converts with [`ListParams::into_options`].
//!
//! # Example
//!
//! ```rust
//! use catalog_service::query::{FilterCondition, Projection, QueryOptions, Sort};
//!
//! let options = QueryOptions::new(2)?
//!     .with_limit(10)?
//!     .with_filter(FilterCondition::eq("genre", "poetry"))
//!     .with_sort(Sort::asc("title"))
//!     .with_populate(["author"])
//!     .with_select(Projection::include(["title", "author"]));
//!
//! assert_eq!(options.skip(), 10);
//! # Ok::<(), catalog_service::Error>(())
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filter::Filter;
use crate::error::{Error, Result};

/// Page size used when none is requested
pub const DEFAULT_LIMIT: u64 = 2;

/// Field sorted on when no sort is requested
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Direction for ordering results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Smallest first
    #[default]
    Ascending,
    /// Largest first
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => write!(f, "asc"),
            Self::Descending => write!(f, "desc"),
        }
    }
}

/// Sort key for a query
///
/// Defaults to newest first by `createdAt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field to order by
    pub field: String,
    /// Ordering direction
    pub direction: SortDirection,
}

impl Sort {
    /// Ascending on `field`
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    /// Descending on `field`
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

impl Default for Sort {
    fn default() -> Self {
        Self::desc(DEFAULT_SORT_FIELD)
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.direction)
    }
}

/// Parses `field`, `field:asc`, `field:desc` and `-field`
impl FromStr for Sort {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let invalid = || Error::BadRequest(format!("invalid sort expression '{raw}'"));

        if let Some(field) = raw.strip_prefix('-') {
            return if field.is_empty() {
                Err(invalid())
            } else {
                Ok(Self::desc(field))
            };
        }

        let (field, direction) = match raw.split_once(':') {
            Some((field, "asc")) => (field, SortDirection::Ascending),
            Some((field, "desc")) => (field, SortDirection::Descending),
            Some(_) => return Err(invalid()),
            None => (raw, SortDirection::Ascending),
        };

        if field.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            field: field.to_string(),
            direction,
        })
    }
}

/// Field projection applied to every returned item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Keep only these fields (plus `_id`)
    Include(Vec<String>),
    /// Drop these fields
    Exclude(Vec<String>),
}

impl Projection {
    /// Keep only the given fields
    pub fn include<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Include(fields.into_iter().map(Into::into).collect())
    }

    /// Drop the given fields
    pub fn exclude<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Exclude(fields.into_iter().map(Into::into).collect())
    }

    /// Parse a select expression such as `"title author"` or `"-password"`
    ///
    /// Fields may be separated by spaces or commas. Returns `Ok(None)` when the
    /// expression names no fields. Mixing included and excluded fields is a
    /// bad request.
    pub fn parse(raw: &str) -> Result<Option<Self>> {
        let tokens: Vec<&str> = raw
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .collect();

        if tokens.is_empty() {
            return Ok(None);
        }

        let excluded = tokens.iter().filter(|token| token.starts_with('-')).count();
        if excluded == 0 {
            return Ok(Some(Self::include(tokens)));
        }
        if excluded != tokens.len() {
            return Err(Error::BadRequest(
                "select cannot mix included and excluded fields".to_string(),
            ));
        }

        let fields: Vec<&str> = tokens.iter().map(|token| &token[1..]).collect();
        if fields.iter().any(|field| field.is_empty()) {
            return Err(Error::BadRequest(format!("invalid select expression '{raw}'")));
        }
        Ok(Some(Self::exclude(fields)))
    }
}

/// Options for one paginated query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    page: u64,
    limit: u64,
    filter: Filter,
    sort: Sort,
    populate: Vec<String>,
    select: Option<Projection>,
}

impl QueryOptions {
    /// Options for `page` (1-indexed) with the default limit, no filter and
    /// the default sort
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when `page` is 0.
    pub fn new(page: u64) -> Result<Self> {
        if page == 0 {
            return Err(Error::BadRequest(
                "page must be a positive integer".to_string(),
            ));
        }
        Ok(Self {
            page,
            limit: DEFAULT_LIMIT,
            filter: Filter::all(),
            sort: Sort::default(),
            populate: Vec::new(),
            select: None,
        })
    }

    /// Set the page size
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] when `limit` is 0.
    pub fn with_limit(mut self, limit: u64) -> Result<Self> {
        if limit == 0 {
            return Err(Error::BadRequest(
                "limit must be a positive integer".to_string(),
            ));
        }
        self.limit = limit;
        Ok(self)
    }

    /// Set the filter
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Set the sort key
    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    /// Set the relations to expand
    #[must_use]
    pub fn with_populate<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.populate = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Set the field projection
    #[must_use]
    pub fn with_select(mut self, select: Projection) -> Self {
        self.select = Some(select);
        self
    }

    /// Requested page, 1-indexed
    pub fn page(&self) -> u64 {
        self.page
    }

    /// Page size
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Number of matching items before the requested page
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Filter expression
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Sort key
    pub fn sort(&self) -> &Sort {
        &self.sort
    }

    /// Relations to expand
    pub fn populate(&self) -> &[String] {
        &self.populate
    }

    /// Field projection
    pub fn select(&self) -> Option<&Projection> {
        self.select.as_ref()
    }
}

/// Raw list parameters from a query string
///
/// ```text
/// GET /books?page=2&limit=5&sort=-year&select=title,author&populate=author
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListParams {
    /// Page number (1-indexed), defaults to 1
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,

    /// Items per page, defaults to the configured limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,

    /// Sort expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,

    /// Select expression
    #[serde(skip_serializing_if = "Option::is_none")]
    pub select: Option<String>,

    /// Comma-separated relation names
    #[serde(skip_serializing_if = "Option::is_none")]
    pub populate: Option<String>,
}

impl ListParams {
    /// Convert into [`QueryOptions`], using `default_limit` when no limit
    /// was requested
    ///
    /// # Errors
    ///
    /// Returns [`Error::BadRequest`] for a zero page or limit and for
    /// malformed sort or select expressions.
    pub fn into_options(self, default_limit: u64) -> Result<QueryOptions> {
        let mut options = QueryOptions::new(self.page.unwrap_or(1))?
            .with_limit(self.limit.unwrap_or(default_limit))?;

        if let Some(sort) = self.sort.as_deref().filter(|s| !s.trim().is_empty()) {
            options = options.with_sort(sort.parse()?);
        }

        if let Some(projection) = self
            .select
            .as_deref()
            .map(Projection::parse)
            .transpose()?
            .flatten()
        {
            options = options.with_select(projection);
        }

        if let Some(populate) = self.populate.as_deref() {
            options = options.with_populate(
                populate
                    .split(',')
                    .map(str::trim)
                    .filter(|relation| !relation.is_empty()),
            );
        }

        Ok(options)
    }
}
