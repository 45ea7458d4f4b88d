//! Filter expressions for collection queries
//!
//! A [`Filter`] is a closed tree: leaf [`FilterCondition`]s combined with
//! `And` / `Or`. The empty `And` matches every document and is the default.
//!
//! # Example
//!
//! ```rust
//! use catalog_service::query::{Filter, FilterCondition};
//!
//! let filter = Filter::and([
//!     FilterCondition::eq("genre", "fiction"),
//!     FilterCondition::gte("year", 1950_i64),
//! ]);
//! assert!(!filter.is_empty());
//! assert!(Filter::all().is_empty());
//! ```

use std::fmt;

/// Comparison operators for filter conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    /// Field equals value
    Equal,
    /// Field differs from value
    NotEqual,
    /// Field is greater than value
    GreaterThan,
    /// Field is greater than or equal to value
    GreaterThanOrEqual,
    /// Field is less than value
    LessThan,
    /// Field is less than or equal to value
    LessThanOrEqual,
    /// Case-insensitive substring match; `%` wildcards at either end are ignored
    Like,
    /// Field equals one of the listed values
    In,
    /// Field is absent or null
    IsNull,
    /// Field is present and not null
    IsNotNull,
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equal => write!(f, "$eq"),
            Self::NotEqual => write!(f, "$ne"),
            Self::GreaterThan => write!(f, "$gt"),
            Self::GreaterThanOrEqual => write!(f, "$gte"),
            Self::LessThan => write!(f, "$lt"),
            Self::LessThanOrEqual => write!(f, "$lte"),
            Self::Like => write!(f, "$regex"),
            Self::In => write!(f, "$in"),
            Self::IsNull => write!(f, "$null"),
            Self::IsNotNull => write!(f, "$notNull"),
        }
    }
}

/// Literal operand of a filter condition
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// String value
    String(String),
    /// 64-bit integer value
    Integer(i64),
    /// 64-bit floating point value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// List of values (for `In`)
    List(Vec<FilterValue>),
    /// No operand (for `IsNull` / `IsNotNull`)
    Null,
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<i32> for FilterValue {
    fn from(n: i32) -> Self {
        Self::Integer(i64::from(n))
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        Self::Float(n)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl<T: Into<FilterValue>> From<Vec<T>> for FilterValue {
    fn from(list: Vec<T>) -> Self {
        Self::List(list.into_iter().map(Into::into).collect())
    }
}

/// A single `field <op> value` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCondition {
    /// Field name, dotted paths address nested documents
    pub field: String,
    /// The comparison operator
    pub operator: FilterOperator,
    /// The value to compare against
    pub value: FilterValue,
}

impl FilterCondition {
    /// Create a new filter condition
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::Equal, value.into())
    }

    /// `field != value`
    pub fn ne(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::NotEqual, value.into())
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThan, value.into())
    }

    /// `field >= value`
    pub fn gte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::GreaterThanOrEqual, value.into())
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThan, value.into())
    }

    /// `field <= value`
    pub fn lte(field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOperator::LessThanOrEqual, value.into())
    }

    /// Case-insensitive substring match
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::Like, FilterValue::String(pattern.into()))
    }

    /// `field` is one of `values`
    pub fn one_of<T: Into<FilterValue>>(field: impl Into<String>, values: Vec<T>) -> Self {
        Self::new(field, FilterOperator::In, values.into())
    }

    /// `field` is absent or null
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNull, FilterValue::Null)
    }

    /// `field` is present and not null
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::new(field, FilterOperator::IsNotNull, FilterValue::Null)
    }
}

/// Boolean combination of filter conditions
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// A single predicate
    Match(FilterCondition),
    /// Every child must match; empty matches everything
    And(Vec<Filter>),
    /// At least one child must match; empty matches nothing
    Or(Vec<Filter>),
}

impl Filter {
    /// Filter that matches every document
    pub fn all() -> Self {
        Self::And(Vec::new())
    }

    /// Conjunction of the given filters
    pub fn and<I, F>(filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        Self::And(filters.into_iter().map(Into::into).collect())
    }

    /// Disjunction of the given filters
    pub fn or<I, F>(filters: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Filter>,
    {
        Self::Or(filters.into_iter().map(Into::into).collect())
    }

    /// True for the match-everything filter
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::And(children) if children.is_empty())
    }

    /// Evaluate the tree, delegating leaf predicates to `matches`
    pub fn evaluate<F>(&self, matches: &F) -> bool
    where
        F: Fn(&FilterCondition) -> bool,
    {
        match self {
            Self::Match(condition) => matches(condition),
            Self::And(children) => children.iter().all(|child| child.evaluate(matches)),
            Self::Or(children) => children.iter().any(|child| child.evaluate(matches)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl From<FilterCondition> for Filter {
    fn from(condition: FilterCondition) -> Self {
        Self::Match(condition)
    }
}
