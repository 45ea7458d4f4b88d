//! In-memory collection over JSON documents
//!
//! [`MemoryCollection`] evaluates a [`FindQuery`] the way a document store
//! would: filter, then sort, then skip and limit, then populate, then select.
//! Documents are keyed by their `_id` field. It backs tests and prototypes
//! that do not need a real store.
//!
//! # Example
//!
//! ```rust,ignore
//! use catalog_service::query::{paginate, MemoryCollection, QueryOptions};
//! use serde_json::json;
//!
//! let authors = vec![json!({"_id": "a1", "name": "Le Guin"})];
//! let books = MemoryCollection::new(vec![
//!     json!({"_id": "b1", "title": "The Dispossessed", "author": "a1", "createdAt": 1}),
//! ])
//! .with_relation("author", authors);
//!
//! let options = QueryOptions::new(1)?.with_populate(["author"]);
//! let page = paginate(&books, &options).await?;
//! assert_eq!(page.items[0]["author"]["name"], "Le Guin");
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::collection::{Collection, FindQuery, StorageResult};
use super::error::{StorageError, StorageErrorKind, StorageOperation};
use super::filter::{Filter, FilterCondition, FilterOperator, FilterValue};
use super::options::{Projection, Sort, SortDirection};

/// Field every document is keyed by
pub const ID_FIELD: &str = "_id";

/// A collection of JSON documents held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryCollection {
    documents: Arc<Vec<Value>>,
    relations: HashMap<String, Arc<Vec<Value>>>,
    failure: Option<StorageErrorKind>,
}

impl MemoryCollection {
    /// Collection holding `documents` in insertion order
    pub fn new(documents: Vec<Value>) -> Self {
        Self {
            documents: Arc::new(documents),
            relations: HashMap::new(),
            failure: None,
        }
    }

    /// Register the documents that `field` references by `_id`
    ///
    /// Populating `field` replaces a single id with the matching document
    /// (or `null`), and an array of ids with the array of matching documents.
    #[must_use]
    pub fn with_relation(mut self, field: impl Into<String>, documents: Vec<Value>) -> Self {
        self.relations.insert(field.into(), Arc::new(documents));
        self
    }

    /// Make every operation fail with a storage error of `kind`
    #[must_use]
    pub fn failing(mut self, kind: StorageErrorKind) -> Self {
        self.failure = Some(kind);
        self
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// Whether the collection holds no documents
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn check_available(&self, operation: StorageOperation) -> StorageResult<()> {
        match self.failure {
            Some(kind) => Err(StorageError::new(
                operation,
                kind,
                "memory collection configured to fail",
            )),
            None => Ok(()),
        }
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a Value> + 'a {
        self.documents
            .iter()
            .filter(move |document| {
                filter.evaluate(&|condition: &FilterCondition| matches(document, condition))
            })
    }

    fn populate(&self, document: &mut Value, relation: &str) -> StorageResult<()> {
        let related = self.relations.get(relation).ok_or_else(|| {
            StorageError::new(
                StorageOperation::Populate,
                StorageErrorKind::Other,
                format!("no relation registered for path \"{relation}\""),
            )
        })?;

        let resolve = |id: &Value| {
            related
                .iter()
                .find(|candidate| candidate.get(ID_FIELD) == Some(id))
                .cloned()
        };

        if let Some(slot) = document.get_mut(relation) {
            *slot = match slot.take() {
                Value::Array(ids) => Value::Array(ids.iter().filter_map(resolve).collect()),
                Value::Null => Value::Null,
                id => resolve(&id).unwrap_or(Value::Null),
            };
        }
        Ok(())
    }
}

impl Collection<Value> for MemoryCollection {
    async fn find(&self, query: &FindQuery) -> StorageResult<Vec<Value>> {
        self.check_available(StorageOperation::Find)?;

        let mut found: Vec<&Value> = self.matching(query.filter()).collect();
        found.sort_by(|a, b| compare_by(a, b, query.sort()));

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        let limit = usize::try_from(query.limit()).unwrap_or(usize::MAX);

        let mut page = Vec::with_capacity(limit.min(found.len()));
        for document in found.into_iter().skip(skip).take(limit) {
            let mut document = document.clone();
            for relation in query.populate() {
                self.populate(&mut document, relation)?;
            }
            if let Some(projection) = query.select() {
                document = project(document, projection);
            }
            page.push(document);
        }
        Ok(page)
    }

    async fn count(&self, filter: &Filter) -> StorageResult<u64> {
        self.check_available(StorageOperation::Count)?;
        Ok(self.matching(filter).count() as u64)
    }
}

/// Resolve a dotted path inside a document
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

fn to_json(value: &FilterValue) -> Value {
    match value {
        FilterValue::String(s) => Value::String(s.clone()),
        FilterValue::Integer(n) => Value::from(*n),
        FilterValue::Float(n) => Value::from(*n),
        FilterValue::Boolean(b) => Value::Bool(*b),
        FilterValue::List(items) => Value::Array(items.iter().map(to_json).collect()),
        FilterValue::Null => Value::Null,
    }
}

fn values_equal(left: &Value, right: &Value) -> bool {
    match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) if left.is_number() && right.is_number() => l == r,
        _ => left == right,
    }
}

/// Equality that also matches an element of an array field
fn field_equals(field: &Value, operand: &Value) -> bool {
    match field {
        Value::Array(elements) if !operand.is_array() => {
            elements.iter().any(|element| values_equal(element, operand))
        }
        _ => values_equal(field, operand),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => {
            let (l, r) = (l.as_f64().unwrap_or(0.0), r.as_f64().unwrap_or(0.0));
            l.partial_cmp(&r).unwrap_or(Ordering::Equal)
        }
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        _ => type_rank(left).cmp(&type_rank(right)),
    }
}

/// Missing fields order before present ones when ascending
fn compare_by(left: &Value, right: &Value, sort: &Sort) -> Ordering {
    let ordering = match (lookup(left, &sort.field), lookup(right, &sort.field)) {
        (Some(l), Some(r)) => compare_values(l, r),
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    match sort.direction {
        SortDirection::Ascending => ordering,
        SortDirection::Descending => ordering.reverse(),
    }
}

fn matches(document: &Value, condition: &FilterCondition) -> bool {
    let field = lookup(document, &condition.field).filter(|value| !value.is_null());
    let operand = to_json(&condition.value);

    match condition.operator {
        FilterOperator::IsNull => field.is_none(),
        FilterOperator::IsNotNull => field.is_some(),
        FilterOperator::Equal => field.is_some_and(|f| field_equals(f, &operand)),
        FilterOperator::NotEqual => !field.is_some_and(|f| field_equals(f, &operand)),
        FilterOperator::In => match (&operand, field) {
            (Value::Array(candidates), Some(f)) => {
                candidates.iter().any(|candidate| field_equals(f, candidate))
            }
            _ => false,
        },
        FilterOperator::Like => match (field, &condition.value) {
            (Some(Value::String(text)), FilterValue::String(pattern)) => {
                let needle = pattern.trim_matches('%').to_lowercase();
                text.to_lowercase().contains(&needle)
            }
            _ => false,
        },
        FilterOperator::GreaterThan
        | FilterOperator::GreaterThanOrEqual
        | FilterOperator::LessThan
        | FilterOperator::LessThanOrEqual => {
            let Some(f) = field else {
                return false;
            };
            if type_rank(f) != type_rank(&operand) {
                return false;
            }
            let ordering = compare_values(f, &operand);
            match condition.operator {
                FilterOperator::GreaterThan => ordering == Ordering::Greater,
                FilterOperator::GreaterThanOrEqual => ordering != Ordering::Less,
                FilterOperator::LessThan => ordering == Ordering::Less,
                _ => ordering != Ordering::Greater,
            }
        }
    }
}

fn project(document: Value, projection: &Projection) -> Value {
    let mut fields = match document {
        Value::Object(fields) => fields,
        other => return other,
    };

    match projection {
        Projection::Include(keep) => {
            let mut projected = Map::new();
            if let Some(id) = fields.remove(ID_FIELD) {
                projected.insert(ID_FIELD.to_string(), id);
            }
            for name in keep {
                if let Some(value) = fields.remove(name) {
                    projected.insert(name.clone(), value);
                }
            }
            Value::Object(projected)
        }
        Projection::Exclude(drop) => {
            for name in drop {
                fields.remove(name);
            }
            Value::Object(fields)
        }
    }
}
