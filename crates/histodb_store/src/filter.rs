//! Document selectors and sort orders.
//!
//! Filters are a small predicate tree over dotted field paths. They are
//! enough to select documents by id, version and validity interval, and to
//! express simple caller selectors. They are not a query language.

use crate::document::Document;
use histodb_codec::Value;
use std::cmp::Ordering;

/// A predicate over documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Field equals value.
    Eq(String, Value),
    /// Field differs from value (or is absent).
    Ne(String, Value),
    /// Field is less than value.
    Lt(String, Value),
    /// Field is less than or equal to value.
    Lte(String, Value),
    /// Field is greater than value.
    Gt(String, Value),
    /// Field is greater than or equal to value.
    Gte(String, Value),
    /// Field presence.
    Exists(String, bool),
    /// All sub-filters match.
    And(Vec<Filter>),
    /// At least one sub-filter matches.
    Or(Vec<Filter>),
}

impl Filter {
    /// `path == value`.
    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(path.into(), value.into())
    }

    /// `path != value`.
    pub fn ne(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(path.into(), value.into())
    }

    /// `path < value`.
    pub fn lt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(path.into(), value.into())
    }

    /// `path <= value`.
    pub fn lte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lte(path.into(), value.into())
    }

    /// `path > value`.
    pub fn gt(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(path.into(), value.into())
    }

    /// `path >= value`.
    pub fn gte(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gte(path.into(), value.into())
    }

    /// Field presence test.
    pub fn exists(path: impl Into<String>, present: bool) -> Self {
        Self::Exists(path.into(), present)
    }

    /// Conjunction with another filter.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::All, f) | (f, Filter::All) => f,
            (Filter::And(mut fs), Filter::And(more)) => {
                fs.extend(more);
                Filter::And(fs)
            }
            (Filter::And(mut fs), f) => {
                fs.push(f);
                Filter::And(fs)
            }
            (f, g) => Filter::And(vec![f, g]),
        }
    }

    /// Evaluates the filter against a document.
    ///
    /// Ordering comparisons only match values of the same kind; comparing a
    /// text field against an integer bound never matches.
    #[must_use]
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(path, value) => doc.get_path(path) == Some(value),
            Filter::Ne(path, value) => doc.get_path(path) != Some(value),
            Filter::Lt(path, value) => compare(doc, path, value, Ordering::is_lt),
            Filter::Lte(path, value) => compare(doc, path, value, Ordering::is_le),
            Filter::Gt(path, value) => compare(doc, path, value, Ordering::is_gt),
            Filter::Gte(path, value) => compare(doc, path, value, Ordering::is_ge),
            Filter::Exists(path, present) => doc.get_path(path).is_some() == *present,
            Filter::And(filters) => filters.iter().all(|f| f.matches(doc)),
            Filter::Or(filters) => filters.iter().any(|f| f.matches(doc)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

fn compare(doc: &Document, path: &str, bound: &Value, accept: fn(Ordering) -> bool) -> bool {
    doc.get_path(path)
        .and_then(|v| v.cmp_natural(bound))
        .is_some_and(accept)
}

static NULL: Value = Value::Null;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

/// A multi-key sort order.
///
/// Missing fields sort as null, which comes before every other value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sort {
    keys: Vec<(String, SortOrder)>,
}

impl Sort {
    /// Sorts ascending by one field.
    pub fn ascending(path: impl Into<String>) -> Self {
        Self {
            keys: vec![(path.into(), SortOrder::Ascending)],
        }
    }

    /// Sorts descending by one field.
    pub fn descending(path: impl Into<String>) -> Self {
        Self {
            keys: vec![(path.into(), SortOrder::Descending)],
        }
    }

    /// Adds a tie-breaking key.
    #[must_use]
    pub fn then(mut self, path: impl Into<String>, order: SortOrder) -> Self {
        self.keys.push((path.into(), order));
        self
    }

    /// Returns the sort keys.
    #[must_use]
    pub fn keys(&self) -> &[(String, SortOrder)] {
        &self.keys
    }

    /// Returns true if no keys are set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Compares two documents under this sort.
    #[must_use]
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        self.keys
            .iter()
            .map(|(path, order)| {
                let av = a.get_path(path).unwrap_or(&NULL);
                let bv = b.get_path(path).unwrap_or(&NULL);
                match order {
                    SortOrder::Ascending => av.cmp_sort(bv),
                    SortOrder::Descending => bv.cmp_sort(av),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
