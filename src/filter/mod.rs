pub mod pagination;

use serde_json::Value;

use crate::database::{Document, DocumentId, ID_FIELD};

pub use pagination::{PageQuery, Window};

/// Field-equality query over documents.
///
/// Clauses are ANDed. A `null` clause value matches documents where the
/// field is null or missing, which is how an absent query parameter ends up
/// being matched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    /// Matches every document
    pub fn all() -> Self {
        Self::default()
    }

    pub fn by_id(id: DocumentId) -> Self {
        Self::all().eq(ID_FIELD, id)
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    /// Equality on an optional query value; `None` becomes a null match
    pub fn eq_opt(self, field: impl Into<String>, value: Option<String>) -> Self {
        self.eq(field, value.map(Value::String).unwrap_or(Value::Null))
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses.iter().all(|(field, expected)| match expected {
            Value::Null => matches!(document.get(field), None | Some(Value::Null)),
            _ => document.get(field) == Some(expected),
        })
    }
}
