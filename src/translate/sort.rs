use bson::{Bson, Document};

use crate::errors::DbError;
use crate::types::{Order, SortSpec};

/// Ordered `(field, direction)` pairs, primary key first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeSort(Vec<(String, i32)>);

impl NativeSort {
    pub fn pairs(&self) -> &[(String, i32)] {
        &self.0
    }

    pub fn into_pairs(self) -> Vec<(String, i32)> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sort directive as a document. A field repeated later overrides its
    /// earlier direction but keeps its original position.
    #[must_use]
    pub fn to_document(&self) -> Document {
        let mut out = Document::new();
        for (field, dir) in &self.0 {
            out.insert(field.clone(), *dir);
        }
        out
    }
}

/// Translates a sort specification. `None` and empty input mean "no explicit order".
#[must_use]
pub fn translate_sort(sort: Option<&[SortSpec]>) -> Option<NativeSort> {
    let specs = sort?;
    if specs.is_empty() {
        return None;
    }
    Some(NativeSort(specs.iter().map(|s| (s.field.clone(), s.order.direction())).collect()))
}

/// Parses dialect-neutral sort entries (`[{ name: "asc" }, { age: "desc" }]`).
///
/// Each entry may name several fields; they are taken in document order.
/// Directions are `"asc"`/`"desc"` or the integers `1`/`-1`.
///
/// # Errors
/// Returns `InvalidSortDirection` for any other token.
pub fn parse_sort(entries: &[Document]) -> Result<Vec<SortSpec>, DbError> {
    let mut out = Vec::new();
    for entry in entries {
        for (field, token) in entry {
            out.push(SortSpec { field: field.clone(), order: parse_order(field, token)? });
        }
    }
    Ok(out)
}

fn parse_order(field: &str, token: &Bson) -> Result<Order, DbError> {
    match token {
        Bson::String(s) if s == "asc" => Ok(Order::Asc),
        Bson::String(s) if s == "desc" => Ok(Order::Desc),
        Bson::Int32(1) | Bson::Int64(1) => Ok(Order::Asc),
        Bson::Int32(-1) | Bson::Int64(-1) => Ok(Order::Desc),
        other => Err(DbError::InvalidSortDirection {
            field: field.to_string(),
            token: other.to_string(),
        }),
    }
}
