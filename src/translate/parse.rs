use bson::{Bson, Document};
use serde_json::Value;

use super::sort::parse_sort;
use crate::errors::DbError;
use crate::types::{Delta, SortSpec};

// Inputs are read as MongoDB Extended JSON v2, so `{"$oid": ..}` and
// `{"$regularExpression": ..}` arrive as native identifier and regex values.

/// # Errors
/// Returns an error if the text is not JSON or not a JSON object.
pub fn parse_filter_json(json: &str) -> Result<Document, DbError> {
    let value: Value = serde_json::from_str(json)?;
    ext_json_document(value)
}

/// Accepts either `{ "diff": { .. } }` or a bare diff object.
///
/// # Errors
/// Returns an error if the text is not a JSON object or `diff` is not an object.
pub fn parse_delta_json(json: &str) -> Result<Delta, DbError> {
    let doc = parse_filter_json(json)?;
    if doc.contains_key("diff") { Delta::from_document(&doc) } else { Ok(Delta::new(doc)) }
}

/// # Errors
/// Returns an error if the text is not a JSON array of objects or a direction is unknown.
pub fn parse_sort_json(json: &str) -> Result<Vec<SortSpec>, DbError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(DbError::InvalidArgument("sort must be a JSON array".into()));
    };
    let entries = items.into_iter().map(ext_json_document).collect::<Result<Vec<_>, _>>()?;
    parse_sort(&entries)
}

fn ext_json_document(value: Value) -> Result<Document, DbError> {
    match Bson::try_from(value).map_err(|e| DbError::ExtJson(e.to_string()))? {
        Bson::Document(doc) => Ok(doc),
        other => Err(DbError::InvalidArgument(format!(
            "expected a JSON object, got {:?}",
            other.element_type()
        ))),
    }
}
