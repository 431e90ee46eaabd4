use bson::{Bson, Document, doc};

use crate::errors::DbError;
use crate::types::Delta;

/// Translates an ORM delta into a native update document.
///
/// - `$unset: [path, ..]` becomes `$unset: { path: true, .. }`
/// - `$push: { path: [v, ..] }` becomes `$push: { path: { $each: [v, ..] } }`
/// - `$pull: { path: [v, ..] }` becomes `$pullAll: { path: [v, ..] }`
/// - any other key passes through unchanged
///
/// # Errors
/// Returns `InvalidDelta` when one of the structural operators has the wrong shape.
pub fn translate_delta(delta: &Delta) -> Result<Document, DbError> {
    let mut out = Document::new();
    for (op, arg) in &delta.diff {
        match op.as_str() {
            "$unset" => {
                out.insert("$unset", unset_paths(arg)?);
            }
            "$push" => {
                let mut push = Document::new();
                for (path, values) in field_lists("$push", arg)? {
                    push.insert(path.clone(), doc! { "$each": values.clone() });
                }
                out.insert("$push", push);
            }
            "$pull" => {
                let mut pull_all = Document::new();
                for (path, values) in field_lists("$pull", arg)? {
                    pull_all.insert(path.clone(), values.clone());
                }
                out.insert("$pullAll", pull_all);
            }
            _ => {
                out.insert(op.clone(), arg.clone());
            }
        }
    }
    Ok(out)
}

fn unset_paths(arg: &Bson) -> Result<Document, DbError> {
    let Bson::Array(paths) = arg else {
        return Err(DbError::InvalidDelta("$unset expects an array of field paths".into()));
    };
    let mut out = Document::new();
    for path in paths {
        match path {
            Bson::String(p) => {
                out.insert(p.clone(), true);
            }
            other => {
                return Err(DbError::InvalidDelta(format!(
                    "$unset field path must be a string, got {other}"
                )));
            }
        }
    }
    Ok(out)
}

fn field_lists<'a>(op: &str, arg: &'a Bson) -> Result<Vec<(&'a String, &'a Bson)>, DbError> {
    let Bson::Document(fields) = arg else {
        return Err(DbError::InvalidDelta(format!("{op} expects a document of field paths")));
    };
    fields
        .iter()
        .map(|(path, values)| match values {
            Bson::Array(_) => Ok((path, values)),
            _ => Err(DbError::InvalidDelta(format!("{op} values for '{path}' must be an array"))),
        })
        .collect()
}
