use bson::{Bson, Document};

use super::eval::values_equal;
use crate::errors::DbError;
use crate::translate::is_operator;

const ID_KEY: &str = "_id";

/// Applies a native update document to `doc`. The document is only modified
/// when every operator applies cleanly. Returns whether anything changed.
///
/// # Errors
/// Returns `Driver` for unknown operators, `_id` mutations or type mismatches.
pub(crate) fn apply_update(doc: &mut Document, update: &Document) -> Result<bool, DbError> {
    let ops = update.keys().filter(|k| is_operator(k)).count();
    if ops == 0 {
        return Ok(replace(doc, update));
    }
    if ops != update.len() {
        return Err(DbError::Driver("update mixes operators and replacement fields".into()));
    }

    let mut next = doc.clone();
    for (op, arg) in update {
        let Bson::Document(fields) = arg else {
            return Err(DbError::Driver(format!("{op} expects a document")));
        };
        for (path, value) in fields {
            if path == ID_KEY {
                return Err(DbError::Driver(format!("{op} would modify the immutable field '_id'")));
            }
            match op.as_str() {
                "$set" => set_path(&mut next, path, value.clone())?,
                "$unset" => unset_path(&mut next, path),
                "$inc" => inc_path(&mut next, path, value)?,
                "$push" => push_path(&mut next, path, value)?,
                "$pull" => pull_path(&mut next, path, std::slice::from_ref(value))?,
                "$pullAll" => match value {
                    Bson::Array(values) => pull_path(&mut next, path, values)?,
                    _ => return Err(DbError::Driver(format!("$pullAll on '{path}' needs an array"))),
                },
                other => return Err(DbError::Driver(format!("unknown update operator {other}"))),
            }
        }
    }
    let changed = next != *doc;
    *doc = next;
    Ok(changed)
}

fn replace(doc: &mut Document, replacement: &Document) -> bool {
    let mut next = Document::new();
    if let Some(id) = doc.get(ID_KEY) {
        next.insert(ID_KEY, id.clone());
    }
    for (k, v) in replacement {
        if k != ID_KEY {
            next.insert(k.clone(), v.clone());
        }
    }
    let changed = next != *doc;
    *doc = next;
    changed
}

fn traverse_to_parent<'a>(root: &'a mut Document, path: &str) -> Result<(&'a mut Document, String), DbError> {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            return Ok((cur, seg.to_string()));
        }
        if !matches!(cur.get(seg), Some(Bson::Document(_))) {
            if cur.contains_key(seg) {
                return Err(DbError::Driver(format!("cannot traverse non-document at '{seg}' in '{path}'")));
            }
            cur.insert(seg.to_string(), Document::new());
        }
        cur = match cur.get_mut(seg) {
            Some(Bson::Document(d)) => d,
            _ => return Err(DbError::Driver(format!("cannot traverse '{path}'"))),
        };
    }
    Err(DbError::Driver("empty field path".into()))
}

fn set_path(root: &mut Document, path: &str, value: Bson) -> Result<(), DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    parent.insert(last, value);
    Ok(())
}

fn unset_path(root: &mut Document, path: &str) {
    let mut cur = root;
    let mut iter = path.split('.').peekable();
    while let Some(seg) = iter.next() {
        if iter.peek().is_none() {
            cur.remove(seg);
            return;
        }
        cur = match cur.get_mut(seg) {
            Some(Bson::Document(d)) => d,
            _ => return,
        };
    }
}

fn inc_path(root: &mut Document, path: &str, by: &Bson) -> Result<(), DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    // A missing field starts from zero; a present null is not a number.
    let current = parent.get(&last).cloned().unwrap_or(Bson::Int32(0));
    let next = add_numbers(&current, by)
        .ok_or_else(|| DbError::Driver(format!("cannot apply $inc to non-numeric value at '{path}'")))?;
    parent.insert(last, next);
    Ok(())
}

fn add_numbers(a: &Bson, b: &Bson) -> Option<Bson> {
    Some(match (a, b) {
        (Bson::Int32(x), Bson::Int32(y)) => {
            x.checked_add(*y).map_or_else(|| Bson::Int64(i64::from(*x) + i64::from(*y)), Bson::Int32)
        }
        (Bson::Int32(x), Bson::Int64(y)) => Bson::Int64(i64::from(*x).checked_add(*y)?),
        (Bson::Int64(x), Bson::Int32(y)) => Bson::Int64(x.checked_add(i64::from(*y))?),
        (Bson::Int64(x), Bson::Int64(y)) => Bson::Int64(x.checked_add(*y)?),
        (x, y) if is_number(x) && is_number(y) => {
            Bson::Double(super::eval::as_f64_num(x) + super::eval::as_f64_num(y))
        }
        _ => return None,
    })
}

fn is_number(v: &Bson) -> bool {
    matches!(v, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_))
}

fn push_path(root: &mut Document, path: &str, value: &Bson) -> Result<(), DbError> {
    let values = match value {
        Bson::Document(d) if d.contains_key("$each") => match d.get("$each") {
            Some(Bson::Array(each)) => each.clone(),
            _ => return Err(DbError::Driver(format!("$each on '{path}' needs an array"))),
        },
        other => vec![other.clone()],
    };
    let (parent, last) = traverse_to_parent(root, path)?;
    match parent.get_mut(&last) {
        None => {
            parent.insert(last, Bson::Array(values));
        }
        Some(Bson::Array(items)) => items.extend(values),
        Some(other) => {
            return Err(DbError::Driver(format!(
                "$push target '{path}' is not an array (found {:?})",
                other.element_type()
            )));
        }
    }
    Ok(())
}

fn pull_path(root: &mut Document, path: &str, values: &[Bson]) -> Result<(), DbError> {
    let (parent, last) = traverse_to_parent(root, path)?;
    match parent.get_mut(&last) {
        None => Ok(()),
        Some(Bson::Array(items)) => {
            items.retain(|item| !values.iter().any(|v| values_equal(item, v)));
            Ok(())
        }
        Some(_) => Err(DbError::Driver(format!("cannot pull from non-array at '{path}'"))),
    }
}
