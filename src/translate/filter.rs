use bson::{Bson, Document, doc};

use crate::errors::DbError;

/// Prefix marking a key as an operator rather than a field name.
pub const OPERATOR_SIGIL: char = '$';

/// Dialect operators that are spelled differently in the native syntax.
const OPERATOR_ALIASES: &[(&str, &str)] = &[("$notIn", "$nin"), ("$not", "$ne")];

enum Shape {
    Operators,
    Fields,
    Mixed,
}

/// Translates a dialect-neutral filter tree into a native filter document.
///
/// Sub-documents are either pure operator objects (every key starts with `$`)
/// or pure nested field maps. Anything in between is rejected instead of being
/// guessed at from its first key.
///
/// # Errors
/// Returns `MixedFilterObject` naming the dotted path of the first mixed value.
pub fn translate_filter(filter: &Document) -> Result<Document, DbError> {
    translate_level(filter, "")
}

fn translate_level(level: &Document, prefix: &str) -> Result<Document, DbError> {
    let mut out = Document::new();
    for (key, value) in level {
        let path = join_path(prefix, key);
        let native = match value {
            Bson::Document(sub) => match classify(sub) {
                Shape::Operators => Bson::Document(translate_operators(sub)),
                Shape::Fields => Bson::Document(translate_level(sub, &path)?),
                Shape::Mixed => return Err(DbError::MixedFilterObject { path }),
            },
            Bson::RegularExpression(_) => Bson::Document(doc! { "$regex": value.clone() }),
            other => other.clone(),
        };
        out.insert(key.clone(), native);
    }
    Ok(out)
}

fn classify(sub: &Document) -> Shape {
    let ops = sub.keys().filter(|k| is_operator(k)).count();
    if ops == 0 {
        Shape::Fields
    } else if ops == sub.len() {
        Shape::Operators
    } else {
        Shape::Mixed
    }
}

fn translate_operators(ops: &Document) -> Document {
    let mut out = Document::new();
    for (op, arg) in ops {
        out.insert(native_operator(op), arg.clone());
    }
    out
}

fn native_operator(op: &str) -> String {
    OPERATOR_ALIASES
        .iter()
        .find(|(alias, _)| *alias == op)
        .map_or_else(|| op.to_string(), |(_, native)| (*native).to_string())
}

pub(crate) fn is_operator(key: &str) -> bool {
    key.starts_with(OPERATOR_SIGIL)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") }
}
