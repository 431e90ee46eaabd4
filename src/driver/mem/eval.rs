use bson::{Bson, Document};
use std::cmp::Ordering;

use crate::errors::DbError;
use crate::translate::is_operator;

// Safety limits for path traversal
const MAX_PATH_DEPTH: usize = 32;
const MAX_PATH_LEN: usize = 1024;
const MAX_IN_SET: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CmpOp {
    fn accepts(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Gt => ord == Ordering::Greater,
            Self::Gte => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Lte => ord != Ordering::Greater,
        }
    }
}

/// A native filter document compiled for evaluation.
#[derive(Debug, Clone)]
pub(crate) enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Nor(Vec<Filter>),
    Exists { path: String, exists: bool },
    In { path: String, values: Vec<Bson> },
    Nin { path: String, values: Vec<Bson> },
    Cmp { path: String, op: CmpOp, value: Bson },
    #[cfg(feature = "regex")]
    Regex { path: String, regex: regex::Regex },
}

/// # Errors
/// Returns `QueryError` for operators the embedded engine does not understand.
pub(crate) fn compile_filter(native: &Document) -> Result<Filter, DbError> {
    let mut clauses = Vec::new();
    for (key, value) in native {
        match key.as_str() {
            "$and" => clauses.push(Filter::And(compile_list(key, value)?)),
            "$or" => clauses.push(Filter::Or(compile_list(key, value)?)),
            "$nor" => clauses.push(Filter::Nor(compile_list(key, value)?)),
            op if is_operator(op) => {
                return Err(DbError::QueryError(format!("unsupported top-level operator {op}")));
            }
            path => clauses.extend(compile_field(path, value)?),
        }
    }
    Ok(Filter::And(clauses))
}

fn compile_list(op: &str, value: &Bson) -> Result<Vec<Filter>, DbError> {
    let Bson::Array(items) = value else {
        return Err(DbError::QueryError(format!("{op} expects an array")));
    };
    items
        .iter()
        .map(|item| match item {
            Bson::Document(d) => compile_filter(d),
            _ => Err(DbError::QueryError(format!("{op} entries must be documents"))),
        })
        .collect()
}

fn compile_field(path: &str, value: &Bson) -> Result<Vec<Filter>, DbError> {
    match value {
        Bson::Document(ops) if !ops.is_empty() && ops.keys().all(|k| is_operator(k)) => {
            compile_operators(path, ops)
        }
        Bson::RegularExpression(_) => Ok(vec![compile_regex(path, value, None)?]),
        other => Ok(vec![Filter::Cmp { path: path.to_string(), op: CmpOp::Eq, value: other.clone() }]),
    }
}

fn compile_operators(path: &str, ops: &Document) -> Result<Vec<Filter>, DbError> {
    let options = ops.get("$options").and_then(Bson::as_str);
    let mut out = Vec::with_capacity(ops.len());
    for (op, arg) in ops {
        let cmp = |kind| Filter::Cmp { path: path.to_string(), op: kind, value: arg.clone() };
        let f = match op.as_str() {
            "$eq" => cmp(CmpOp::Eq),
            "$ne" => cmp(CmpOp::Ne),
            "$gt" => cmp(CmpOp::Gt),
            "$gte" => cmp(CmpOp::Gte),
            "$lt" => cmp(CmpOp::Lt),
            "$lte" => cmp(CmpOp::Lte),
            "$in" => Filter::In { path: path.to_string(), values: value_set(op, arg)? },
            "$nin" => Filter::Nin { path: path.to_string(), values: value_set(op, arg)? },
            "$exists" => Filter::Exists { path: path.to_string(), exists: truthy(arg) },
            "$regex" => compile_regex(path, arg, options)?,
            "$options" => continue,
            other => {
                return Err(DbError::QueryError(format!("unsupported operator {other} on '{path}'")));
            }
        };
        out.push(f);
    }
    Ok(out)
}

fn value_set(op: &str, arg: &Bson) -> Result<Vec<Bson>, DbError> {
    match arg {
        Bson::Array(items) => Ok(items.iter().take(MAX_IN_SET).cloned().collect()),
        _ => Err(DbError::QueryError(format!("{op} needs an array"))),
    }
}

fn truthy(v: &Bson) -> bool {
    match v {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(f) => *f != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

#[cfg(feature = "regex")]
fn compile_regex(path: &str, value: &Bson, extra_options: Option<&str>) -> Result<Filter, DbError> {
    let (pattern, mut options) = regex_parts(value)
        .ok_or_else(|| DbError::QueryError(format!("$regex on '{path}' needs a string or regex")))?;
    if let Some(extra) = extra_options {
        options.push_str(extra);
    }
    let mut builder = regex::RegexBuilder::new(&pattern);
    for flag in options.chars() {
        match flag {
            'i' => {
                builder.case_insensitive(true);
            }
            'm' => {
                builder.multi_line(true);
            }
            's' => {
                builder.dot_matches_new_line(true);
            }
            'x' => {
                builder.ignore_whitespace(true);
            }
            _ => {}
        }
    }
    let regex = builder
        .build()
        .map_err(|e| DbError::QueryError(format!("invalid regex '{pattern}': {e}")))?;
    Ok(Filter::Regex { path: path.to_string(), regex })
}

#[cfg(not(feature = "regex"))]
fn compile_regex(path: &str, value: &Bson, extra_options: Option<&str>) -> Result<Filter, DbError> {
    let _ = (path, value, extra_options);
    Err(DbError::FeatureNotImplemented("regex".into()))
}

/// Splits a string or BSON regex into `(pattern, options)`.
pub(crate) fn regex_parts(value: &Bson) -> Option<(String, String)> {
    match value {
        Bson::String(s) => Some((s.clone(), String::new())),
        Bson::RegularExpression(_) => {
            let json = value.clone().into_relaxed_extjson();
            let body = json.get("$regularExpression")?;
            let pattern = body.get("pattern")?.as_str()?.to_string();
            let options = body.get("options")?.as_str()?.to_string();
            Some((pattern, options))
        }
        _ => None,
    }
}

pub(crate) fn eval_filter(doc: &Document, filter: &Filter) -> bool {
    match filter {
        Filter::And(fs) => fs.iter().all(|f| eval_filter(doc, f)),
        Filter::Or(fs) => fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Nor(fs) => !fs.iter().any(|f| eval_filter(doc, f)),
        Filter::Exists { path, exists } => !path_values(doc, path).is_empty() == *exists,
        Filter::In { path, values } => in_set(&path_values(doc, path), values),
        Filter::Nin { path, values } => !in_set(&path_values(doc, path), values),
        Filter::Cmp { path, op, value } => {
            let found = path_values(doc, path);
            match op {
                CmpOp::Eq => equals(&found, value),
                CmpOp::Ne => !equals(&found, value),
                _ => found.iter().any(|v| {
                    any_candidate(v, |c| comparable(c, value) && op.accepts(compare_bson(c, value)))
                }),
            }
        }
        #[cfg(feature = "regex")]
        Filter::Regex { path, regex } => path_values(doc, path)
            .iter()
            .any(|v| any_candidate(v, |c| matches!(c, Bson::String(s) if regex.is_match(s)))),
    }
}

// `{ field: null }` also matches documents where the field is missing.
fn equals(found: &[&Bson], value: &Bson) -> bool {
    if found.is_empty() {
        return matches!(value, Bson::Null);
    }
    found.iter().any(|v| any_candidate(v, |c| values_equal(c, value)))
}

fn in_set(found: &[&Bson], values: &[Bson]) -> bool {
    values.iter().any(|x| equals(found, x))
}

/// Tests a value and, for arrays, each element.
fn any_candidate(v: &Bson, pred: impl Fn(&Bson) -> bool) -> bool {
    pred(v) || matches!(v, Bson::Array(items) if items.iter().any(&pred))
}

pub(crate) fn values_equal(a: &Bson, b: &Bson) -> bool {
    if is_num(a) && is_num(b) {
        return as_f64_num(a) == as_f64_num(b);
    }
    a == b
}

fn comparable(a: &Bson, b: &Bson) -> bool {
    use bson::Bson as T;
    (is_num(a) && is_num(b))
        || matches!(
            (a, b),
            (T::String(_), T::String(_))
                | (T::Boolean(_), T::Boolean(_))
                | (T::DateTime(_), T::DateTime(_))
                | (T::ObjectId(_), T::ObjectId(_))
        )
}

pub(crate) fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return None;
    }
    let mut segs = path.split('.');
    let mut cur = doc.get(segs.next()?)?;
    for (depth, seg) in segs.enumerate() {
        if depth + 1 >= MAX_PATH_DEPTH {
            return None;
        }
        cur = match cur {
            Bson::Document(d) => d.get(seg)?,
            Bson::Array(items) => items.get(seg.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(cur)
}

/// Every value a dotted path reaches. Inside an array a numeric segment
/// selects an element and any other segment fans out over the element
/// documents, so `items.sku` reaches each `sku` in `items: [{ sku }, ..]`.
pub(crate) fn path_values<'a>(doc: &'a Document, path: &str) -> Vec<&'a Bson> {
    let mut out = Vec::new();
    if path.is_empty() || path.len() > MAX_PATH_LEN {
        return out;
    }
    let segs: Vec<&str> = path.split('.').collect();
    if segs.len() > MAX_PATH_DEPTH {
        return out;
    }
    if let Some(first) = doc.get(segs[0]) {
        collect_path(first, &segs[1..], &mut out);
    }
    out
}

fn collect_path<'a>(cur: &'a Bson, rest: &[&str], out: &mut Vec<&'a Bson>) {
    let Some((seg, tail)) = rest.split_first() else {
        out.push(cur);
        return;
    };
    match cur {
        Bson::Document(d) => {
            if let Some(next) = d.get(*seg) {
                collect_path(next, tail, out);
            }
        }
        Bson::Array(items) => {
            if let Some(next) = seg.parse::<usize>().ok().and_then(|i| items.get(i)) {
                collect_path(next, tail, out);
            }
            for item in items {
                if let Bson::Document(d) = item {
                    if let Some(next) = d.get(*seg) {
                        collect_path(next, tail, out);
                    }
                }
            }
        }
        _ => {}
    }
}

/// Orders two records by native sort pairs; missing fields sort first.
pub(crate) fn compare_docs(a: &Document, b: &Document, sort: &[(String, i32)]) -> Ordering {
    for (field, dir) in sort {
        let ord = match (get_path(a, field), get_path(b, field)) {
            (Some(x), Some(y)) => compare_bson(x, y),
            (Some(_), None) => Ordering::Greater,
            (None, Some(_)) => Ordering::Less,
            (None, None) => Ordering::Equal,
        };
        if ord != Ordering::Equal {
            return if *dir < 0 { ord.reverse() } else { ord };
        }
    }
    Ordering::Equal
}

fn is_num(x: &Bson) -> bool {
    matches!(x, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_))
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn as_f64_num(x: &Bson) -> f64 {
    match x {
        Bson::Int32(i) => f64::from(*i),
        Bson::Int64(i) => *i as f64,
        Bson::Double(f) => *f,
        Bson::Decimal128(d) => d.to_string().parse::<f64>().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}

pub(crate) fn compare_bson(a: &Bson, b: &Bson) -> Ordering {
    use bson::Bson as T;
    if is_num(a) && is_num(b) {
        return as_f64_num(a).total_cmp(&as_f64_num(b));
    }
    match (a, b) {
        (T::String(x), T::String(y)) => x.cmp(y),
        (T::Boolean(x), T::Boolean(y)) => x.cmp(y),
        (T::DateTime(x), T::DateTime(y)) => x.cmp(y),
        (T::ObjectId(x), T::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

// Cross-type order, numbers first then strings, documents, arrays and so on.
fn type_rank(v: &Bson) -> u8 {
    use bson::Bson as T;
    match v {
        T::MinKey => 0,
        T::Null | T::Undefined => 1,
        T::Int32(_) | T::Int64(_) | T::Double(_) | T::Decimal128(_) => 2,
        T::Symbol(_) | T::String(_) => 3,
        T::Document(_) => 4,
        T::Array(_) => 5,
        T::Binary(_) => 6,
        T::ObjectId(_) => 7,
        T::Boolean(_) => 8,
        T::DateTime(_) => 9,
        T::Timestamp(_) => 10,
        T::RegularExpression(_) => 11,
        T::DbPointer(_) => 12,
        T::JavaScriptCode(_) => 13,
        T::JavaScriptCodeWithScope(_) => 14,
        T::MaxKey => 255,
    }
}
