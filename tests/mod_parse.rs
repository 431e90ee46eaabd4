use bson::{Bson, doc};
use merlin_mongo::errors::DbError;
use merlin_mongo::translate::{parse_delta_json, parse_filter_json, parse_sort_json, translate_filter};
use merlin_mongo::types::SortSpec;

#[test]
fn filter_json_reads_extended_json() {
    let f = parse_filter_json(r#"{"_id":{"$oid":"65a1b2c3d4e5f6a7b8c9d0e1"},"age":{"$notIn":[1,2]}}"#).unwrap();
    assert!(matches!(f.get("_id"), Some(Bson::ObjectId(_))));
    let native = translate_filter(&f).unwrap();
    assert_eq!(native.get_document("age").unwrap(), &doc! { "$nin": [1, 2] });
}

#[test]
fn filter_json_regex_literal_is_wrapped() {
    let f = parse_filter_json(r#"{"name":{"$regularExpression":{"pattern":"^a","options":"i"}}}"#).unwrap();
    assert!(matches!(f.get("name"), Some(Bson::RegularExpression(_))));
    let native = translate_filter(&f).unwrap();
    let wrapped = native.get_document("name").unwrap();
    assert!(matches!(wrapped.get("$regex"), Some(Bson::RegularExpression(_))));
}

#[test]
fn filter_json_rejects_non_objects() {
    assert!(matches!(parse_filter_json("[1,2]"), Err(DbError::InvalidArgument(_))));
    assert!(matches!(parse_filter_json("{not json"), Err(DbError::Json(_))));
}

#[test]
fn delta_json_with_or_without_diff() {
    let wrapped = parse_delta_json(r#"{"diff":{"$unset":["a"]}}"#).unwrap();
    let bare = parse_delta_json(r#"{"$unset":["a"]}"#).unwrap();
    assert_eq!(wrapped, bare);
    assert!(matches!(parse_delta_json(r#"{"diff":[1]}"#), Err(DbError::InvalidDelta(_))));
}

#[test]
fn sort_json() {
    let specs = parse_sort_json(r#"[{"name":"asc"},{"age":"desc"}]"#).unwrap();
    assert_eq!(specs, vec![SortSpec::asc("name"), SortSpec::desc("age")]);
    assert!(matches!(parse_sort_json(r#"{"name":"asc"}"#), Err(DbError::InvalidArgument(_))));
    assert!(matches!(
        parse_sort_json(r#"[{"name":"up"}]"#),
        Err(DbError::InvalidSortDirection { .. })
    ));
}
