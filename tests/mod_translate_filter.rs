use bson::{Bson, doc, oid::ObjectId};
use merlin_mongo::errors::DbError;
use merlin_mongo::translate::translate_filter;

fn regex(pattern: &str, options: &str) -> Bson {
    Bson::try_from(serde_json::json!({
        "$regularExpression": { "pattern": pattern, "options": options }
    }))
    .unwrap()
}

#[test]
fn not_in_becomes_nin() {
    let out = translate_filter(&doc! { "field": { "$notIn": [1, 2, 3] } }).unwrap();
    assert_eq!(out, doc! { "field": { "$nin": [1, 2, 3] } });
}

#[test]
fn not_becomes_ne() {
    let out = translate_filter(&doc! { "field": { "$not": 5 } }).unwrap();
    assert_eq!(out, doc! { "field": { "$ne": 5 } });
}

#[test]
fn other_operators_pass_through_with_aliases_rewritten() {
    let out = translate_filter(&doc! { "age": { "$gte": 18, "$lt": 65, "$notIn": [30] } }).unwrap();
    assert_eq!(out, doc! { "age": { "$gte": 18, "$lt": 65, "$nin": [30] } });
    let keys: Vec<_> = out.get_document("age").unwrap().keys().cloned().collect();
    assert_eq!(keys, vec!["$gte", "$lt", "$nin"]);
}

#[test]
fn nested_field_map_is_recursed() {
    let out = translate_filter(&doc! { "a": { "b": 1 } }).unwrap();
    assert_eq!(out, doc! { "a": { "b": 1 } });

    let out = translate_filter(&doc! { "a": { "b": { "$not": null } } }).unwrap();
    assert_eq!(out, doc! { "a": { "b": { "$ne": null } } });
}

#[test]
fn regex_literal_is_wrapped() {
    let re = regex("^al", "i");
    let out = translate_filter(&doc! { "name": re.clone() }).unwrap();
    assert_eq!(out, doc! { "name": { "$regex": re } });
}

#[test]
fn regex_nested_under_field_map_is_wrapped() {
    let re = regex("x$", "");
    let out = translate_filter(&doc! { "profile": { "nick": re.clone() } }).unwrap();
    assert_eq!(out, doc! { "profile": { "nick": { "$regex": re } } });
}

#[test]
fn special_values_and_arrays_are_copied() {
    let id = ObjectId::new();
    let when = bson::DateTime::from_millis(1_700_000_000_000);
    let filter = doc! { "_id": id, "at": when, "tags": ["a", { "$not": 1 }], "n": Bson::Null };
    let out = translate_filter(&filter).unwrap();
    assert_eq!(out, filter);
}

#[test]
fn top_level_logical_arrays_are_copied_verbatim() {
    let filter = doc! { "$or": [ { "a": { "$notIn": [1] } }, { "b": 2 } ] };
    let out = translate_filter(&filter).unwrap();
    assert_eq!(out, filter);
}

#[test]
fn empty_inputs() {
    assert_eq!(translate_filter(&doc! {}).unwrap(), doc! {});
    assert_eq!(translate_filter(&doc! { "a": {} }).unwrap(), doc! { "a": {} });
}

#[test]
fn mixed_object_is_rejected_with_path() {
    let err = translate_filter(&doc! { "age": { "$gt": 1, "b": 2 } }).unwrap_err();
    match err {
        DbError::MixedFilterObject { path } => assert_eq!(path, "age"),
        other => panic!("unexpected error: {other}"),
    }

    // Order of keys does not matter.
    let err = translate_filter(&doc! { "outer": { "inner": { "plain": 1, "$lt": 2 } } }).unwrap_err();
    match err {
        DbError::MixedFilterObject { path } => assert_eq!(path, "outer.inner"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(
        translate_filter(&doc! { "x": { "y": 1, "$in": [1] } })
            .unwrap_err()
            .is_precondition()
    );
}

#[test]
fn translation_is_repeatable() {
    let filter = doc! { "a": { "$notIn": [1] }, "b": { "c": { "$not": 2 } }, "d": regex("z", "") };
    let first = translate_filter(&filter).unwrap();
    let second = translate_filter(&filter).unwrap();
    assert_eq!(first, second);
}
