use bson::{Bson, Document};
use proptest::prelude::*;
use merlin_mongo::translate::{parse_sort, translate_delta, translate_filter, translate_sort};
use merlin_mongo::types::{Delta, Order, SortSpec};

fn leaf() -> impl Strategy<Value = Bson> {
    prop_oneof![
        any::<i32>().prop_map(Bson::Int32),
        any::<i64>().prop_map(Bson::Int64),
        "[a-z ]{0,8}".prop_map(Bson::String),
        any::<bool>().prop_map(Bson::Boolean),
        Just(Bson::Null),
    ]
}

fn plain_doc(inner: impl Strategy<Value = Bson>) -> impl Strategy<Value = Document> {
    proptest::collection::btree_map("[a-z]{1,6}", inner, 0..4)
        .prop_map(|m| m.into_iter().collect::<Document>())
}

/// Filter trees with no operator keys at any depth.
fn plain_tree() -> impl Strategy<Value = Document> {
    let value = leaf().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..3).prop_map(Bson::Array),
            plain_doc(inner).prop_map(Bson::Document),
        ]
    });
    plain_doc(value)
}

fn operator_tree() -> impl Strategy<Value = Document> {
    let op = prop_oneof![
        Just("$notIn"), Just("$not"), Just("$gt"), Just("$lte"), Just("$in"), Just("$exists")
    ];
    let ops = proptest::collection::btree_map(op, leaf(), 1..4)
        .prop_map(|m| m.into_iter().map(|(k, v)| (k.to_string(), v)).collect::<Document>());
    proptest::collection::btree_map("[a-z]{1,6}", prop_oneof![leaf(), ops.prop_map(Bson::Document)], 0..5)
        .prop_map(|m| m.into_iter().collect::<Document>())
}

fn sort_specs() -> impl Strategy<Value = Vec<SortSpec>> {
    proptest::collection::vec(
        ("[a-z]{1,6}", any::<bool>()).prop_map(|(field, asc)| SortSpec {
            field,
            order: if asc { Order::Asc } else { Order::Desc },
        }),
        0..6,
    )
}

proptest! {
    #[test]
    fn prop_plain_trees_are_copied(filter in plain_tree()) {
        prop_assert_eq!(translate_filter(&filter).unwrap(), filter);
    }

    #[test]
    fn prop_filter_translation_is_repeatable(filter in operator_tree()) {
        let first = translate_filter(&filter).unwrap();
        let second = translate_filter(&filter).unwrap();
        prop_assert_eq!(&first, &second);
        // Aliases never survive translation.
        for (_, v) in &first {
            if let Bson::Document(ops) = v {
                prop_assert!(!ops.contains_key("$notIn"));
                prop_assert!(!ops.contains_key("$not"));
            }
        }
    }

    #[test]
    fn prop_sort_preserves_order(specs in sort_specs()) {
        match translate_sort(Some(specs.as_slice())) {
            None => prop_assert!(specs.is_empty()),
            Some(native) => {
                prop_assert_eq!(native.len(), specs.len());
                for ((field, dir), spec) in native.pairs().iter().zip(&specs) {
                    prop_assert_eq!(field, &spec.field);
                    prop_assert_eq!(*dir, spec.order.direction());
                }
            }
        }
    }

    #[test]
    fn prop_sort_tokens_round_trip(specs in sort_specs()) {
        let entries: Vec<Document> = specs
            .iter()
            .map(|s| {
                let token = if s.order == Order::Asc { "asc" } else { "desc" };
                let mut entry = Document::new();
                entry.insert(s.field.clone(), token);
                entry
            })
            .collect();
        prop_assert_eq!(parse_sort(&entries).unwrap(), specs);
    }

    #[test]
    fn prop_unset_marks_every_path(paths in proptest::collection::btree_set("[a-z]{1,6}", 0..6)) {
        let list: Vec<Bson> = paths.iter().cloned().map(Bson::String).collect();
        let out = translate_delta(&Delta::new(bson::doc! { "$unset": list })).unwrap();
        let unset = out.get_document("$unset").unwrap();
        prop_assert_eq!(unset.len(), paths.len());
        prop_assert!(paths.iter().all(|p| unset.get_bool(p).unwrap_or(false)));
    }
}
