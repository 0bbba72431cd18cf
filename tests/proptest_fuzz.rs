//! Property-based tests (fuzzing) for the query compiler and bulk reconciliation.
//!
//! Uses proptest to generate random/malformed inputs and verify the adapter
//! never panics, only returns clean errors, and keeps bulk results in request order.
//!
//! Run with: `cargo test --test proptest_fuzz`

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use search_adapter::bulk::{
    compaction_keys, merge_refreshed, retain_successful, BulkAction, BulkItem, BulkOperation, BulkRequest,
    ItemOutcome, OutcomeKind,
};
use search_adapter::query::{compile, FilterQuery, QueryCompiler};
use search_adapter::{Paginate, RefreshPolicy};

// =============================================================================
// Strategies for generating test data
// =============================================================================

/// Generate arbitrary JSON values (including invalid structures)
fn arbitrary_json_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(|n| Value::Number(n.into())),
        ".*".prop_map(Value::String),
    ];

    leaf.prop_recursive(
        4,   // depth
        64,  // max nodes
        10,  // items per collection
        |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..10)
                    .prop_map(Value::Array),
                prop::collection::hash_map(".*", inner, 0..10)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        },
    )
}

/// Criteria-shaped JSON: operator keys mixed with plain fields, so the compiler
/// gets past the top-level shape check most of the time.
fn criteria_strategy() -> impl Strategy<Value = Value> {
    let key = prop_oneof![
        prop::sample::select(vec![
            "$or", "$and", "$all", "$sqs", "$nested", "$child", "$parent", "$exists",
            "$missing", "$path", "$type", "$fields", "$query", "$in", "$gt", "$ne",
        ])
        .prop_map(|key| key.to_string()),
        "[a-z]{1,6}",
    ];
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-z]{0,6}".prop_map(Value::String),
    ];

    leaf.prop_recursive(6, 128, 6, move |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::vec((key.clone(), inner), 0..5)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// One outcome per position; `true` means the item succeeded.
fn outcomes_from_mask(mask: &[bool]) -> Vec<ItemOutcome> {
    mask.iter()
        .enumerate()
        .map(|(position, ok)| {
            let kind = if *ok {
                OutcomeKind::Created { id: format!("id-{position}") }
            } else {
                OutcomeKind::Failed { status: 409, error: json!({"type": "conflict"}) }
            };
            ItemOutcome {
                position,
                action: BulkAction::Create,
                kind,
                item: json!({"ack": position}),
            }
        })
        .collect()
}

// =============================================================================
// Compiler Fuzz Tests
// =============================================================================

proptest! {
    /// Compilation should never panic on arbitrary JSON, only return Err
    #[test]
    fn fuzz_compile_arbitrary_json(json in arbitrary_json_strategy()) {
        let _ = compile(Some(&json), "id");
    }

    /// Criteria-shaped input either compiles or fails with a typed error
    #[test]
    fn fuzz_compile_criteria_shapes(criteria in criteria_strategy()) {
        let _ = compile(Some(&criteria), "id");
    }

    /// The normalizer should never panic either
    #[test]
    fn fuzz_filter_query_parse(json in arbitrary_json_strategy()) {
        let paginate = Paginate { default: Some(10), max: Some(50) };
        if let Ok(parsed) = FilterQuery::parse(Some(&json), &paginate) {
            prop_assert!(parsed.filters.limit.is_some_and(|limit| limit <= 50));
        }
    }

    /// Compilation is a pure function of its input
    #[test]
    fn prop_compile_deterministic(criteria in criteria_strategy()) {
        let compiler = QueryCompiler::new("id");
        prop_assert_eq!(compiler.compile(Some(&criteria)), compiler.compile(Some(&criteria)));
    }

    /// A bare array of N scalars yields exactly N term clauses, in order
    #[test]
    fn prop_bare_array_term_per_element(values in prop::collection::vec(any::<i64>(), 1..20)) {
        let criteria = json!({ "field": values });
        let q = compile(Some(&criteria), "id").unwrap().unwrap();
        prop_assert_eq!(q.filter.len(), values.len());
        for (clause, value) in q.filter.iter().zip(&values) {
            prop_assert_eq!(clause, &json!({"term": {"field": value}}));
        }
    }

    /// $or sets minimum_should_match exactly when some branch is non-empty
    #[test]
    fn prop_or_minimum_should_match(branches in prop::collection::vec(prop::option::of(0i64..100), 0..6)) {
        let criteria = json!({
            "$or": branches
                .iter()
                .map(|branch| branch.map_or_else(|| json!({}), |v| json!({"n": v})))
                .collect::<Vec<_>>()
        });
        let non_empty = branches.iter().filter(|b| b.is_some()).count();
        match compile(Some(&criteria), "id").unwrap() {
            Some(q) => {
                prop_assert_eq!(q.should.len(), non_empty);
                prop_assert_eq!(q.minimum_should_match, Some(1));
            }
            None => prop_assert_eq!(non_empty, 0),
        }
    }

    /// Nesting past the limit is rejected, never a stack overflow
    #[test]
    fn prop_deep_nesting_rejected(depth in 40usize..200) {
        let mut criteria = json!({"leaf": 1});
        for i in 0..depth {
            criteria = if i % 2 == 0 {
                json!({"$and": [criteria]})
            } else {
                json!({"$or": [criteria]})
            };
        }
        prop_assert!(compile(Some(&criteria), "id").is_err());
    }
}

// =============================================================================
// Reconciliation Property Tests
// =============================================================================

proptest! {
    /// Every position keeps its slot: successes take the refreshed documents in
    /// order, failures keep their descriptors
    #[test]
    fn prop_merge_preserves_request_order(mask in prop::collection::vec(any::<bool>(), 0..64)) {
        let outcomes = outcomes_from_mask(&mask);
        let refreshed: Vec<Value> = mask
            .iter()
            .enumerate()
            .filter(|(_, ok)| **ok)
            .map(|(position, _)| json!({"fresh": position}))
            .collect();

        let items = merge_refreshed(outcomes, refreshed).unwrap();
        prop_assert_eq!(items.len(), mask.len());
        for (position, (item, ok)) in items.iter().zip(&mask).enumerate() {
            if *ok {
                prop_assert_eq!(item, &BulkItem::Document(json!({"fresh": position})));
            } else {
                let failure = item.as_failure().unwrap();
                prop_assert_eq!(failure.position, position);
                prop_assert_eq!(&failure.descriptor, &json!({"ack": position}));
            }
        }
    }

    /// Compaction keys are the successful ids, in request order
    #[test]
    fn prop_compaction_keys_follow_successes(mask in prop::collection::vec(any::<bool>(), 0..64)) {
        let outcomes = outcomes_from_mask(&mask);
        let request = BulkRequest::new(None, RefreshPolicy::False).with_operations(
            (0..mask.len())
                .map(|i| BulkOperation::create(Some(format!("id-{i}")), None, Map::new()))
                .collect(),
        );

        let keys = compaction_keys(&outcomes, &request);
        let expected: Vec<String> = mask
            .iter()
            .enumerate()
            .filter(|(_, ok)| **ok)
            .map(|(i, _)| format!("id-{i}"))
            .collect();
        prop_assert_eq!(keys.into_iter().map(|k| k.id).collect::<Vec<_>>(), expected);
    }

    /// A refreshed list of the wrong length is always a contract error
    #[test]
    fn prop_merge_rejects_wrong_length(
        mask in prop::collection::vec(any::<bool>(), 1..32),
        extra in 1usize..4,
    ) {
        let outcomes = outcomes_from_mask(&mask);
        let successes = mask.iter().filter(|ok| **ok).count();
        let refreshed = vec![Value::Null; successes + extra];
        prop_assert!(merge_refreshed(outcomes, refreshed).is_err());
    }

    /// Delete results keep exactly the successful positions
    #[test]
    fn prop_retain_successful(mask in prop::collection::vec(any::<bool>(), 0..64)) {
        let outcomes = outcomes_from_mask(&mask);
        let found: Vec<Value> = (0..mask.len()).map(|i| json!(i)).collect();
        let kept = retain_successful(found, &outcomes);
        let expected: Vec<Value> = mask
            .iter()
            .enumerate()
            .filter(|(_, ok)| **ok)
            .map(|(i, _)| json!(i))
            .collect();
        prop_assert_eq!(kept, expected);
    }
}
