//! # Property-Based Tests
//!
//! Order independence and referential integrity of the registry over
//! randomly generated, internally consistent record sets.

use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;
use serde_json::{Value, json};
use threadloom_core::{PostKind, Record, Registry, ThreadError};

/// Ids at or above this value are referenced but never arrive.
const EXTERNAL_BASE: i64 = 10_000;

// =============================================================================
// GENERATORS
// =============================================================================

type Step = (u8, Index, Index, bool);

fn pick(index: &Index, sources: &[i64], external: bool) -> i64 {
    if external || sources.is_empty() {
        EXTERNAL_BASE + index.index(5) as i64
    } else {
        sources[index.index(sources.len())]
    }
}

/// Turn a plan into records whose parents are always thread-sources.
fn build_records(plan: Vec<Step>) -> Vec<Value> {
    let mut sources: Vec<i64> = Vec::new();
    let mut records = Vec::with_capacity(plan.len());

    for (offset, (kind, first, second, external)) in plan.into_iter().enumerate() {
        let id = offset as i64 + 1;
        let a = pick(&first, &sources, external);
        let b = pick(&second, &sources, false);
        let record = match kind {
            0 => json!({"id": id}),
            1 => json!({"id": id, "retweeted_status": a}),
            2 => json!({"id": id, "quoted_status_id": a}),
            3 => json!({"id": id, "in_reply_to_status_id": a}),
            4 => json!({"id": id, "in_reply_to_status_id": a, "quoted_status_id": b}),
            _ => json!({"id": id, "retweeted_status": a, "quoted_status_id": b}),
        };
        if matches!(kind, 0 | 2 | 3 | 4) {
            sources.push(id);
        }
        records.push(record);
    }
    records
}

fn records_strategy() -> impl Strategy<Value = Vec<Value>> {
    vec((0u8..6, any::<Index>(), any::<Index>(), any::<bool>()), 1..40).prop_map(build_records)
}

fn store_all(records: &[Value]) -> Result<Registry, ThreadError> {
    let mut registry = Registry::new();
    for value in records {
        registry.store(Record::from_value(value.clone())?)?;
    }
    Ok(registry)
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Any arrival order yields the same registry.
    #[test]
    fn order_independence(
        (records, shuffled) in records_strategy()
            .prop_flat_map(|records| (Just(records.clone()), Just(records).prop_shuffle()))
    ) {
        let ordered = store_all(&records).expect("ordered load");
        let permuted = store_all(&shuffled).expect("shuffled load");
        prop_assert_eq!(ordered, permuted);
    }

    /// Every parent resolves to an entry that lists the post as a child.
    #[test]
    fn no_dangling_references(records in records_strategy()) {
        let registry = store_all(&records).expect("load");
        for post in registry.concrete() {
            for parent in post.parents().ids() {
                let entry = registry.lookup(parent);
                prop_assert!(entry.is_some());
                prop_assert!(entry.is_some_and(|e| e.children().contains(post.id())));
            }
        }
    }

    /// Only never-arriving ids remain placeholders.
    #[test]
    fn placeholders_only_for_missing_records(records in records_strategy()) {
        let registry = store_all(&records).expect("load");
        prop_assert_eq!(registry.stats().concrete(), records.len());
        for placeholder in registry.placeholders() {
            prop_assert!(placeholder.id().0 >= EXTERNAL_BASE);
            prop_assert!(!placeholder.children().is_empty());
        }
    }

    /// Storing any record a second time is a duplicate fault.
    #[test]
    fn restore_is_duplicate(records in records_strategy(), index in any::<Index>()) {
        let mut registry = store_all(&records).expect("load");
        let again = records[index.index(records.len())].clone();
        let result = registry.store(Record::from_value(again).expect("object"));
        let is_duplicate = matches!(result, Err(ThreadError::DuplicatePost { .. }));
        prop_assert!(is_duplicate);
    }

    /// Leaf kinds never hold children.
    #[test]
    fn leaves_have_no_children(records in records_strategy()) {
        let registry = store_all(&records).expect("load");
        for kind in [PostKind::Retweet, PostKind::QuotedRetweet] {
            for post in registry.posts(kind) {
                prop_assert!(post.children().is_empty());
            }
        }
    }
}
