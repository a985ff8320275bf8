// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cluster::ClusterConditionType;
use chrono::DateTime;
use proptest::prelude::*;

fn condition(op: &str, kind: ClusterConditionType, start: i64) -> ClusterCondition {
    ClusterCondition {
        cluster_ops: op.to_string(),
        cluster_condition_type: kind,
        start_time: DateTime::from_timestamp(start, 0),
        end_time: DateTime::from_timestamp(start + 60, 0),
    }
}

#[test]
fn append_returns_monotonic_indices() {
    let mut log = ConditionLog::new();
    let a = log.append(condition("install", ClusterConditionType::Succeeded, 0));
    let b = log.append(condition("upgrade", ClusterConditionType::Failed, 10));

    assert!(a < b);
    assert_eq!(a.get(), 0);
    assert_eq!(log.get(b).unwrap().cluster_ops, "upgrade");
    assert_eq!(log.len(), 2);
}

#[test]
fn record_deduplicates_repeated_outcomes() {
    let mut log = ConditionLog::new();
    let first = log.record(condition("install", ClusterConditionType::Succeeded, 0));
    let again = log.record(condition("install", ClusterConditionType::Succeeded, 0));

    assert!(first.is_appended());
    assert_eq!(again, ConditionOutcome::Duplicate(first.index()));
    assert_eq!(log.len(), 1);
}

#[test]
fn same_operation_different_start_is_a_new_entry() {
    let mut log = ConditionLog::new();
    log.record(condition("install", ClusterConditionType::Failed, 0));
    let outcome = log.record(condition("install", ClusterConditionType::Failed, 500));

    assert!(outcome.is_appended());
    assert_eq!(log.for_operation("install").count(), 2);
}

#[test]
fn serializes_as_plain_list() {
    let mut log = ConditionLog::new();
    log.append(condition("install", ClusterConditionType::Blocked, 0));
    let value = serde_json::to_value(&log).unwrap();

    assert!(value.is_array());
    assert_eq!(value[0]["clusterConditionType"], "Blocked");
    let back: ConditionLog = serde_json::from_value(value).unwrap();
    assert_eq!(back, log);
}

fn arb_kind() -> impl Strategy<Value = ClusterConditionType> {
    prop_oneof![
        Just(ClusterConditionType::Running),
        Just(ClusterConditionType::Succeeded),
        Just(ClusterConditionType::Failed),
        Just(ClusterConditionType::Blocked),
    ]
}

proptest! {
    #[test]
    fn recording_only_ever_extends_the_log(
        records in proptest::collection::vec(("[a-c]", arb_kind(), 0i64..4), 0..24)
    ) {
        let mut log = ConditionLog::new();
        for (op, kind, start) in records {
            let before = log.clone();
            let outcome = log.record(condition(&op, kind, start));
            prop_assert!(log.extends(&before));
            prop_assert!(log.len() <= before.len() + 1);
            prop_assert_eq!(outcome.is_appended(), log.len() == before.len() + 1);
            prop_assert!(log.get(outcome.index()).is_some());
        }
    }
}
