// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format specs: status and condition strings are consumed by other
//! tools and must not change.

use crate::prelude::*;
use serde_json::json;

#[tokio::test]
async fn operation_status_uses_the_published_field_names() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    let value = serde_json::to_value(world.status("install")).unwrap();

    assert_eq!(value["status"], "Running");
    assert_eq!(value["jobRef"], json!({ "name": "install-1-0", "namespace": NAMESPACE }));
    assert_eq!(value["hasModified"], false);
    assert!(value["startTime"].is_string());
    assert_eq!(value["digest"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn cluster_history_uses_the_published_field_names() {
    let world = World::new();
    world.artifacts.remove(ArtifactKind::Secret, NAMESPACE, "demo-ssh");
    world.create("install", ClusterOperationSpec::builder().build());
    world.settle("install").await;

    let cluster = world.store.cluster(NAMESPACE, "demo").unwrap();
    let value = serde_json::to_value(cluster.status).unwrap();

    assert_eq!(value["conditions"][0]["clusterOps"], "install");
    assert_eq!(value["conditions"][0]["clusterConditionType"], "Blocked");
}

#[test]
fn empty_status_string_reads_as_unstarted() {
    let status: ClusterOperationStatus =
        serde_json::from_value(json!({ "status": "", "attempts": 0 })).unwrap();
    assert_eq!(status.status, None);
}
