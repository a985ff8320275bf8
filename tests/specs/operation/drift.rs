// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec drift specs
//!
//! The digest taken at acceptance is fixed; edits after that only raise the
//! sticky `hasModified` flag unless the controller runs with a blocking
//! drift policy.

use crate::prelude::*;

#[tokio::test]
async fn extra_args_edit_marks_drift_without_aborting() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;
    let accepted = world.status("install");

    world.store.edit_operation_spec(NAMESPACE, "install", |spec| {
        spec.extra_args = "-e kube_version=v1.29.0".into()
    });
    world.reconcile("install").await;

    let status = world.status("install");
    assert!(status.has_modified);
    assert_eq!(status.status, Some(OpsStatus::Running));
    assert_eq!(status.digest, accepted.digest);
    assert_eq!(status.job_ref, accepted.job_ref);
    assert!(world.jobs.cancelled().is_empty());
}

#[tokio::test]
async fn drift_flag_survives_revert_and_completion() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    world.store.edit_operation_spec(NAMESPACE, "install", |spec| spec.extra_args = "-v".into());
    world.reconcile("install").await;
    world.store.edit_operation_spec(NAMESPACE, "install", |spec| spec.extra_args.clear());
    world.reconcile("install").await;
    assert!(world.status("install").has_modified);

    world.jobs.set_state("install-1-0", JobRunState::Succeeded);
    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Succeeded));
    assert!(status.has_modified);
}

#[tokio::test]
async fn blocking_policy_cancels_the_drifted_run() {
    let mut world = World::new();
    world.keep_jobs_running();
    world.reconciler =
        World::reconciler(&world.store, &world.artifacts, &world.jobs, &world.clock)
            .with_drift_policy(BlockOnDrift);
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    world.store.edit_operation_spec(NAMESPACE, "install", |spec| spec.image = "kubespray:v2.25.0".into());
    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Blocked));
    assert!(status.has_modified);
    assert_eq!(world.jobs.cancelled().len(), 1);
    assert_eq!(world.conditions()[0].cluster_condition_type, ClusterConditionType::Blocked);
}

#[tokio::test]
async fn artifact_deleted_mid_run_blocks() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    world.artifacts.remove(ArtifactKind::ConfigMap, NAMESPACE, "demo-vars");
    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Blocked));
    assert!(status.job_ref.is_none());
    assert_eq!(world.jobs.cancelled().len(), 1);
}
