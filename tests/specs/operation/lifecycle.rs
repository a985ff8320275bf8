// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation lifecycle specs
//!
//! Acceptance, retries, terminal outcomes and the condition they leave on
//! the owning cluster.

use crate::prelude::*;

#[tokio::test]
async fn missing_hosts_artifact_blocks_without_submitting() {
    let world = World::new();
    world.artifacts.remove(ArtifactKind::ConfigMap, NAMESPACE, "demo-hosts");
    world.create("install", ClusterOperationSpec::builder().build());

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Blocked));
    assert!(status.message.unwrap_or_default().contains("hostsConfRef"));
    assert!(world.jobs.created().is_empty());
    assert_eq!(world.conditions().len(), 1);
    assert_eq!(world.conditions()[0].cluster_condition_type, ClusterConditionType::Blocked);
}

#[tokio::test]
async fn hosts_override_to_a_missing_artifact_blocks() {
    let world = World::new();
    world.create(
        "install",
        ClusterOperationSpec::builder()
            .hosts_conf_ref(ko_core::ConfigMapRef::new("canary-hosts", ""))
            .build(),
    );

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Blocked));
    assert!(world.jobs.created().is_empty());
}

#[tokio::test]
async fn nameless_overrides_use_the_cluster_references() {
    let world = World::new();
    world.create(
        "install",
        ClusterOperationSpec::builder()
            .hosts_conf_ref(ko_core::ConfigMapRef::new("", ""))
            .ssh_auth_ref(ko_core::SecretRef::new("", ""))
            .build(),
    );

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Succeeded));
    let mounts = &world.jobs.created()[0].mounts;
    assert!(mounts.iter().any(|m| m.source
        == ko_core::MountSource::ConfigMap(ko_core::ConfigMapRef::new("demo-hosts", NAMESPACE))));
}

#[tokio::test]
async fn missing_cluster_blocks() {
    let world = World::new();
    world.create("install", ClusterOperationSpec::builder().cluster("nowhere").build());

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Blocked));
    assert!(world.jobs.created().is_empty());
}

#[tokio::test]
async fn always_failing_job_is_submitted_backoff_limit_times() {
    let world = World::new();
    world.fail_every_job();
    world.create("install", ClusterOperationSpec::builder().backoff_limit(2).build());

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Failed));
    assert_eq!(status.attempts, 2);
    assert_eq!(world.jobs.created_names(), vec!["install-1-0", "install-2-0"]);
    assert_eq!(world.conditions()[0].cluster_condition_type, ClusterConditionType::Failed);
}

#[tokio::test]
async fn retries_wait_for_a_growing_backoff() {
    let world = World::new();
    world.fail_every_job();
    world.create("install", ClusterOperationSpec::builder().backoff_limit(3).build());

    world.reconcile("install").await;
    let first = world.reconcile("install").await.requeue_after;
    world.clock.advance(first.unwrap());
    world.reconcile("install").await;
    let second = world.reconcile("install").await.requeue_after;

    assert!(second > first);
}

#[tokio::test]
async fn failing_pre_hook_stops_before_the_primary_action() {
    let world = World::new();
    world.fail_every_job();
    world.create(
        "install",
        ClusterOperationSpec::builder().pre_hook(vec![shell("drain.sh")]).build(),
    );

    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Failed));
    assert!(status.job_ref.is_none());
    assert_eq!(world.jobs.created_names(), vec!["install-1-0"]);
    let command = &world.jobs.created()[0].command;
    assert!(command.last().unwrap().contains("drain.sh"));
}

#[tokio::test]
async fn first_attempt_success_records_one_condition() {
    let world = World::new();
    world.create("install", ClusterOperationSpec::builder().build());

    world.reconcile("install").await;
    world.clock.advance(Duration::from_secs(90));
    let status = world.settle("install").await;

    assert_eq!(status.status, Some(OpsStatus::Succeeded));
    let conditions = world.conditions();
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].cluster_ops, "install");
    assert_eq!(conditions[0].cluster_condition_type, ClusterConditionType::Succeeded);
    assert_eq!(conditions[0].start_time, status.start_time);
    assert_eq!(conditions[0].end_time, status.end_time);
    assert!(status.end_time > status.start_time);
}

#[tokio::test]
async fn terminal_operation_is_left_alone() {
    let world = World::new();
    world.create("install", ClusterOperationSpec::builder().build());
    let done = world.settle("install").await;

    world.store.edit_operation_spec(NAMESPACE, "install", |spec| spec.action = "reset.yml".into());
    let again = world.settle("install").await;

    assert_eq!(done, again);
    assert_eq!(world.jobs.created().len(), 1);
    assert_eq!(world.conditions().len(), 1);
}

#[tokio::test]
async fn deadline_counts_as_a_failed_attempt() {
    let world = World::new();
    world.jobs.set_default_state(JobRunState::Running {
        started_at: Some(ko_core::Clock::utc_now(&world.clock)),
    });
    world.create(
        "install",
        ClusterOperationSpec::builder().active_deadline_seconds(60).backoff_limit(2).build(),
    );

    world.reconcile("install").await;
    world.clock.advance(Duration::from_secs(61));
    world.reconcile("install").await;

    let status = world.status("install");
    assert_eq!(status.status, Some(OpsStatus::Running));
    assert!(status.job_ref.is_none());
    assert!(status.message.unwrap_or_default().contains("deadline exceeded"));
    assert_eq!(world.jobs.cancelled().len(), 1);
}

#[tokio::test]
async fn deleted_operation_cancels_its_job() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    let op = world.store.operation(NAMESPACE, "install").unwrap();
    world.reconciler.cancel_operation(&op).await.unwrap();

    assert_eq!(world.jobs.cancelled().len(), 1);
}
