// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Idempotence and write-race specs

use crate::prelude::*;

#[tokio::test]
async fn back_to_back_reconciles_submit_once() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());

    world.reconcile("install").await;
    world.reconcile("install").await;
    world.reconcile("install").await;

    assert_eq!(world.jobs.created_names(), vec!["install-1-0"]);
}

#[tokio::test]
async fn lost_status_race_adopts_the_existing_job() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.store.inject_operation_conflicts(3);

    let outcome = world.reconcile("install").await;

    assert!(outcome.wrote_status);
    assert_eq!(world.jobs.created_names(), vec!["install-1-0"]);
    assert_eq!(world.status("install").job_ref.unwrap().name(), "install-1-0");
}

#[tokio::test]
async fn interleaved_reconcilers_never_double_submit() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    let other = World::reconciler(&world.store, &world.artifacts, &world.jobs, &world.clock);

    let (a, b) = tokio::join!(
        world.reconciler.reconcile(NAMESPACE, "install"),
        other.reconcile(NAMESPACE, "install"),
    );
    a.unwrap();
    b.unwrap();

    assert_eq!(world.jobs.created_names(), vec!["install-1-0"]);
    assert_eq!(world.status("install").attempts, 1);
}

#[tokio::test]
async fn operations_on_one_cluster_all_land_in_its_history() {
    let world = World::new();
    for name in ["install", "scale", "upgrade"] {
        world.create(name, ClusterOperationSpec::builder().build());
    }
    for name in ["install", "scale", "upgrade"] {
        world.reconcile(name).await;
    }
    world.store.inject_cluster_conflicts(2);

    let (a, b, c) = tokio::join!(world.settle("install"), world.settle("scale"), world.settle("upgrade"));

    for status in [a, b, c] {
        assert_eq!(status.status, Some(OpsStatus::Succeeded));
    }
    let mut recorded: Vec<_> = world.conditions().into_iter().map(|c| c.cluster_ops).collect();
    recorded.sort();
    assert_eq!(recorded, vec!["install", "scale", "upgrade"]);
}

#[tokio::test]
async fn long_names_with_a_shared_prefix_run_their_own_jobs() {
    let world = World::new();
    world.keep_jobs_running();
    let install = format!("{}-install", "a".repeat(70));
    let reset = format!("{}-reset", "a".repeat(70));
    world.create(&install, ClusterOperationSpec::builder().build());
    world.create(&reset, ClusterOperationSpec::builder().build());

    world.reconcile(&install).await;
    world.reconcile(&reset).await;

    let a = world.status(&install).job_ref.unwrap();
    let b = world.status(&reset).job_ref.unwrap();
    assert_ne!(a, b);
    assert_eq!(world.jobs.created().len(), 2);
}

#[tokio::test]
async fn recreated_operation_waits_for_the_old_job_to_go() {
    let world = World::new();
    world.keep_jobs_running();
    world.create("install", ClusterOperationSpec::builder().build());
    world.reconcile("install").await;

    let mut recreated = operation("install", ClusterOperationSpec::builder().build());
    recreated.metadata.uid = Some("uid-install-again".to_string());
    world.store.put_operation(recreated);

    assert!(world.reconciler.reconcile(NAMESPACE, "install").await.is_err());
    assert_eq!(world.status("install").job_ref, None);
    assert_eq!(world.jobs.created().len(), 1);

    world.jobs.forget("install-1-0");
    world.reconcile("install").await;

    assert_eq!(world.status("install").job_ref.unwrap().name(), "install-1-0");
    let owners: Vec<_> = world.jobs.created().into_iter().filter_map(|r| r.owner).collect();
    assert_eq!(owners.last().unwrap().uid, "uid-install-again");
}
