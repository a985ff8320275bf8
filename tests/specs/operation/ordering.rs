// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage ordering specs

use crate::prelude::*;

fn scripts(world: &World) -> Vec<String> {
    world.jobs.created().into_iter().filter_map(|r| r.command.last().cloned()).collect()
}

#[tokio::test]
async fn pre_hooks_then_primary_then_post_hooks() {
    let world = World::new();
    world.create(
        "upgrade",
        ClusterOperationSpec::builder()
            .action("upgrade-cluster.yml")
            .pre_hook(vec![shell("drain.sh"), playbook("backup-etcd.yml")])
            .post_hook(vec![shell("uncordon.sh")])
            .build(),
    );

    let status = world.settle("upgrade").await;

    assert_eq!(status.status, Some(OpsStatus::Succeeded));
    assert_eq!(
        world.jobs.created_names(),
        vec!["upgrade-1-0", "upgrade-1-1", "upgrade-1-2", "upgrade-1-3"]
    );
    let scripts = scripts(&world);
    let expected = ["drain.sh", "backup-etcd.yml", "upgrade-cluster.yml", "uncordon.sh"];
    for (script, action) in scripts.iter().zip(expected) {
        assert!(script.contains(action), "{} should run {}", script, action);
    }
}

#[tokio::test]
async fn failure_at_a_pre_hook_skips_everything_after_it() {
    let world = World::new();
    world.jobs.script([
        JobRunState::Succeeded,
        JobRunState::Failed { reason: "exit 1".into(), pod: None },
    ]);
    world.create(
        "upgrade",
        ClusterOperationSpec::builder()
            .pre_hook(vec![shell("drain.sh"), shell("check.sh")])
            .post_hook(vec![shell("uncordon.sh")])
            .build(),
    );

    let status = world.settle("upgrade").await;

    assert_eq!(status.status, Some(OpsStatus::Failed));
    assert_eq!(world.jobs.created_names(), vec!["upgrade-1-0", "upgrade-1-1"]);
    assert!(status.message.unwrap_or_default().contains("pre-hook[1]"));
}

#[tokio::test]
async fn a_retry_starts_again_from_the_first_stage() {
    let world = World::new();
    world.jobs.script([
        JobRunState::Succeeded,
        JobRunState::Failed { reason: "exit 1".into(), pod: None },
        JobRunState::Succeeded,
        JobRunState::Succeeded,
    ]);
    world.create(
        "upgrade",
        ClusterOperationSpec::builder().pre_hook(vec![shell("drain.sh")]).backoff_limit(2).build(),
    );

    let status = world.settle("upgrade").await;

    assert_eq!(status.status, Some(OpsStatus::Succeeded));
    assert_eq!(
        world.jobs.created_names(),
        vec!["upgrade-1-0", "upgrade-1-1", "upgrade-2-0", "upgrade-2-1"]
    );
}
