// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for specs: one cluster named `demo` with all of its
//! artifacts present, fake substrates and a controllable clock.

pub use ko_adapters::{ArtifactKind, FakeArtifactStore, FakeJobAdapter, FakeResourceStore};
pub use ko_core::test_support::fixtures::{cluster, cluster_artifacts, operation, NAMESPACE};
pub use ko_core::{
    ActionType, ClusterCondition, ClusterConditionType, ClusterOperationSpec,
    ClusterOperationStatus, FakeClock, HookAction, JobRunState, OpsStatus,
};
pub use ko_engine::{BlockOnDrift, ReconcileConfig, ReconcileDeps, ReconcileOutcome, Reconciler};
pub use std::time::Duration;

pub type FakeReconciler =
    Reconciler<FakeResourceStore, FakeArtifactStore, FakeJobAdapter, FakeClock>;

pub struct World {
    pub store: FakeResourceStore,
    pub artifacts: FakeArtifactStore,
    pub jobs: FakeJobAdapter,
    pub clock: FakeClock,
    pub reconciler: FakeReconciler,
}

impl World {
    pub fn new() -> Self {
        let store = FakeResourceStore::new();
        let artifacts = FakeArtifactStore::new();
        let jobs = FakeJobAdapter::new();
        let clock = FakeClock::new();

        store.put_cluster(cluster("demo"));
        for (kind, name) in cluster_artifacts("demo") {
            if let Some(kind) = ArtifactKind::from_kind(kind) {
                artifacts.insert(kind, NAMESPACE, &name);
            }
        }

        let reconciler = Self::reconciler(&store, &artifacts, &jobs, &clock);
        Self { store, artifacts, jobs, clock, reconciler }
    }

    pub fn reconciler(
        store: &FakeResourceStore,
        artifacts: &FakeArtifactStore,
        jobs: &FakeJobAdapter,
        clock: &FakeClock,
    ) -> FakeReconciler {
        Reconciler::new(
            ReconcileDeps { store: store.clone(), artifacts: artifacts.clone(), jobs: jobs.clone() },
            clock.clone(),
            ReconcileConfig::default(),
        )
    }

    pub fn create(&self, name: &str, spec: ClusterOperationSpec) {
        self.store.put_operation(operation(name, spec));
    }

    pub async fn reconcile(&self, name: &str) -> ReconcileOutcome {
        self.reconciler.reconcile(NAMESPACE, name).await.unwrap()
    }

    /// Reconcile until the operation stops asking to be requeued, advancing
    /// the clock by each requested delay.
    pub async fn settle(&self, name: &str) -> ClusterOperationStatus {
        for _ in 0..100 {
            match self.reconcile(name).await.requeue_after {
                Some(delay) => self.clock.advance(delay),
                None => break,
            }
        }
        self.status(name)
    }

    pub fn status(&self, name: &str) -> ClusterOperationStatus {
        self.store.operation(NAMESPACE, name).unwrap().current_status()
    }

    /// The `demo` cluster's condition history, oldest first.
    pub fn conditions(&self) -> Vec<ClusterCondition> {
        self.store
            .cluster(NAMESPACE, "demo")
            .and_then(|c| c.status)
            .map(|s| s.conditions.iter().map(|(_, c)| c.clone()).collect())
            .unwrap_or_default()
    }

    pub fn fail_every_job(&self) {
        self.jobs.set_default_state(JobRunState::Failed {
            reason: "BackoffLimitExceeded: exit status 2".to_string(),
            pod: None,
        });
    }

    pub fn keep_jobs_running(&self) {
        self.jobs.set_default_state(JobRunState::Running { started_at: None });
    }
}

pub fn shell(action: &str) -> HookAction {
    HookAction::new(ActionType::Shell, action)
}

pub fn playbook(action: &str) -> HookAction {
    HookAction::new(ActionType::Playbook, action)
}
