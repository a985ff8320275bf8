// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes controller wiring.
//!
//! Every `ClusterOperation` event (and every change to a Job it owns) maps
//! to one [`Reconciler::reconcile`] call. A finalizer makes sure the
//! in-flight job is cancelled when an operation is deleted mid-run.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use k8s_openapi::api::batch::v1::Job;
use ko_adapters::{KubeArtifactStore, KubeJobAdapter, KubeResourceStore};
use ko_core::{ClusterOperation, SystemClock};
use ko_engine::{BlockOnDrift, ReconcileConfig, ReconcileDeps, ReconcileOutcome, Reconciler, RuntimeError};
use kube::runtime::controller::Action;
use kube::runtime::finalizer::{finalizer, Event};
use kube::runtime::{watcher, Controller};
use kube::{Api, Client, ResourceExt};

use crate::error::ControllerError;

pub const FINALIZER: &str = "kubeop.io/job-cleanup";

/// Daemon settings read from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Watched namespace; `None` watches all
    pub namespace: Option<String>,
    pub config: ReconcileConfig,
    pub block_on_drift: bool,
    pub error_requeue: Duration,
}

type KubeReconciler = Reconciler<KubeResourceStore, KubeArtifactStore, KubeJobAdapter, SystemClock>;

struct Context {
    client: Client,
    reconciler: KubeReconciler,
    error_requeue: Duration,
}

fn scoped<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
    K::DynamicType: Default,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run until a shutdown signal arrives.
pub async fn run(client: Client, settings: Settings) {
    let deps = ReconcileDeps {
        store: KubeResourceStore::new(client.clone()),
        artifacts: KubeArtifactStore::new(client.clone()),
        jobs: KubeJobAdapter::new(client.clone()),
    };
    let reconciler = Reconciler::new(deps, SystemClock, settings.config);
    let reconciler =
        if settings.block_on_drift { reconciler.with_drift_policy(BlockOnDrift) } else { reconciler };

    let operations: Api<ClusterOperation> = scoped(&client, settings.namespace.as_deref());
    let jobs: Api<Job> = scoped(&client, settings.namespace.as_deref());
    let ctx = Arc::new(Context { client, reconciler, error_requeue: settings.error_requeue });

    Controller::new(operations, watcher::Config::default())
        .owns(jobs, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => tracing::debug!(operation = %obj, ?action, "reconciled"),
                Err(e) => tracing::warn!(error = %e, "controller stream error"),
            }
        })
        .await;
}

async fn reconcile(
    operation: Arc<ClusterOperation>,
    ctx: Arc<Context>,
) -> Result<Action, ControllerError> {
    let namespace =
        operation.namespace().ok_or_else(|| ControllerError::MissingNamespace(operation.name_any()))?;
    let api: Api<ClusterOperation> = Api::namespaced(ctx.client.clone(), &namespace);

    finalizer(&api, FINALIZER, operation, |event| async move {
        match event {
            Event::Apply(op) => {
                let outcome = ctx.reconciler.reconcile(&namespace, &op.name_any()).await?;
                Ok::<_, RuntimeError>(requeue_action(&outcome))
            }
            Event::Cleanup(op) => {
                ctx.reconciler.cancel_operation(&op).await?;
                Ok(Action::await_change())
            }
        }
    })
    .await
    .map_err(|e| ControllerError::Finalizer(Box::new(e)))
}

fn error_policy(operation: Arc<ClusterOperation>, error: &ControllerError, ctx: Arc<Context>) -> Action {
    tracing::warn!(operation = %operation.name_any(), %error, "reconcile failed");
    Action::requeue(ctx.error_requeue)
}

fn requeue_action(outcome: &ReconcileOutcome) -> Action {
    match outcome.requeue_after {
        Some(after) => Action::requeue(after),
        None => Action::await_change(),
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
