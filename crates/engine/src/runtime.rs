// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile runtime.
//!
//! One pass reads the operation fresh, gathers an [`Observation`], steps the
//! state machine and applies the result. Job effects run before the status
//! write; condition records only after the write is accepted. A conflicting
//! write discards the pass and starts over from a fresh read. Because job
//! names are derived from `(operation, attempt, stage)` the repeated submit
//! adopts the job the discarded pass created.

use crate::actuator::JobActuator;
use crate::config::ReconcileConfig;
use crate::error::RuntimeError;
use crate::executor::Executor;
use crate::recorder::ConditionRecorder;
use crate::resolver::Resolver;
use crate::state_machine::{step, AllowDrift, DriftPolicy, Observation};
use ko_adapters::{ArtifactStore, JobAdapter, ResourceStore};
use ko_core::{digest, Clock, ClusterOperation, ClusterOperationStatus, Effect};
use kube::ResourceExt;
use std::sync::Arc;
use std::time::Duration;

/// Substrate adapters the reconciler runs against
pub struct ReconcileDeps<S, A, J> {
    pub store: S,
    pub artifacts: A,
    pub jobs: J,
}

/// Result of one reconcile call.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcileOutcome {
    /// False when the operation no longer exists.
    pub found: bool,
    pub status: Option<ClusterOperationStatus>,
    pub requeue_after: Option<Duration>,
    pub wrote_status: bool,
}

impl ReconcileOutcome {
    fn not_found() -> Self {
        Self { found: false, status: None, requeue_after: None, wrote_status: false }
    }
}

pub struct Reconciler<S, A, J, C> {
    store: S,
    resolver: Resolver<A>,
    actuator: JobActuator<J>,
    executor: Executor<S, J>,
    clock: C,
    policy: Arc<dyn DriftPolicy>,
    config: ReconcileConfig,
}

impl<S, A, J, C> Reconciler<S, A, J, C>
where
    S: ResourceStore,
    A: ArtifactStore,
    J: JobAdapter,
    C: Clock,
{
    pub fn new(deps: ReconcileDeps<S, A, J>, clock: C, config: ReconcileConfig) -> Self {
        let actuator = JobActuator::new(deps.jobs);
        let recorder = ConditionRecorder::new(deps.store.clone(), config.conflict_retries);
        Self {
            executor: Executor::new(actuator.clone(), recorder),
            store: deps.store,
            resolver: Resolver::new(deps.artifacts),
            actuator,
            clock,
            policy: Arc::new(AllowDrift),
            config,
        }
    }

    pub fn with_drift_policy(mut self, policy: impl DriftPolicy + 'static) -> Self {
        self.policy = Arc::new(policy);
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Drive one operation toward its next state.
    pub async fn reconcile(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<ReconcileOutcome, RuntimeError> {
        let passes = self.config.conflict_retries + 1;
        for pass in 1..=passes {
            let Some(operation) = self.store.get_operation(namespace, name).await? else {
                tracing::debug!(namespace, name, "operation gone");
                return Ok(ReconcileOutcome::not_found());
            };

            let observation = self.observe(&operation).await?;
            let transition =
                step(&operation, &observation, self.policy.as_ref(), &self.config);
            let (after_write, before_write): (Vec<Effect>, Vec<Effect>) =
                transition.effects.into_iter().partition(Effect::after_status_write);

            for effect in before_write {
                self.execute_before_write(effect).await?;
            }

            let changed = operation.status.as_ref() != Some(&transition.status);
            if changed {
                let mut updated = operation.clone();
                updated.status = Some(transition.status.clone());
                match self.store.update_operation_status(&updated).await {
                    Ok(_) => {
                        tracing::info!(
                            namespace,
                            name,
                            status = ?transition.status.status,
                            attempt = transition.status.attempts,
                            stage = transition.status.stage,
                            "status written"
                        );
                    }
                    Err(e) if e.is_conflict() => {
                        tracing::info!(namespace, name, pass, "status conflict, re-reading");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            for effect in after_write {
                self.executor.execute(effect).await?;
            }

            return Ok(ReconcileOutcome {
                found: true,
                status: Some(transition.status),
                requeue_after: transition.requeue_after,
                wrote_status: changed,
            });
        }

        Err(RuntimeError::ConflictRetriesExhausted {
            name: format!("{}/{}", namespace, name),
            attempts: passes,
        })
    }

    /// Best-effort cancel of an operation's in-flight job, used when the
    /// operation is being deleted.
    pub async fn cancel_operation(&self, operation: &ClusterOperation) -> Result<(), RuntimeError> {
        let status = operation.current_status();
        if status.is_terminal() {
            return Ok(());
        }
        if let Some(job) = status.job_ref {
            tracing::info!(operation = %operation.name_any(), job = %job.name(), "cancelling job of deleted operation");
            self.actuator.cancel(&job).await?;
        }
        Ok(())
    }

    async fn observe(&self, operation: &ClusterOperation) -> Result<Observation, RuntimeError> {
        let now = self.clock.utc_now();
        let live_digest = digest(&operation.spec)?;
        let status = operation.current_status();
        if status.is_terminal() {
            return Ok(Observation { now, live_digest, refs: None, job: None });
        }

        let namespace = operation.namespace_or_default();
        let cluster = self.store.get_cluster(&namespace, &operation.spec.cluster).await?;
        let refs = match self.resolver.resolve_all(cluster.as_ref(), operation).await {
            Err(e) if !e.is_blocking() => return Err(e.into()),
            result => Some(result),
        };

        let job = match &status.job_ref {
            Some(job) => {
                let deadline = operation.spec.active_deadline_seconds;
                Some(self.actuator.poll(job, deadline, now).await?)
            }
            None => None,
        };

        Ok(Observation { now, live_digest, refs, job })
    }

    async fn execute_before_write(&self, effect: Effect) -> Result<(), RuntimeError> {
        let cancel = matches!(effect, Effect::CancelJob { .. });
        match self.executor.execute(effect).await {
            Ok(_) => Ok(()),
            // The job is abandoned either way
            Err(e) if cancel => {
                tracing::warn!(error = %e, "cancel failed, continuing");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
