// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation state machine.
//!
//! [`step`] is a pure function from the stored operation plus what the
//! runtime observed (time, live digest, reference resolution, job state) to
//! the next status and the side effects needed to get there. It never sleeps
//! or performs I/O; suspension is expressed as `requeue_after`.
//!
//! ```text
//! Unstarted ──► Running ──► Succeeded
//!     │            │ ├────► Failed
//!     └────────────┴─┴────► Blocked
//! ```
//!
//! Terminal states never transition. Stepping the same input twice yields
//! the same output, and a Running operation with a job reference only polls.

use crate::actuator::{build_request, JobObservation};
use crate::config::ReconcileConfig;
use crate::error::ResolveError;
use crate::hooks::ExecutionPlan;
use crate::resolver::ResolvedRefs;
use chrono::{DateTime, TimeDelta, Utc};
use ko_core::{
    ClusterCondition, ClusterOperation, ClusterOperationStatus, Effect, JobRef, OpsStatus,
    SpecDigest,
};
use kube::ResourceExt;
use std::time::Duration;

/// What to do once the live spec has drifted from the accepted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftAction {
    /// Keep going; `hasModified` is advisory
    Continue,
    /// Stop the operation and cancel its in-flight job
    Block,
}

pub trait DriftPolicy: Send + Sync {
    fn on_drift(&self, operation: &ClusterOperation) -> DriftAction;
}

/// Mark drift and carry on.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowDrift;

impl DriftPolicy for AllowDrift {
    fn on_drift(&self, _operation: &ClusterOperation) -> DriftAction {
        DriftAction::Continue
    }
}

/// Refuse to keep running against a drifted spec.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlockOnDrift;

impl DriftPolicy for BlockOnDrift {
    fn on_drift(&self, _operation: &ClusterOperation) -> DriftAction {
        DriftAction::Block
    }
}

/// Inputs gathered by the runtime for one step.
#[derive(Debug)]
pub struct Observation {
    pub now: DateTime<Utc>,
    pub live_digest: SpecDigest,
    /// `None` when resolution was skipped (terminal operations).
    pub refs: Option<Result<ResolvedRefs, ResolveError>>,
    /// State of `status.jobRef`, when there is one.
    pub job: Option<JobObservation>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: ClusterOperationStatus,
    pub effects: Vec<Effect>,
    pub requeue_after: Option<Duration>,
}

impl Transition {
    fn wait(status: ClusterOperationStatus, after: Duration) -> Self {
        Self { status, effects: Vec::new(), requeue_after: Some(after) }
    }
}

/// Compute the next status and effects for an operation.
pub fn step(
    operation: &ClusterOperation,
    observed: &Observation,
    policy: &dyn DriftPolicy,
    config: &ReconcileConfig,
) -> Transition {
    let status = operation.current_status();
    match status.status {
        None => accept(operation, status, observed, config),
        Some(OpsStatus::Running) => advance(operation, status, observed, policy, config),
        Some(_) => {
            // Re-emitting is harmless: the recorder drops repeats
            let effects = vec![record_condition(operation, &status)];
            Transition { status, effects, requeue_after: None }
        }
    }
}

fn accept(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    observed: &Observation,
    config: &ReconcileConfig,
) -> Transition {
    let refs = match &observed.refs {
        Some(Ok(refs)) => refs,
        Some(Err(e)) => return block(operation, status, observed.now, e.to_string()),
        None => return Transition::wait(status, config.poll_interval),
    };

    if status.digest.is_empty() {
        status.digest = observed.live_digest.to_string();
    }
    status.status = Some(OpsStatus::Running);
    status.start_time = Some(observed.now);
    status.end_time = None;
    status.attempts = 0;
    start_attempt(operation, status, refs, observed.now, config)
}

fn advance(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    observed: &Observation,
    policy: &dyn DriftPolicy,
    config: &ReconcileConfig,
) -> Transition {
    let now = observed.now;

    if !status.digest.is_empty() && !observed.live_digest.matches(&status.digest) {
        status.has_modified = true;
    }
    if status.has_modified && policy.on_drift(operation) == DriftAction::Block {
        return block(operation, status, now, "spec modified after acceptance".to_string());
    }

    let refs = match &observed.refs {
        Some(Ok(refs)) => refs,
        Some(Err(e)) => return block(operation, status, now, e.to_string()),
        None => return Transition::wait(status, config.poll_interval),
    };

    let Some(job) = status.job_ref.clone() else {
        return retry_when_due(operation, status, refs, now, config);
    };

    match &observed.job {
        None => Transition::wait(status, config.poll_interval),
        Some(o) if o.is_in_flight() => Transition::wait(status, config.poll_interval),
        Some(JobObservation::Succeeded) => {
            let plan = ExecutionPlan::plan(&operation.spec);
            match plan.next(status.stage) {
                Some(next) => submit_stage(operation, status, &plan, next, refs, config),
                None => finish(operation, status, now, OpsStatus::Succeeded, None),
            }
        }
        Some(failed) => fail_attempt(operation, status, job, failed, now, config),
    }
}

/// Begin a fresh attempt at stage 0, or fail if attempts are used up.
fn start_attempt(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    refs: &ResolvedRefs,
    now: DateTime<Utc>,
    config: &ReconcileConfig,
) -> Transition {
    let limit = operation.spec.attempt_limit();
    if status.attempts >= limit {
        let message = format!("no attempts left ({} of {} used)", status.attempts, limit);
        return finish(operation, status, now, OpsStatus::Failed, Some(message));
    }
    status.attempts += 1;
    status.next_retry_time = None;
    status.message = None;
    let plan = ExecutionPlan::plan(&operation.spec);
    submit_stage(operation, status, &plan, 0, refs, config)
}

fn submit_stage(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    plan: &ExecutionPlan,
    index: u32,
    refs: &ResolvedRefs,
    config: &ReconcileConfig,
) -> Transition {
    let Some(planned) = plan.get(index) else {
        return Transition::wait(status, config.poll_interval);
    };
    let request = build_request(operation, index, planned, refs, status.attempts);
    status.stage = index;
    status.action = planned.action.action.clone();
    status.job_ref = Some(JobRef::new(&request.name, &request.namespace));
    Transition {
        status,
        effects: vec![Effect::SubmitJob { request }],
        requeue_after: Some(config.poll_interval),
    }
}

fn retry_when_due(
    operation: &ClusterOperation,
    status: ClusterOperationStatus,
    refs: &ResolvedRefs,
    now: DateTime<Utc>,
    config: &ReconcileConfig,
) -> Transition {
    if let Some(due) = status.next_retry_time.filter(|due| *due > now) {
        let remaining = (due - now).to_std().unwrap_or(config.poll_interval);
        return Transition::wait(status, remaining);
    }
    start_attempt(operation, status, refs, now, config)
}

fn fail_attempt(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    job: JobRef,
    observed: &JobObservation,
    now: DateTime<Utc>,
    config: &ReconcileConfig,
) -> Transition {
    let reason = match observed.failure() {
        Some(reason) => reason.to_string(),
        None => observed.to_string(),
    };
    let stage = ExecutionPlan::plan(&operation.spec)
        .get(status.stage)
        .map(|s| s.stage.to_string())
        .unwrap_or_else(|| format!("stage {}", status.stage));
    let limit = operation.spec.attempt_limit();
    let summary = format!("attempt {}/{} failed at {}: {}", status.attempts, limit, stage, reason);

    let mut effects = Vec::new();
    if matches!(observed, JobObservation::DeadlineExceeded { .. }) {
        effects.push(Effect::CancelJob { job, reason: reason.clone() });
    }
    status.job_ref = None;

    if status.attempts >= limit {
        let mut transition = finish(operation, status, now, OpsStatus::Failed, Some(summary));
        effects.append(&mut transition.effects);
        transition.effects = effects;
        return transition;
    }

    let delay = config.backoff(status.attempts);
    let due = now + TimeDelta::milliseconds(delay.as_millis() as i64);
    status.next_retry_time = Some(due);
    status.message = Some(format!("{}; retrying at {}", summary, due.to_rfc3339()));
    Transition { status, effects, requeue_after: Some(delay) }
}

/// Enter a terminal state.
fn finish(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    now: DateTime<Utc>,
    outcome: OpsStatus,
    message: Option<String>,
) -> Transition {
    status.status = Some(outcome);
    status.start_time = status.start_time.or(Some(now));
    status.end_time = Some(now);
    status.next_retry_time = None;
    status.message = message;
    let effects = vec![record_condition(operation, &status)];
    Transition { status, effects, requeue_after: None }
}

/// Block the operation, cancelling whatever job is in flight.
fn block(
    operation: &ClusterOperation,
    mut status: ClusterOperationStatus,
    now: DateTime<Utc>,
    message: String,
) -> Transition {
    let in_flight = status.job_ref.take();
    let mut transition = finish(operation, status, now, OpsStatus::Blocked, Some(message.clone()));
    if let Some(job) = in_flight {
        transition.effects.insert(0, Effect::CancelJob { job, reason: message });
    }
    transition
}

fn record_condition(operation: &ClusterOperation, status: &ClusterOperationStatus) -> Effect {
    Effect::RecordCondition {
        namespace: operation.namespace_or_default(),
        cluster: operation.spec.cluster.clone(),
        condition: ClusterCondition {
            cluster_ops: operation.name_any(),
            cluster_condition_type: status.status.unwrap_or(OpsStatus::Running).into(),
            start_time: status.start_time,
            end_time: status.end_time,
        },
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;
