// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ko_core::test_support::fixtures::{operation, NAMESPACE};
use ko_core::test_support::strategies::{arb_operation_spec, arb_ops_status};
use ko_core::{digest, ActionType, ClusterConditionType, ClusterOperationSpec, ConfigMapRef, HookAction, SecretRef};
use proptest::prelude::*;
use yare::parameterized;

fn refs() -> ResolvedRefs {
    ResolvedRefs {
        namespace: NAMESPACE.to_string(),
        hosts: ConfigMapRef::new("demo-hosts", NAMESPACE),
        vars: ConfigMapRef::new("demo-vars", NAMESPACE),
        ssh_auth: Some(SecretRef::new("demo-ssh", NAMESPACE)),
        kube_conf: None,
        pre_check: None,
        entrypoint: None,
    }
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600 + secs, 0).unwrap()
}

fn observed(op: &ClusterOperation, now: DateTime<Utc>, job: Option<JobObservation>) -> Observation {
    Observation { now, live_digest: digest(&op.spec).unwrap(), refs: Some(Ok(refs())), job }
}

fn run(op: &ClusterOperation, observation: &Observation) -> Transition {
    step(op, observation, &AllowDrift, &ReconcileConfig::default())
}

fn applied(mut op: ClusterOperation, transition: &Transition) -> ClusterOperation {
    op.status = Some(transition.status.clone());
    op
}

/// Operation accepted at t=0 with its first job submitted.
fn started(spec: ClusterOperationSpec) -> ClusterOperation {
    let op = operation("install", spec);
    let first = run(&op, &observed(&op, at(0), None));
    applied(op, &first)
}

fn submitted_names(transition: &Transition) -> Vec<String> {
    transition
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::SubmitJob { request } => Some(request.name.clone()),
            _ => None,
        })
        .collect()
}

fn recorded(transition: &Transition) -> Vec<ClusterCondition> {
    transition
        .effects
        .iter()
        .filter_map(|e| match e {
            Effect::RecordCondition { condition, .. } => Some(condition.clone()),
            _ => None,
        })
        .collect()
}

#[test]
fn accepting_starts_the_first_stage() {
    let op = operation("install", ClusterOperationSpec::builder().build());
    let t = run(&op, &observed(&op, at(0), None));

    assert_eq!(t.status.status, Some(OpsStatus::Running));
    assert_eq!(t.status.digest, digest(&op.spec).unwrap().into_string());
    assert_eq!(t.status.start_time, Some(at(0)));
    assert_eq!(t.status.attempts, 1);
    assert_eq!(t.status.stage, 0);
    assert_eq!(t.status.action, "cluster.yml");
    assert_eq!(t.status.job_ref, Some(JobRef::new("install-1-0", NAMESPACE)));
    assert_eq!(submitted_names(&t), vec!["install-1-0"]);
    assert_eq!(t.requeue_after, Some(ReconcileConfig::default().poll_interval));
}

#[test]
fn pre_hook_runs_first() {
    let spec = ClusterOperationSpec::builder()
        .pre_hook(vec![HookAction::new(ActionType::Shell, "drain.sh")])
        .build();
    let op = started(spec);

    let status = op.status.unwrap();
    assert_eq!(status.action, "drain.sh");
    assert_eq!(status.stage, 0);
}

#[test]
fn unresolvable_reference_blocks_before_any_job() {
    let op = operation("install", ClusterOperationSpec::builder().build());
    let mut observation = observed(&op, at(5), None);
    observation.refs = Some(Err(ResolveError::NotFound {
        field: "hostsConfRef",
        kind: "ConfigMap",
        reference: "kubeop-system/demo-hosts".to_string(),
    }));

    let t = run(&op, &observation);

    assert_eq!(t.status.status, Some(OpsStatus::Blocked));
    assert_eq!(t.status.start_time, Some(at(5)));
    assert_eq!(t.status.end_time, Some(at(5)));
    assert!(t.status.digest.is_empty());
    assert!(t.status.job_ref.is_none());
    assert!(t.status.message.as_deref().unwrap_or_default().contains("hostsConfRef"));
    assert!(submitted_names(&t).is_empty());
    assert_eq!(t.requeue_after, None);

    let conditions = recorded(&t);
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].cluster_ops, "install");
    assert_eq!(conditions[0].cluster_condition_type, ClusterConditionType::Blocked);
}

#[test]
fn unstarted_without_resolution_waits() {
    let op = operation("install", ClusterOperationSpec::builder().build());
    let mut observation = observed(&op, at(0), None);
    observation.refs = None;

    let t = run(&op, &observation);

    assert_eq!(t.status, ClusterOperationStatus::default());
    assert!(t.effects.is_empty());
}

#[parameterized(
    pending = { JobObservation::Pending },
    running = { JobObservation::Running },
)]
fn in_flight_job_only_polls(job: JobObservation) {
    let op = started(ClusterOperationSpec::builder().build());

    let t = run(&op, &observed(&op, at(30), Some(job)));

    assert_eq!(Some(&t.status), op.status.as_ref());
    assert!(t.effects.is_empty());
    assert_eq!(t.requeue_after, Some(ReconcileConfig::default().poll_interval));
}

#[test]
fn stepping_twice_is_idempotent() {
    let op = started(ClusterOperationSpec::builder().build());
    let observation = observed(&op, at(30), Some(JobObservation::Running));

    assert_eq!(run(&op, &observation), run(&op, &observation));
}

#[test]
fn stages_advance_in_order_then_succeed() {
    let spec = ClusterOperationSpec::builder()
        .pre_hook(vec![HookAction::new(ActionType::Shell, "drain.sh")])
        .post_hook(vec![HookAction::new(ActionType::Playbook, "verify.yml")])
        .build();
    let op = started(spec);

    let t = run(&op, &observed(&op, at(60), Some(JobObservation::Succeeded)));
    assert_eq!(t.status.stage, 1);
    assert_eq!(t.status.action, "cluster.yml");
    assert_eq!(submitted_names(&t), vec!["install-1-1"]);
    let op = applied(op, &t);

    let t = run(&op, &observed(&op, at(120), Some(JobObservation::Succeeded)));
    assert_eq!(t.status.stage, 2);
    assert_eq!(submitted_names(&t), vec!["install-1-2"]);
    let op = applied(op, &t);

    let t = run(&op, &observed(&op, at(180), Some(JobObservation::Succeeded)));
    assert_eq!(t.status.status, Some(OpsStatus::Succeeded));
    assert_eq!(t.status.end_time, Some(at(180)));
    assert_eq!(t.status.job_ref, Some(JobRef::new("install-1-2", NAMESPACE)));
    assert_eq!(t.requeue_after, None);

    let conditions = recorded(&t);
    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].cluster_condition_type, ClusterConditionType::Succeeded);
    assert_eq!(conditions[0].start_time, Some(at(0)));
    assert_eq!(conditions[0].end_time, Some(at(180)));
}

#[test]
fn failure_with_attempts_left_backs_off_then_retries() {
    let op = started(ClusterOperationSpec::builder().backoff_limit(3).build());
    let config = ReconcileConfig::default();

    let t = run(&op, &observed(&op, at(60), Some(JobObservation::Failed("exit 2".into()))));
    assert_eq!(t.status.status, Some(OpsStatus::Running));
    assert!(t.status.job_ref.is_none());
    assert_eq!(t.status.attempts, 1);
    assert_eq!(t.status.next_retry_time, Some(at(60) + TimeDelta::seconds(10)));
    assert!(t.status.message.as_deref().unwrap_or_default().contains("attempt 1/3"));
    assert!(t.effects.is_empty());
    assert_eq!(t.requeue_after, Some(config.backoff(1)));
    let op = applied(op, &t);

    let early = run(&op, &observed(&op, at(64), None));
    assert!(early.effects.is_empty());
    assert_eq!(early.requeue_after, Some(Duration::from_secs(6)));

    let t = run(&op, &observed(&op, at(70), None));
    assert_eq!(t.status.attempts, 2);
    assert_eq!(t.status.stage, 0);
    assert!(t.status.next_retry_time.is_none());
    assert_eq!(submitted_names(&t), vec!["install-2-0"]);
}

#[test]
fn failure_at_limit_fails_the_operation() {
    let op = started(ClusterOperationSpec::builder().backoff_limit(1).build());

    let t = run(&op, &observed(&op, at(60), Some(JobObservation::Failed("exit 2".into()))));

    assert_eq!(t.status.status, Some(OpsStatus::Failed));
    assert_eq!(t.status.end_time, Some(at(60)));
    assert!(t.status.job_ref.is_none());
    assert!(t.status.message.as_deref().unwrap_or_default().contains("exit 2"));
    assert_eq!(recorded(&t)[0].cluster_condition_type, ClusterConditionType::Failed);
}

#[parameterized(
    zero = { 0 },
    negative = { -4 },
)]
fn non_positive_backoff_limit_allows_one_attempt(limit: i32) {
    let op = started(ClusterOperationSpec::builder().backoff_limit(limit).build());

    let t = run(&op, &observed(&op, at(60), Some(JobObservation::Missing)));

    assert_eq!(t.status.status, Some(OpsStatus::Failed));
}

#[test]
fn deadline_cancels_the_job_before_failing() {
    let op = started(ClusterOperationSpec::builder().active_deadline_seconds(30).build());

    let t = run(&op, &observed(&op, at(60), Some(JobObservation::DeadlineExceeded { seconds: 30 })));

    assert_eq!(t.status.status, Some(OpsStatus::Failed));
    assert!(matches!(
        &t.effects[0],
        Effect::CancelJob { job, .. } if job.name() == "install-1-0"
    ));
    assert!(matches!(&t.effects[1], Effect::RecordCondition { .. }));
    assert!(t.status.message.as_deref().unwrap_or_default().contains("deadline exceeded after 30s"));
}

#[test]
fn drift_is_marked_and_execution_continues() {
    let mut op = started(ClusterOperationSpec::builder().build());
    let accepted = op.status.as_ref().unwrap().digest.clone();
    op.spec.extra_args = "-e upgrade=true".to_string();

    let t = run(&op, &observed(&op, at(30), Some(JobObservation::Running)));

    assert!(t.status.has_modified);
    assert_eq!(t.status.digest, accepted);
    assert_eq!(t.status.status, Some(OpsStatus::Running));
    assert!(t.effects.is_empty());
}

#[test]
fn drift_flag_stays_set_after_revert() {
    let mut op = started(ClusterOperationSpec::builder().build());
    if let Some(status) = op.status.as_mut() {
        status.has_modified = true;
    }

    let t = run(&op, &observed(&op, at(30), Some(JobObservation::Running)));

    assert!(t.status.has_modified);
}

#[test]
fn blocking_policy_cancels_on_drift() {
    let mut op = started(ClusterOperationSpec::builder().build());
    op.spec.image = "kubespray:v2.25.0".to_string();

    let t = step(
        &op,
        &observed(&op, at(30), Some(JobObservation::Running)),
        &BlockOnDrift,
        &ReconcileConfig::default(),
    );

    assert_eq!(t.status.status, Some(OpsStatus::Blocked));
    assert!(t.status.has_modified);
    assert!(t.status.job_ref.is_none());
    assert!(matches!(&t.effects[0], Effect::CancelJob { job, .. } if job.name() == "install-1-0"));
    assert_eq!(recorded(&t)[0].cluster_condition_type, ClusterConditionType::Blocked);
}

#[test]
fn artifact_removed_mid_run_blocks_and_cancels() {
    let op = started(ClusterOperationSpec::builder().build());
    let mut observation = observed(&op, at(30), Some(JobObservation::Running));
    observation.refs = Some(Err(ResolveError::Invalid { field: "varsConfRef" }));

    let t = run(&op, &observation);

    assert_eq!(t.status.status, Some(OpsStatus::Blocked));
    assert_eq!(t.effects.len(), 2);
    assert!(matches!(&t.effects[0], Effect::CancelJob { .. }));
}

#[parameterized(
    succeeded = { OpsStatus::Succeeded },
    failed = { OpsStatus::Failed },
    blocked = { OpsStatus::Blocked },
)]
fn terminal_status_is_absorbing(outcome: OpsStatus) {
    let mut op = operation("install", ClusterOperationSpec::builder().build());
    op.status = Some(ClusterOperationStatus {
        status: Some(outcome),
        start_time: Some(at(0)),
        end_time: Some(at(10)),
        ..ClusterOperationStatus::default()
    });
    op.spec.action = "reset.yml".to_string();

    let t = run(&op, &observed(&op, at(99), Some(JobObservation::Failed("late".into()))));

    assert_eq!(Some(&t.status), op.status.as_ref());
    assert_eq!(t.requeue_after, None);
    assert_eq!(recorded(&t).len(), 1);
    assert!(submitted_names(&t).is_empty());
}

proptest! {
    #[test]
    fn terminal_operations_never_submit(spec in arb_operation_spec(), outcome in arb_ops_status()) {
        prop_assume!(outcome.is_terminal());
        let mut op = operation("any", spec);
        op.status = Some(ClusterOperationStatus { status: Some(outcome), ..ClusterOperationStatus::default() });

        let t = run(&op, &observed(&op, at(1), Some(JobObservation::Succeeded)));

        prop_assert_eq!(t.status.status, Some(outcome));
        prop_assert!(submitted_names(&t).is_empty());
    }

    #[test]
    fn submissions_never_exceed_the_attempt_limit(spec in arb_operation_spec()) {
        let limit = spec.attempt_limit() as usize;
        let mut op = operation("any", spec);
        let mut submissions = 0;
        let mut now = 0;

        for _ in 0..(limit * 4 + 4) {
            let job = op.status.as_ref().and_then(|s| s.job_ref.as_ref()).map(|_| JobObservation::Missing);
            let t = run(&op, &observed(&op, at(now), job));
            submissions += submitted_names(&t).len();
            op = applied(op, &t);
            now += 3600;
        }

        prop_assert!(submissions <= limit);
        prop_assert_eq!(op.ops_status(), Some(OpsStatus::Failed));
    }
}
