// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job actuation: turns one plan stage into a job request and interprets
//! what the substrate reports back.

use crate::hooks::PlannedStage;
use crate::resolver::ResolvedRefs;
use chrono::{DateTime, Utc};
use ko_adapters::{JobAdapter, JobAdapterError};
use ko_core::{
    ActionSource, ActionType, ArtifactMount, ClusterOperation, FailureReason, HookAction,
    JobOwner, JobRef, JobRequest, JobRunState,
};
use kube::{Resource, ResourceExt};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Scripts shipped in the image
pub const BUILTIN_ACTION_DIR: &str = "/kubespray";
/// Scripts mounted from `actionSourceRef`
pub const CONFIGMAP_ACTION_DIR: &str = "/actions";

const HOSTS_DIR: &str = "/conf/hosts";
const VARS_DIR: &str = "/conf/vars";
const SSH_DIR: &str = "/auth";
const KUBECONF_DIR: &str = "/root/.kube";
const PRECHECK_DIR: &str = "/precheck";
const ENTRYPOINT_DIR: &str = "/entrypoint";

/// Kubernetes caps label values (and so job names, via `job-name`) at 63.
const MAX_NAME_LEN: usize = 63;
/// Hex digits of the full name kept when a name is shortened.
const NAME_HASH_LEN: usize = 8;

pub const LABEL_OPERATION: &str = ko_core::OPERATION_LABEL;
pub const LABEL_CLUSTER: &str = "kubeop.io/cluster";
pub const LABEL_ATTEMPT: &str = "kubeop.io/attempt";
pub const LABEL_STAGE: &str = "kubeop.io/stage";

/// Deterministic job name for one stage of one attempt.
///
/// The `-<attempt>-<stage>` suffix is always kept whole. An operation name
/// too long for the rest is cut and tagged with a hash of the full name, so
/// distinct operations never share a job.
pub fn job_name(operation: &str, attempt: u32, stage: u32) -> String {
    let suffix = format!("-{}-{}", attempt, stage);
    let room = MAX_NAME_LEN.saturating_sub(suffix.len());
    format!("{}{}", shorten(operation, room), suffix)
}

/// `value` unchanged when it fits in `limit`, otherwise a prefix followed by
/// `-<hash>`.
fn shorten(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let hash = format!("{:x}", Sha256::digest(value.as_bytes()));
    let keep = limit.saturating_sub(NAME_HASH_LEN + 1);
    let prefix: String = value.chars().take(keep).collect();
    format!("{}-{}", prefix.trim_end_matches(['-', '.', '_']), &hash[..NAME_HASH_LEN])
}

fn label_value(value: &str) -> String {
    shorten(value, MAX_NAME_LEN)
}

fn action_path(action: &HookAction) -> String {
    let dir = match action.action_source {
        ActionSource::Builtin => BUILTIN_ACTION_DIR,
        ActionSource::Configmap => CONFIGMAP_ACTION_DIR,
    };
    format!("{}/{}", dir, action.action)
}

/// Shell line that runs one stage.
pub fn stage_script(action: &HookAction, refs: &ResolvedRefs, primary: bool) -> String {
    let mut line = match action.action_type {
        ActionType::Playbook => {
            let mut parts = vec![
                "ansible-playbook".to_string(),
                format!("-i {}/hosts.yml", HOSTS_DIR),
                "--become --become-user=root".to_string(),
                format!("-e @{}/group_vars.yml", VARS_DIR),
            ];
            if refs.ssh_auth.is_some() {
                parts.push(format!("--private-key {}/ssh-privatekey", SSH_DIR));
            }
            parts.push(action_path(action));
            parts.join(" ")
        }
        ActionType::Shell => format!("bash {}", action_path(action)),
    };
    if !action.extra_args.trim().is_empty() {
        line.push(' ');
        line.push_str(action.extra_args.trim());
    }
    if primary && refs.pre_check.is_some() {
        line = format!("bash {}/pre-check.sh && {}", PRECHECK_DIR, line);
    }
    line
}

/// Build the job request for one plan stage.
pub fn build_request(
    operation: &ClusterOperation,
    stage_index: u32,
    planned: &PlannedStage,
    refs: &ResolvedRefs,
    attempt: u32,
) -> JobRequest {
    let name = operation.name_any();
    let primary = planned.stage == crate::hooks::Stage::Primary;
    let script = stage_script(&planned.action, refs, primary);

    let mut mounts = vec![
        ArtifactMount::config_map("hosts-conf", &refs.hosts, HOSTS_DIR),
        ArtifactMount::config_map("vars-conf", &refs.vars, VARS_DIR),
    ];
    if let Some(ssh) = &refs.ssh_auth {
        mounts.push(ArtifactMount::secret("ssh-auth", ssh, SSH_DIR));
    }
    if let Some(kube_conf) = &refs.kube_conf {
        mounts.push(ArtifactMount::config_map("kube-conf", kube_conf, KUBECONF_DIR));
    }
    if let (true, Some(pre_check)) = (primary, &refs.pre_check) {
        mounts.push(ArtifactMount::config_map("pre-check", pre_check, PRECHECK_DIR));
    }
    if let Some(source) = refs.action_source(&planned.action) {
        mounts.push(ArtifactMount::config_map("action-source", &source, CONFIGMAP_ACTION_DIR));
    }

    let command = match &refs.entrypoint {
        Some(entrypoint) => {
            mounts.push(ArtifactMount::config_map("entrypoint", entrypoint, ENTRYPOINT_DIR));
            vec!["/bin/bash".to_string(), format!("{}/entrypoint.sh", ENTRYPOINT_DIR), script]
        }
        None => vec!["/bin/bash".to_string(), "-c".to_string(), script],
    };

    let labels = BTreeMap::from([
        (LABEL_OPERATION.to_string(), label_value(&name)),
        (LABEL_CLUSTER.to_string(), label_value(&operation.spec.cluster)),
        (LABEL_ATTEMPT.to_string(), attempt.to_string()),
        (LABEL_STAGE.to_string(), stage_index.to_string()),
    ]);

    let owner = operation.uid().map(|uid| JobOwner {
        api_version: ClusterOperation::api_version(&()).to_string(),
        kind: ClusterOperation::kind(&()).to_string(),
        name: name.clone(),
        uid,
    });

    JobRequest {
        name: job_name(&name, attempt, stage_index),
        namespace: refs.namespace.clone(),
        image: operation.spec.image.clone(),
        command,
        mounts,
        resources: operation.spec.resource.clone(),
        active_deadline_seconds: operation.spec.active_deadline_seconds,
        labels,
        owner,
    }
}

/// What a reconcile pass learned about the in-flight job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobObservation {
    Pending,
    Running,
    Succeeded,
    Failed(String),
    /// Ran past `activeDeadlineSeconds`
    DeadlineExceeded { seconds: i64 },
    /// The job is gone
    Missing,
}

ko_core::simple_display! {
    JobObservation {
        Pending => "pending",
        Running => "running",
        Succeeded => "succeeded",
        Failed(..) => "failed",
        DeadlineExceeded { .. } => "deadline-exceeded",
        Missing => "missing",
    }
}

impl JobObservation {
    /// Why the attempt failed, when this observation ends it.
    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            JobObservation::Failed(reason) => Some(FailureReason::Execution(reason.clone())),
            JobObservation::DeadlineExceeded { seconds } => {
                Some(FailureReason::DeadlineExceeded { seconds: *seconds })
            }
            JobObservation::Missing => {
                Some(FailureReason::Execution("job no longer exists".to_string()))
            }
            _ => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, JobObservation::Pending | JobObservation::Running)
    }
}

/// Interpret a job state against the operation's deadline.
pub fn observe(state: &JobRunState, deadline: Option<i64>, now: DateTime<Utc>) -> JobObservation {
    match state {
        JobRunState::Pending => JobObservation::Pending,
        JobRunState::Running { started_at } => match (deadline, started_at) {
            (Some(seconds), Some(started)) if (now - *started).num_seconds() >= seconds => {
                JobObservation::DeadlineExceeded { seconds }
            }
            _ => JobObservation::Running,
        },
        JobRunState::Succeeded => JobObservation::Succeeded,
        JobRunState::Failed { reason, .. } if reason.contains("DeadlineExceeded") => {
            JobObservation::DeadlineExceeded { seconds: deadline.unwrap_or_default() }
        }
        JobRunState::Failed { reason, pod } => match pod {
            Some(pod) => JobObservation::Failed(format!("{} (pod {})", reason, pod.data())),
            None => JobObservation::Failed(reason.clone()),
        },
        JobRunState::Missing => JobObservation::Missing,
    }
}

/// The only component that talks to the job substrate.
#[derive(Clone)]
pub struct JobActuator<J> {
    jobs: J,
}

impl<J: JobAdapter> JobActuator<J> {
    pub fn new(jobs: J) -> Self {
        Self { jobs }
    }

    pub async fn submit(&self, request: &JobRequest) -> Result<JobRef, JobAdapterError> {
        self.jobs.submit(request).await
    }

    pub async fn poll(
        &self,
        job: &JobRef,
        deadline: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<JobObservation, JobAdapterError> {
        let state = self.jobs.status(job).await?;
        let observation = observe(&state, deadline, now);
        tracing::debug!(job = %job.name(), %state, %observation, "polled job");
        Ok(observation)
    }

    pub async fn cancel(&self, job: &JobRef) -> Result<(), JobAdapterError> {
        self.jobs.cancel(job).await
    }
}

#[cfg(test)]
#[path = "actuator_tests.rs"]
mod tests;
