// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! batch/v1 Job construction and status interpretation.

use k8s_openapi::api::batch::v1::{Job, JobSpec};
use k8s_openapi::api::core::v1::{
    ConfigMapVolumeSource, Container, PodSpec, PodTemplateSpec,
    ResourceRequirements as PodResources, SecretVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use ko_core::{JobRequest, JobRunState, MountSource, PodRef, ResourceRequirements};
use std::collections::BTreeMap;

/// Container name inside every job pod.
pub const CONTAINER_NAME: &str = "kubeop";

/// Build the Job object for a request.
///
/// `backoffLimit` is always zero: attempts are counted by the controller,
/// not by the Job controller.
pub fn build_job(request: &JobRequest) -> Job {
    let mut volumes = Vec::new();
    let mut volume_mounts = Vec::new();

    for mount in &request.mounts {
        let volume = match &mount.source {
            MountSource::ConfigMap(r) => Volume {
                name: mount.volume.clone(),
                config_map: Some(ConfigMapVolumeSource {
                    name: r.name().to_string(),
                    default_mode: Some(0o755),
                    ..Default::default()
                }),
                ..Default::default()
            },
            MountSource::Secret(r) => Volume {
                name: mount.volume.clone(),
                secret: Some(SecretVolumeSource {
                    secret_name: Some(r.name().to_string()),
                    default_mode: Some(0o400),
                    ..Default::default()
                }),
                ..Default::default()
            },
        };
        volumes.push(volume);
        volume_mounts.push(VolumeMount {
            name: mount.volume.clone(),
            mount_path: mount.mount_path.clone(),
            read_only: Some(true),
            ..Default::default()
        });
    }

    let container = Container {
        name: CONTAINER_NAME.to_string(),
        image: Some(request.image.clone()),
        command: Some(request.command.clone()),
        volume_mounts: Some(volume_mounts),
        resources: pod_resources(&request.resources),
        ..Default::default()
    };

    let owner_references = request.owner.as_ref().map(|o| {
        vec![OwnerReference {
            api_version: o.api_version.clone(),
            kind: o.kind.clone(),
            name: o.name.clone(),
            uid: o.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }]
    });

    Job {
        metadata: ObjectMeta {
            name: Some(request.name.clone()),
            namespace: Some(request.namespace.clone()),
            labels: Some(request.labels.clone()),
            owner_references,
            ..Default::default()
        },
        spec: Some(JobSpec {
            backoff_limit: Some(0),
            active_deadline_seconds: request.active_deadline_seconds,
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(request.labels.clone()),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some("Never".to_string()),
                    containers: vec![container],
                    volumes: Some(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn quantities(map: &BTreeMap<String, String>) -> Option<BTreeMap<String, Quantity>> {
    if map.is_empty() {
        return None;
    }
    Some(map.iter().map(|(k, v)| (k.clone(), Quantity(v.clone()))).collect())
}

fn pod_resources(resources: &ResourceRequirements) -> Option<PodResources> {
    if resources.limits.is_empty() && resources.requests.is_empty() {
        return None;
    }
    Some(PodResources {
        limits: quantities(&resources.limits),
        requests: quantities(&resources.requests),
        ..Default::default()
    })
}

/// Whether the Job controller marked the job as failed.
pub fn has_failed(job: &Job) -> bool {
    failed_condition(job).is_some()
}

fn failed_condition(job: &Job) -> Option<String> {
    let conditions = job.status.as_ref()?.conditions.as_ref()?;
    conditions.iter().find(|c| c.type_ == "Failed" && c.status == "True").map(|c| {
        match (c.reason.as_deref(), c.message.as_deref()) {
            (Some(reason), Some(message)) => format!("{}: {}", reason, message),
            (Some(reason), None) => reason.to_string(),
            (None, Some(message)) => message.to_string(),
            (None, None) => "job failed".to_string(),
        }
    })
}

/// Interpret a Job's status.
///
/// `pod` is attached to failures for diagnostics.
pub fn run_state(job: &Job, pod: Option<PodRef>) -> JobRunState {
    let Some(status) = job.status.as_ref() else {
        return JobRunState::Pending;
    };
    let complete = status
        .conditions
        .as_ref()
        .is_some_and(|cs| cs.iter().any(|c| c.type_ == "Complete" && c.status == "True"));
    if complete || status.succeeded.unwrap_or(0) > 0 {
        return JobRunState::Succeeded;
    }
    if let Some(reason) = failed_condition(job) {
        return JobRunState::Failed { reason, pod };
    }
    if status.active.unwrap_or(0) > 0 || status.start_time.is_some() {
        return JobRunState::Running { started_at: status.start_time.as_ref().map(|t| t.0) };
    }
    JobRunState::Pending
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
