// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-run request and observation types shared by the engine and the
//! execution substrate.

use crate::operation::ResourceRequirements;
use crate::reference::{ConfigMapRef, PodRef, SecretRef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Label naming the operation a job runs for.
pub const OPERATION_LABEL: &str = "kubeop.io/cluster-operation";

/// Artifact backing a mounted volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MountSource {
    ConfigMap(ConfigMapRef),
    Secret(SecretRef),
}

/// A configuration artifact mounted into the job container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMount {
    /// Volume name, unique within one request.
    pub volume: String,
    pub source: MountSource,
    pub mount_path: String,
}

impl ArtifactMount {
    pub fn config_map(volume: &str, source: &ConfigMapRef, mount_path: &str) -> Self {
        Self {
            volume: volume.to_string(),
            source: MountSource::ConfigMap(source.clone()),
            mount_path: mount_path.to_string(),
        }
    }

    pub fn secret(volume: &str, source: &SecretRef, mount_path: &str) -> Self {
        Self {
            volume: volume.to_string(),
            source: MountSource::Secret(source.clone()),
            mount_path: mount_path.to_string(),
        }
    }
}

/// Owner recorded on the job so the substrate garbage-collects it with the
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOwner {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// Everything the execution substrate needs to run one plan stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRequest {
    /// Deterministic name; resubmitting the same request is a no-op.
    pub name: String,
    pub namespace: String,
    pub image: String,
    pub command: Vec<String>,
    pub mounts: Vec<ArtifactMount>,
    pub resources: ResourceRequirements,
    pub active_deadline_seconds: Option<i64>,
    pub labels: BTreeMap<String, String>,
    pub owner: Option<JobOwner>,
}

impl JobRequest {
    /// Whether an existing job with this request's name belongs to the same
    /// operation and may be adopted instead of created.
    ///
    /// With an owner the UIDs must match; without one the operation labels
    /// must.
    pub fn is_same_operation(
        &self,
        owner_uids: &[&str],
        labels: &BTreeMap<String, String>,
    ) -> bool {
        match &self.owner {
            Some(owner) => owner_uids.contains(&owner.uid.as_str()),
            None => self.labels.get(OPERATION_LABEL) == labels.get(OPERATION_LABEL),
        }
    }
}

/// State of a job run as reported by the substrate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRunState {
    /// Accepted but no container started yet.
    Pending,
    Running { started_at: Option<DateTime<Utc>> },
    Succeeded,
    Failed { reason: String, pod: Option<PodRef> },
    /// The job no longer exists.
    Missing,
}

crate::simple_display! {
    JobRunState {
        Pending => "pending",
        Running { .. } => "running",
        Succeeded => "succeeded",
        Failed { .. } => "failed",
        Missing => "missing",
    }
}

impl JobRunState {
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. } | Self::Missing)
    }
}

/// Why a plan attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureReason {
    /// The job ran and reported failure, or vanished.
    Execution(String),
    /// The job outlived `activeDeadlineSeconds` and was cancelled.
    DeadlineExceeded { seconds: i64 },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Execution(reason) => write!(f, "execution failed: {}", reason),
            Self::DeadlineExceeded { seconds } => {
                write!(f, "deadline exceeded after {}s", seconds)
            }
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
