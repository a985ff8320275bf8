// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ClusterOperation resource: one declared unit of work against a cluster.

use crate::reference::{ConfigMapRef, JobRef, SecretRef};
use chrono::{DateTime, Utc};
use kube::{CustomResource, ResourceExt};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Whether an action is an Ansible playbook or a shell script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    #[default]
    Playbook,
    Shell,
}

crate::simple_display! {
    ActionType {
        Playbook => "playbook",
        Shell => "shell",
    }
}

/// Where an action's script content comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    /// Shipped inside the job image.
    #[default]
    Builtin,
    /// Mounted from the ConfigMap named by `actionSourceRef`.
    Configmap,
}

crate::simple_display! {
    ActionSource {
        Builtin => "builtin",
        Configmap => "configmap",
    }
}

/// A pre- or post-hook. Also the shape the primary action takes once it
/// enters an execution plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct HookAction {
    pub action_type: ActionType,
    pub action: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_source: ActionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_source_ref: Option<ConfigMapRef>,
    #[serde(default)]
    pub extra_args: String,
}

impl HookAction {
    pub fn new(action_type: ActionType, action: impl Into<String>) -> Self {
        Self { action_type, action: action.into(), ..Self::default() }
    }

    crate::setters! {
        into { extra_args: String }
        set { action_source: ActionSource }
        option { action_source_ref: ConfigMapRef }
    }

    /// Source reference when the script comes from a ConfigMap.
    pub fn source_ref(&self) -> Option<&ConfigMapRef> {
        match self.action_source {
            ActionSource::Builtin => None,
            ActionSource::Configmap => self.action_source_ref.as_ref(),
        }
    }
}

/// CPU and memory requests/limits, as Kubernetes quantity strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct ResourceRequirements {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub limits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub requests: BTreeMap<String, String>,
}

#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeop.io",
    version = "v1alpha1",
    kind = "ClusterOperation",
    namespaced,
    status = "ClusterOperationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperationSpec {
    /// Owning Cluster, in the operation's namespace.
    pub cluster: String,

    /// Overrides the cluster's host inventory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosts_conf_ref: Option<ConfigMapRef>,

    /// Overrides the cluster's group variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vars_conf_ref: Option<ConfigMapRef>,

    /// Overrides the cluster's SSH credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh_auth_ref: Option<SecretRef>,

    /// Script every stage command is wrapped in.
    #[serde(rename = "entrypointSHRef", default, skip_serializing_if = "Option::is_none")]
    pub entrypoint_sh_ref: Option<ConfigMapRef>,

    pub action: String,
    pub action_type: ActionType,
    #[serde(default, deserialize_with = "null_as_default")]
    pub action_source: ActionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_source_ref: Option<ConfigMapRef>,
    #[serde(default)]
    pub extra_args: String,

    /// Maximum number of attempts at the whole hook plan.
    #[serde(rename = "BackoffLimit", default)]
    pub backoff_limit: i32,

    pub image: String,

    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub pre_hook: Vec<HookAction>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub post_hook: Vec<HookAction>,

    #[serde(default)]
    pub resource: ResourceRequirements,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deadline_seconds: Option<i64>,
}

impl ClusterOperationSpec {
    /// The primary action in hook shape.
    pub fn primary_action(&self) -> HookAction {
        HookAction {
            action_type: self.action_type,
            action: self.action.clone(),
            action_source: self.action_source,
            action_source_ref: self.action_source_ref.clone(),
            extra_args: self.extra_args.clone(),
        }
    }

    /// Attempts allowed before the operation fails. Never less than one.
    pub fn attempt_limit(&self) -> u32 {
        self.backoff_limit.max(1) as u32
    }
}

crate::builder! {
    pub struct OperationSpecBuilder => ClusterOperationSpec {
        into {
            cluster: String = "demo",
            action: String = "cluster.yml",
            extra_args: String = "",
            image: String = "kubespray:v2.24.1",
        }
        set {
            action_type: ActionType = ActionType::Playbook,
            action_source: ActionSource = ActionSource::Builtin,
            backoff_limit: i32 = 1,
            pre_hook: Vec<HookAction> = Vec::new(),
            post_hook: Vec<HookAction> = Vec::new(),
            resource: ResourceRequirements = ResourceRequirements::default(),
        }
        option {
            hosts_conf_ref: ConfigMapRef = None,
            vars_conf_ref: ConfigMapRef = None,
            ssh_auth_ref: SecretRef = None,
            entrypoint_sh_ref: ConfigMapRef = None,
            action_source_ref: ConfigMapRef = None,
            active_deadline_seconds: i64 = None,
        }
    }
}

/// Lifecycle status of an operation.
///
/// An operation with no status yet is unstarted; on the wire that is an
/// absent or empty `status` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum OpsStatus {
    Running,
    Succeeded,
    Failed,
    Blocked,
}

crate::simple_display! {
    OpsStatus {
        Running => "Running",
        Succeeded => "Succeeded",
        Failed => "Failed",
        Blocked => "Blocked",
    }
}

impl OpsStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation status: {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for OpsStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Running" => Ok(Self::Running),
            "Succeeded" => Ok(Self::Succeeded),
            "Failed" => Ok(Self::Failed),
            "Blocked" => Ok(Self::Blocked),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Explicit `null` reads as the field's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_status_as_none<'de, D>(deserializer: D) -> Result<Option<OpsStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// Controller-owned status of an operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterOperationStatus {
    /// Action most recently executed.
    #[serde(default)]
    pub action: String,

    /// In-flight job, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_ref: Option<JobRef>,

    #[serde(
        default,
        deserialize_with = "empty_status_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub status: Option<OpsStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Spec fingerprint at acceptance. Written once.
    #[serde(default)]
    pub digest: String,

    /// Sticky drift flag.
    #[serde(default)]
    pub has_modified: bool,

    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub stage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_retry_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ClusterOperationStatus {
    pub fn is_terminal(&self) -> bool {
        self.status.is_some_and(OpsStatus::is_terminal)
    }
}

impl ClusterOperation {
    pub fn ops_status(&self) -> Option<OpsStatus> {
        self.status.as_ref().and_then(|s| s.status)
    }

    /// Status as stored, or the unstarted default.
    pub fn current_status(&self) -> ClusterOperationStatus {
        self.status.clone().unwrap_or_default()
    }

    /// Namespace of the operation; empty when unset.
    pub fn namespace_or_default(&self) -> String {
        self.namespace().unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
