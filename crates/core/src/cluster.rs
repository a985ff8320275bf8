// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster resource: one provisioned target environment.

use crate::condition::ConditionLog;
use crate::operation::OpsStatus;
use crate::reference::{ConfigMapRef, SecretRef};
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Host inventory, variables and credentials every operation against this
/// cluster runs with.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "kubeop.io",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Host inventory. Mandatory.
    #[serde(default)]
    pub hosts_conf_ref: ConfigMapRef,

    /// Group variables. Mandatory.
    #[serde(default)]
    pub vars_conf_ref: ConfigMapRef,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kube_conf_ref: Option<ConfigMapRef>,

    #[serde(rename = "SSHAuthRef", default, skip_serializing_if = "Option::is_none")]
    pub ssh_auth_ref: Option<SecretRef>,

    /// Pre-flight check scripts run before the primary command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_check_ref: Option<ConfigMapRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    #[serde(default)]
    pub conditions: ConditionLog,
}

/// Outcome recorded for one operation in the cluster's history.
///
/// Variants mirror the operation status they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub enum ClusterConditionType {
    Running,
    Succeeded,
    Failed,
    Blocked,
}

crate::simple_display! {
    ClusterConditionType {
        Running => "Running",
        Succeeded => "Succeeded",
        Failed => "Failed",
        Blocked => "Blocked",
    }
}

impl From<OpsStatus> for ClusterConditionType {
    fn from(status: OpsStatus) -> Self {
        match status {
            OpsStatus::Running => Self::Running,
            OpsStatus::Succeeded => Self::Succeeded,
            OpsStatus::Failed => Self::Failed,
            OpsStatus::Blocked => Self::Blocked,
        }
    }
}

/// One entry of the cluster's condition history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterCondition {
    /// Name of the operation this entry records.
    pub cluster_ops: String,
    pub cluster_condition_type: ClusterConditionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
}

impl ClusterCondition {
    /// True when both entries describe the same operation outcome.
    ///
    /// End time is ignored so a record retried after a clock tick is
    /// still recognised as a repeat.
    pub fn same_outcome(&self, other: &ClusterCondition) -> bool {
        self.cluster_ops == other.cluster_ops
            && self.cluster_condition_type == other.cluster_condition_type
            && self.start_time == other.start_time
    }
}

impl Cluster {
    pub fn conditions(&self) -> Option<&ConditionLog> {
        self.status.as_ref().map(|s| &s.conditions)
    }
}

#[cfg(test)]
#[path = "cluster_tests.rs"]
mod tests;
