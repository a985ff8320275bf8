// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effects represent side effects a reconcile step asks the runtime to perform

use crate::cluster::ClusterCondition;
use crate::job::JobRequest;
use crate::reference::JobRef;
use serde::{Deserialize, Serialize};

/// Effects that need to be executed by the runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Submit one plan stage as a job run
    SubmitJob { request: JobRequest },

    /// Cancel an in-flight job run (best effort)
    CancelJob { job: JobRef, reason: String },

    /// Append an entry to the owning cluster's condition history
    RecordCondition { namespace: String, cluster: String, condition: ClusterCondition },
}

impl Effect {
    /// Effect name for log spans (e.g., "submit_job")
    pub fn name(&self) -> &'static str {
        match self {
            Effect::SubmitJob { .. } => "submit_job",
            Effect::CancelJob { .. } => "cancel_job",
            Effect::RecordCondition { .. } => "record_condition",
        }
    }

    /// Key-value pairs for structured logging
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        match self {
            Effect::SubmitJob { request } => vec![
                ("job", request.name.clone()),
                ("namespace", request.namespace.clone()),
                ("image", request.image.clone()),
            ],
            Effect::CancelJob { job, reason } => {
                vec![("job", job.data().to_string()), ("reason", reason.clone())]
            }
            Effect::RecordCondition { namespace, cluster, condition } => vec![
                ("cluster", format!("{}/{}", namespace, cluster)),
                ("operation", condition.cluster_ops.clone()),
                ("condition", condition.cluster_condition_type.to_string()),
            ],
        }
    }

    /// Whether to show both 'started' and 'completed' or just 'executed'.
    pub fn verbose(&self) -> bool {
        match self {
            Effect::RecordCondition { .. } => false,
            // Job effects touch the execution substrate
            _ => true,
        }
    }

    /// Effects that must only run once the status write that requested them
    /// has been accepted.
    pub fn after_status_write(&self) -> bool {
        matches!(self, Effect::RecordCondition { .. })
    }
}

#[cfg(test)]
#[path = "effect_tests.rs"]
mod tests;
