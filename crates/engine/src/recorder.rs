// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster condition recorder.
//!
//! Appends an operation's outcome to the owning cluster's condition history.
//! Appends are read-modify-write against the cluster's resourceVersion, so
//! concurrent recorders for different operations never lose each other's
//! entries: the loser of a race re-reads and appends again.

use crate::error::RecordError;
use ko_adapters::ResourceStore;
use ko_core::{ClusterCondition, ConditionIndex, ConditionOutcome};

/// Result of a record request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Appended(ConditionIndex),
    /// Already recorded; nothing was written.
    Duplicate(ConditionIndex),
    /// The cluster no longer exists; the entry was dropped.
    ClusterMissing,
}

ko_core::simple_display! {
    RecordOutcome {
        Appended(..) => "appended",
        Duplicate(..) => "duplicate",
        ClusterMissing => "cluster-missing",
    }
}

#[derive(Clone)]
pub struct ConditionRecorder<S> {
    store: S,
    max_retries: u32,
}

impl<S: ResourceStore> ConditionRecorder<S> {
    pub fn new(store: S, max_retries: u32) -> Self {
        Self { store, max_retries }
    }

    /// Append `condition` to the history of `cluster` unless an entry with
    /// the same outcome is already there.
    pub async fn record(
        &self,
        namespace: &str,
        cluster: &str,
        condition: ClusterCondition,
    ) -> Result<RecordOutcome, RecordError> {
        let mut conflicts = 0;
        loop {
            let Some(mut target) = self.store.get_cluster(namespace, cluster).await? else {
                tracing::warn!(
                    namespace,
                    cluster,
                    operation = %condition.cluster_ops,
                    "cluster missing, condition not recorded"
                );
                return Ok(RecordOutcome::ClusterMissing);
            };

            let log = &mut target.status.get_or_insert_with(Default::default).conditions;
            let index = match log.record(condition.clone()) {
                ConditionOutcome::Duplicate(index) => return Ok(RecordOutcome::Duplicate(index)),
                ConditionOutcome::Appended(index) => index,
            };

            match self.store.update_cluster_status(&target).await {
                Ok(_) => return Ok(RecordOutcome::Appended(index)),
                Err(e) if e.is_conflict() && conflicts < self.max_retries => {
                    conflicts += 1;
                    tracing::debug!(cluster, conflicts, "cluster status conflict, re-reading");
                }
                Err(e) if e.is_conflict() => {
                    return Err(RecordError::Contended {
                        cluster: cluster.to_string(),
                        attempts: conflicts + 1,
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
#[path = "recorder_tests.rs"]
mod tests;
