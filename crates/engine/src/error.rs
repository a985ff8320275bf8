// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine error types

use ko_adapters::{ArtifactError, JobAdapterError, StoreError};
use ko_core::DigestError;
use thiserror::Error;

/// Reference resolution failures.
///
/// `Invalid` and `NotFound` are configuration problems and block the
/// operation. `Store` is a substrate fault and is retried.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{field} is not set")]
    Invalid { field: &'static str },
    #[error("{kind} {reference} referenced by {field} not found")]
    NotFound { field: &'static str, kind: &'static str, reference: String },
    #[error(transparent)]
    Store(#[from] ArtifactError),
}

impl ResolveError {
    /// True for configuration problems that should block the operation.
    pub fn is_blocking(&self) -> bool {
        !matches!(self, ResolveError::Store(_))
    }
}

/// Errors from appending to a cluster's condition history
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("gave up recording on cluster {cluster} after {attempts} conflicting writes")]
    Contended { cluster: String, attempts: u32 },
}

/// Errors that can occur during effect execution
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("job error: {0}")]
    Job(#[from] JobAdapterError),
    #[error("condition error: {0}")]
    Record(#[from] RecordError),
}

/// Faults that escape a reconcile pass. The operation keeps its last
/// written status and the pass is retried.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("resolve error: {0}")]
    Resolve(#[from] ResolveError),
    #[error("job error: {0}")]
    Job(#[from] JobAdapterError),
    #[error("execute error: {0}")]
    Execute(#[from] ExecuteError),
    #[error("digest error: {0}")]
    Digest(#[from] DigestError),
    #[error("status of {name} still conflicting after {attempts} passes")]
    ConflictRetriesExhausted { name: String, attempts: u32 },
}
