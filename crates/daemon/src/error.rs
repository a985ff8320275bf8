// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use ko_engine::RuntimeError;
use kube::runtime::finalizer;
use thiserror::Error;

/// Errors that stop the daemon
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("kubernetes client error: {0}")]
    Client(#[from] kube::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors from one controller reconcile; the object is requeued
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("{0} has no namespace")]
    MissingNamespace(String),
    #[error("finalizer error: {0}")]
    Finalizer(#[source] Box<finalizer::Error<RuntimeError>>),
}
