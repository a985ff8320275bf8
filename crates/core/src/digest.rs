// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spec fingerprinting for drift detection.
//!
//! The fingerprint covers every field that decides what a job will execute.
//! `BackoffLimit` and all status fields are left out. The projection goes
//! through `serde_json::Value`, whose maps are ordered, so the key order of
//! the stored document never changes the result. Hook order does.

use crate::operation::{ActionSource, ActionType, ClusterOperationSpec, HookAction, ResourceRequirements};
use crate::reference::{ConfigMapRef, SecretRef};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;

/// Hex SHA-256 of an operation spec's executable fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpecDigest(String);

impl SpecDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// True when this fingerprint equals a stored one.
    pub fn matches(&self, stored: &str) -> bool {
        self.0 == stored
    }
}

impl fmt::Display for SpecDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("failed to serialize spec for digest: {0}")]
pub struct DigestError(#[from] serde_json::Error);

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Executable<'a> {
    cluster: &'a str,
    action: &'a str,
    action_type: ActionType,
    action_source: ActionSource,
    action_source_ref: Option<&'a ConfigMapRef>,
    extra_args: &'a str,
    image: &'a str,
    pre_hook: &'a [HookAction],
    post_hook: &'a [HookAction],
    resource: &'a ResourceRequirements,
    active_deadline_seconds: Option<i64>,
    hosts_conf_ref: Option<&'a ConfigMapRef>,
    vars_conf_ref: Option<&'a ConfigMapRef>,
    ssh_auth_ref: Option<&'a SecretRef>,
    entrypoint_sh_ref: Option<&'a ConfigMapRef>,
}

impl<'a> From<&'a ClusterOperationSpec> for Executable<'a> {
    fn from(spec: &'a ClusterOperationSpec) -> Self {
        Self {
            cluster: &spec.cluster,
            action: &spec.action,
            action_type: spec.action_type,
            action_source: spec.action_source,
            action_source_ref: spec.action_source_ref.as_ref(),
            extra_args: &spec.extra_args,
            image: &spec.image,
            pre_hook: &spec.pre_hook,
            post_hook: &spec.post_hook,
            resource: &spec.resource,
            active_deadline_seconds: spec.active_deadline_seconds,
            hosts_conf_ref: spec.hosts_conf_ref.as_ref(),
            vars_conf_ref: spec.vars_conf_ref.as_ref(),
            ssh_auth_ref: spec.ssh_auth_ref.as_ref(),
            entrypoint_sh_ref: spec.entrypoint_sh_ref.as_ref(),
        }
    }
}

/// Compute the fingerprint of a spec.
pub fn digest(spec: &ClusterOperationSpec) -> Result<SpecDigest, DigestError> {
    let projected = serde_json::to_value(Executable::from(spec))?;
    let canonical = serde_json::to_string(&projected)?;
    Ok(SpecDigest(format!("{:x}", Sha256::digest(canonical.as_bytes()))))
}

#[cfg(test)]
#[path = "digest_tests.rs"]
mod tests;
