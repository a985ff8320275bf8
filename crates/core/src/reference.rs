// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed references to externally stored artifacts.
//!
//! All four reference kinds share the `{name, namespace}` wire shape of
//! [`DataRef`], but each is a distinct type so a pod reference can never be
//! handed to something that expects a job reference.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(name, namespace)` pointer to an externally stored artifact.
///
/// Empty iff the name is unset. An empty namespace means "the namespace of
/// whatever holds this reference"; see [`DataRef::in_namespace`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct DataRef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

impl DataRef {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self { name: name.into(), namespace: namespace.into() }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    pub fn in_namespace(&self, default_namespace: &str) -> Self {
        let namespace = if self.namespace.is_empty() {
            default_namespace.to_string()
        } else {
            self.namespace.clone()
        };
        Self { name: self.name.clone(), namespace }
    }
}

impl fmt::Display for DataRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// Common surface of the typed reference wrappers.
pub trait Reference {
    /// Kubernetes kind the reference points at.
    const KIND: &'static str;

    fn data(&self) -> &DataRef;
}

/// True when an optional reference is absent or has no name.
pub fn is_unset<R: Reference>(reference: Option<&R>) -> bool {
    reference.is_none_or(|r| r.data().is_empty())
}

/// The reference, or `None` when it is unset.
pub fn non_empty<R: Reference>(reference: Option<&R>) -> Option<&R> {
    reference.filter(|r| !r.data().is_empty())
}

crate::define_ref! {
    /// Reference to a ConfigMap (inventories, variables, scripts).
    pub struct ConfigMapRef("ConfigMap");
}

crate::define_ref! {
    /// Reference to a Secret (credentials).
    pub struct SecretRef("Secret");
}

crate::define_ref! {
    /// Reference to a Pod, used only for diagnostics on failed jobs.
    pub struct PodRef("Pod");
}

crate::define_ref! {
    /// Reference to one job run on the execution substrate.
    pub struct JobRef("Job");
}

#[cfg(test)]
#[path = "reference_tests.rs"]
mod tests;
