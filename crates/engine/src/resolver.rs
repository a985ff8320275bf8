// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reference resolution.
//!
//! Turns the references on a cluster and an operation into namespaced
//! handles, checking that each one exists. Nothing is read beyond existence.

use crate::error::ResolveError;
use ko_adapters::{ArtifactKind, ArtifactStore};
use ko_core::reference::{is_unset, non_empty};
use ko_core::{Cluster, ClusterOperation, ConfigMapRef, DataRef, HookAction, Reference, SecretRef};

/// Every reference a job run needs, with namespaces filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRefs {
    pub namespace: String,
    pub hosts: ConfigMapRef,
    pub vars: ConfigMapRef,
    pub ssh_auth: Option<SecretRef>,
    pub kube_conf: Option<ConfigMapRef>,
    pub pre_check: Option<ConfigMapRef>,
    pub entrypoint: Option<ConfigMapRef>,
}

impl ResolvedRefs {
    /// Script source for a plan stage, if it does not come from the image.
    pub fn action_source(&self, action: &HookAction) -> Option<ConfigMapRef> {
        action.source_ref().map(|r| r.in_namespace(&self.namespace))
    }
}

#[derive(Clone)]
pub struct Resolver<A> {
    artifacts: A,
}

impl<A: ArtifactStore> Resolver<A> {
    pub fn new(artifacts: A) -> Self {
        Self { artifacts }
    }

    /// Resolve one mandatory reference.
    pub async fn resolve<R>(
        &self,
        field: &'static str,
        reference: Option<&R>,
        default_namespace: &str,
    ) -> Result<R, ResolveError>
    where
        R: Reference + From<DataRef>,
    {
        let Some(reference) = reference.filter(|r| !r.data().is_empty()) else {
            return Err(ResolveError::Invalid { field });
        };
        let data = reference.data().in_namespace(default_namespace);
        let Some(kind) = ArtifactKind::from_kind(R::KIND) else {
            return Err(ResolveError::Invalid { field });
        };
        if self.artifacts.exists(kind, &data.namespace, &data.name).await? {
            Ok(R::from(data))
        } else {
            Err(ResolveError::NotFound { field, kind: R::KIND, reference: data.to_string() })
        }
    }

    /// Resolve an optional reference: unset is fine, set must exist.
    pub async fn resolve_optional<R>(
        &self,
        field: &'static str,
        reference: Option<&R>,
        default_namespace: &str,
    ) -> Result<Option<R>, ResolveError>
    where
        R: Reference + From<DataRef>,
    {
        if is_unset(reference) {
            return Ok(None);
        }
        self.resolve(field, reference, default_namespace).await.map(Some)
    }

    /// Resolve everything an operation needs to run against its cluster.
    ///
    /// Operation-level overrides win over the cluster's references; an
    /// override with an empty name counts as unset. Action
    /// sources of every plan stage that reads its script from a ConfigMap
    /// must exist too.
    pub async fn resolve_all(
        &self,
        cluster: Option<&Cluster>,
        operation: &ClusterOperation,
    ) -> Result<ResolvedRefs, ResolveError> {
        let namespace = operation.namespace_or_default();
        let Some(cluster) = cluster else {
            return Err(ResolveError::NotFound {
                field: "cluster",
                kind: "Cluster",
                reference: DataRef::new(&operation.spec.cluster, &namespace).to_string(),
            });
        };
        let spec = &operation.spec;
        let cluster_spec = &cluster.spec;

        let hosts = self
            .resolve(
                "hostsConfRef",
                non_empty(spec.hosts_conf_ref.as_ref()).or(Some(&cluster_spec.hosts_conf_ref)),
                &namespace,
            )
            .await?;
        let vars = self
            .resolve(
                "varsConfRef",
                non_empty(spec.vars_conf_ref.as_ref()).or(Some(&cluster_spec.vars_conf_ref)),
                &namespace,
            )
            .await?;
        let ssh_auth = self
            .resolve_optional(
                "SSHAuthRef",
                non_empty(spec.ssh_auth_ref.as_ref()).or(cluster_spec.ssh_auth_ref.as_ref()),
                &namespace,
            )
            .await?;
        let kube_conf = self
            .resolve_optional("kubeConfRef", cluster_spec.kube_conf_ref.as_ref(), &namespace)
            .await?;
        let pre_check = self
            .resolve_optional("preCheckRef", cluster_spec.pre_check_ref.as_ref(), &namespace)
            .await?;
        let entrypoint = self
            .resolve_optional("entrypointSHRef", spec.entrypoint_sh_ref.as_ref(), &namespace)
            .await?;

        let primary = spec.primary_action();
        let stages = spec.pre_hook.iter().chain(std::iter::once(&primary)).chain(&spec.post_hook);
        for action in stages {
            if action.action_source == ko_core::ActionSource::Configmap {
                self.resolve::<ConfigMapRef>(
                    "actionSourceRef",
                    action.action_source_ref.as_ref(),
                    &namespace,
                )
                .await?;
            }
        }

        Ok(ResolvedRefs { namespace, hosts, vars, ssh_auth, kube_conf, pre_check, entrypoint })
    }
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod tests;
