// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kubernetes implementations of the substrate adapters.
//!
//! # Module layout
//!
//! - [`job`] — Job object construction and status interpretation
//! - [`status`] — status patch construction with optimistic concurrency

pub mod job;
pub mod status;

use crate::artifact::{ArtifactError, ArtifactKind, ArtifactStore};
use crate::job::{JobAdapter, JobAdapterError};
use crate::store::{ResourceStore, StoreError};
use async_trait::async_trait;
use k8s_openapi::api::batch::v1::Job;
use k8s_openapi::api::core::v1::{ConfigMap, Pod, Secret};
use ko_core::{Cluster, ClusterOperation, JobRef, JobRequest, JobRunState, PodRef};
use kube::api::{Api, DeleteParams, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};

fn is_status(e: &kube::Error, code: u16) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == code)
}

fn store_error(kind: &'static str, name: &str, e: kube::Error) -> StoreError {
    if is_status(&e, 409) {
        StoreError::Conflict { kind, name: name.to_string() }
    } else if is_status(&e, 404) {
        StoreError::NotFound { kind, name: name.to_string() }
    } else {
        StoreError::Api(e.to_string())
    }
}

/// Resource store backed by the Kubernetes API server
#[derive(Clone)]
pub struct KubeResourceStore {
    client: Client,
}

impl KubeResourceStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn patch_status<K>(
        &self,
        kind: &'static str,
        obj: &K,
        status: serde_json::Value,
    ) -> Result<K, StoreError>
    where
        K: kube::Resource<Scope = kube::core::NamespaceResourceScope>
            + Clone
            + std::fmt::Debug
            + serde::de::DeserializeOwned,
        K::DynamicType: Default,
    {
        let name = obj.name_any();
        let namespace = obj.namespace().unwrap_or_default();
        let Some(version) = obj.meta().resource_version.as_deref() else {
            return Err(StoreError::MissingVersion { kind, name });
        };
        let api: Api<K> = Api::namespaced(self.client.clone(), &namespace);
        let patch = status::guarded_patch(version, status);
        api.patch_status(&name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| store_error(kind, &name, e))
    }
}

#[async_trait]
impl ResourceStore for KubeResourceStore {
    async fn get_operation(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterOperation>, StoreError> {
        let api: Api<ClusterOperation> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(|e| store_error("ClusterOperation", name, e))
    }

    async fn update_operation_status(
        &self,
        operation: &ClusterOperation,
    ) -> Result<ClusterOperation, StoreError> {
        let status = status::operation_status_value(operation.status.as_ref())
            .map_err(|e| StoreError::Api(e.to_string()))?;
        self.patch_status("ClusterOperation", operation, status).await
    }

    async fn get_cluster(&self, namespace: &str, name: &str) -> Result<Option<Cluster>, StoreError> {
        let api: Api<Cluster> = Api::namespaced(self.client.clone(), namespace);
        api.get_opt(name).await.map_err(|e| store_error("Cluster", name, e))
    }

    async fn update_cluster_status(&self, cluster: &Cluster) -> Result<Cluster, StoreError> {
        let status =
            serde_json::to_value(&cluster.status).map_err(|e| StoreError::Api(e.to_string()))?;
        self.patch_status("Cluster", cluster, status).await
    }
}

/// Artifact store over ConfigMaps and Secrets
#[derive(Clone)]
pub struct KubeArtifactStore {
    client: Client,
}

impl KubeArtifactStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ArtifactStore for KubeArtifactStore {
    async fn exists(
        &self,
        kind: ArtifactKind,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ArtifactError> {
        let result = match kind {
            ArtifactKind::ConfigMap => {
                let api: Api<ConfigMap> = Api::namespaced(self.client.clone(), namespace);
                api.get_opt(name).await.map(|o| o.is_some())
            }
            ArtifactKind::Secret => {
                // Metadata only; secret content is never fetched
                let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
                api.get_metadata_opt(name).await.map(|o| o.is_some())
            }
        };
        result.map_err(|e| ArtifactError::Lookup {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: e.to_string(),
        })
    }
}

/// Job adapter over batch/v1 Jobs
#[derive(Clone)]
pub struct KubeJobAdapter {
    client: Client,
}

impl KubeJobAdapter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// First pod the job created, for failure diagnostics.
    async fn job_pod(&self, job: &JobRef) -> Option<PodRef> {
        let pods: Api<Pod> = Api::namespaced(self.client.clone(), job.namespace());
        let lp = ListParams::default().labels(&format!("job-name={}", job.name()));
        match pods.list(&lp).await {
            Ok(list) => list.items.first().map(|p| PodRef::new(p.name_any(), job.namespace())),
            Err(e) => {
                tracing::debug!(job = %job.name(), error = %e, "pod lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl JobAdapter for KubeJobAdapter {
    async fn submit(&self, request: &JobRequest) -> Result<JobRef, JobAdapterError> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), &request.namespace);
        let job = job::build_job(request);
        let start = std::time::Instant::now();
        match jobs.create(&PostParams::default(), &job).await {
            Ok(_) => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                tracing::info!(job = %request.name, namespace = %request.namespace, elapsed_ms, "job created");
            }
            Err(e) if is_status(&e, 409) => {
                let existing = jobs
                    .get(&request.name)
                    .await
                    .map_err(|e| JobAdapterError::SubmitFailed(e.to_string()))?;
                let owner_uids: Vec<&str> =
                    existing.owner_references().iter().map(|r| r.uid.as_str()).collect();
                if !request.is_same_operation(&owner_uids, existing.labels()) {
                    tracing::warn!(job = %request.name, "job exists for another operation");
                    return Err(JobAdapterError::SubmitFailed(format!(
                        "job {} belongs to another operation",
                        request.name
                    )));
                }
                tracing::info!(job = %request.name, "job already exists, adopting");
            }
            Err(e) => return Err(JobAdapterError::SubmitFailed(e.to_string())),
        }
        Ok(JobRef::new(&request.name, &request.namespace))
    }

    async fn status(&self, job: &JobRef) -> Result<JobRunState, JobAdapterError> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), job.namespace());
        let found =
            jobs.get_opt(job.name()).await.map_err(|e| JobAdapterError::StatusFailed(e.to_string()))?;
        let Some(found) = found else {
            return Ok(JobRunState::Missing);
        };
        let pod = if job::has_failed(&found) { self.job_pod(job).await } else { None };
        Ok(job::run_state(&found, pod))
    }

    async fn cancel(&self, job: &JobRef) -> Result<(), JobAdapterError> {
        let jobs: Api<Job> = Api::namespaced(self.client.clone(), job.namespace());
        match jobs.delete(job.name(), &DeleteParams::background()).await {
            Ok(_) => {
                tracing::info!(job = %job.name(), "job deleted");
                Ok(())
            }
            Err(e) if is_status(&e, 404) => Ok(()),
            Err(e) => Err(JobAdapterError::CancelFailed(e.to_string())),
        }
    }
}
