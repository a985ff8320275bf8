// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource storage substrate: reads and optimistic-concurrency status writes.

use async_trait::async_trait;
use ko_core::{Cluster, ClusterOperation};
use thiserror::Error;

/// Errors from resource store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The object changed since it was read. Retry from a fresh read.
    #[error("conflicting update to {kind} {name}")]
    Conflict { kind: &'static str, name: String },
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },
    #[error("{kind} {name} has no resourceVersion")]
    MissingVersion { kind: &'static str, name: String },
    #[error("api error: {0}")]
    Api(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict { .. })
    }
}

/// Adapter for reading resources and writing their status.
///
/// Status writes carry the `resourceVersion` of the object they were derived
/// from; a write against a stale version fails with [`StoreError::Conflict`]
/// instead of overwriting.
#[async_trait]
pub trait ResourceStore: Clone + Send + Sync + 'static {
    async fn get_operation(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<ClusterOperation>, StoreError>;

    /// Write `operation.status`, guarded by `operation.metadata.resourceVersion`.
    async fn update_operation_status(
        &self,
        operation: &ClusterOperation,
    ) -> Result<ClusterOperation, StoreError>;

    async fn get_cluster(&self, namespace: &str, name: &str)
        -> Result<Option<Cluster>, StoreError>;

    /// Write `cluster.status`, guarded by `cluster.metadata.resourceVersion`.
    async fn update_cluster_status(&self, cluster: &Cluster) -> Result<Cluster, StoreError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ResourceStore, StoreError};
    use async_trait::async_trait;
    use ko_core::{Cluster, ClusterOperation, ClusterOperationSpec};
    use kube::ResourceExt;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    type Key = (String, String);

    #[derive(Default)]
    struct FakeStoreState {
        operations: HashMap<Key, ClusterOperation>,
        clusters: HashMap<Key, Cluster>,
        next_version: u64,
        operation_conflicts: usize,
        cluster_conflicts: usize,
        operation_writes: usize,
        cluster_writes: usize,
    }

    impl FakeStoreState {
        fn bump(&mut self) -> String {
            self.next_version += 1;
            self.next_version.to_string()
        }
    }

    fn key<K: ResourceExt>(obj: &K) -> Key {
        (obj.namespace().unwrap_or_default(), obj.name_any())
    }

    /// In-memory resource store with API-server-like resourceVersion checks
    #[derive(Clone, Default)]
    pub struct FakeResourceStore {
        inner: Arc<Mutex<FakeStoreState>>,
    }

    impl FakeResourceStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create or overwrite an operation, assigning a new resourceVersion
        pub fn put_operation(&self, mut operation: ClusterOperation) {
            let mut state = self.inner.lock();
            operation.metadata.resource_version = Some(state.bump());
            state.operations.insert(key(&operation), operation);
        }

        pub fn put_cluster(&self, mut cluster: Cluster) {
            let mut state = self.inner.lock();
            cluster.metadata.resource_version = Some(state.bump());
            state.clusters.insert(key(&cluster), cluster);
        }

        pub fn remove_cluster(&self, namespace: &str, name: &str) {
            self.inner.lock().clusters.remove(&(namespace.to_string(), name.to_string()));
        }

        /// Apply a user edit to an operation's spec
        pub fn edit_operation_spec(
            &self,
            namespace: &str,
            name: &str,
            edit: impl FnOnce(&mut ClusterOperationSpec),
        ) {
            let mut state = self.inner.lock();
            let version = state.bump();
            if let Some(op) = state.operations.get_mut(&(namespace.to_string(), name.to_string()))
            {
                edit(&mut op.spec);
                op.metadata.resource_version = Some(version);
            }
        }

        pub fn operation(&self, namespace: &str, name: &str) -> Option<ClusterOperation> {
            self.inner.lock().operations.get(&(namespace.to_string(), name.to_string())).cloned()
        }

        pub fn cluster(&self, namespace: &str, name: &str) -> Option<Cluster> {
            self.inner.lock().clusters.get(&(namespace.to_string(), name.to_string())).cloned()
        }

        /// Fail the next `n` operation status writes with a conflict, as if
        /// another writer got there first
        pub fn inject_operation_conflicts(&self, n: usize) {
            self.inner.lock().operation_conflicts = n;
        }

        pub fn inject_cluster_conflicts(&self, n: usize) {
            self.inner.lock().cluster_conflicts = n;
        }

        /// Number of accepted operation status writes
        pub fn operation_writes(&self) -> usize {
            self.inner.lock().operation_writes
        }

        pub fn cluster_writes(&self) -> usize {
            self.inner.lock().cluster_writes
        }
    }

    #[async_trait]
    impl ResourceStore for FakeResourceStore {
        async fn get_operation(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<Option<ClusterOperation>, StoreError> {
            Ok(self.operation(namespace, name))
        }

        async fn update_operation_status(
            &self,
            operation: &ClusterOperation,
        ) -> Result<ClusterOperation, StoreError> {
            let mut state = self.inner.lock();
            let name = operation.name_any();
            let conflict = || StoreError::Conflict { kind: "ClusterOperation", name: name.clone() };
            if state.operation_conflicts > 0 {
                state.operation_conflicts -= 1;
                // Someone else wrote in between
                let version = state.bump();
                if let Some(stored) = state.operations.get_mut(&key(operation)) {
                    stored.metadata.resource_version = Some(version);
                }
                return Err(conflict());
            }
            let version = state.bump();
            let Some(stored) = state.operations.get_mut(&key(operation)) else {
                return Err(StoreError::NotFound { kind: "ClusterOperation", name: name.clone() });
            };
            if stored.metadata.resource_version != operation.metadata.resource_version {
                return Err(conflict());
            }
            stored.status = operation.status.clone();
            stored.metadata.resource_version = Some(version);
            let updated = stored.clone();
            state.operation_writes += 1;
            Ok(updated)
        }

        async fn get_cluster(
            &self,
            namespace: &str,
            name: &str,
        ) -> Result<Option<Cluster>, StoreError> {
            Ok(self.cluster(namespace, name))
        }

        async fn update_cluster_status(&self, cluster: &Cluster) -> Result<Cluster, StoreError> {
            let mut state = self.inner.lock();
            let name = cluster.name_any();
            if state.cluster_conflicts > 0 {
                state.cluster_conflicts -= 1;
                let version = state.bump();
                if let Some(stored) = state.clusters.get_mut(&key(cluster)) {
                    stored.metadata.resource_version = Some(version);
                }
                return Err(StoreError::Conflict { kind: "Cluster", name });
            }
            let version = state.bump();
            let Some(stored) = state.clusters.get_mut(&key(cluster)) else {
                return Err(StoreError::NotFound { kind: "Cluster", name });
            };
            if stored.metadata.resource_version != cluster.metadata.resource_version {
                return Err(StoreError::Conflict { kind: "Cluster", name });
            }
            stored.status = cluster.status.clone();
            stored.metadata.resource_version = Some(version);
            let updated = stored.clone();
            state.cluster_writes += 1;
            Ok(updated)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResourceStore;

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
