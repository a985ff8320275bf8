// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration-artifact store. Only existence is checked; content is
//! never read.

use async_trait::async_trait;
use thiserror::Error;

/// Kind of stored configuration artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    ConfigMap,
    Secret,
}

ko_core::simple_display! {
    ArtifactKind {
        ConfigMap => "ConfigMap",
        Secret => "Secret",
    }
}

impl ArtifactKind {
    /// Map a reference kind name onto an artifact kind.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "ConfigMap" => Some(Self::ConfigMap),
            "Secret" => Some(Self::Secret),
            _ => None,
        }
    }
}

/// Errors from artifact lookups
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("lookup of {kind} {namespace}/{name} failed: {message}")]
    Lookup { kind: ArtifactKind, namespace: String, name: String, message: String },
}

/// Adapter for checking configuration artifacts
#[async_trait]
pub trait ArtifactStore: Clone + Send + Sync + 'static {
    /// Whether the artifact exists.
    async fn exists(
        &self,
        kind: ArtifactKind,
        namespace: &str,
        name: &str,
    ) -> Result<bool, ArtifactError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ArtifactError, ArtifactKind, ArtifactStore};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeArtifactState {
        present: HashSet<(ArtifactKind, String, String)>,
        failing: bool,
        lookups: usize,
    }

    /// In-memory artifact store for testing
    #[derive(Clone, Default)]
    pub struct FakeArtifactStore {
        inner: Arc<Mutex<FakeArtifactState>>,
    }

    impl FakeArtifactStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, kind: ArtifactKind, namespace: &str, name: &str) {
            self.inner.lock().present.insert((kind, namespace.to_string(), name.to_string()));
        }

        pub fn remove(&self, kind: ArtifactKind, namespace: &str, name: &str) {
            self.inner.lock().present.remove(&(kind, namespace.to_string(), name.to_string()));
        }

        /// Make every lookup fail with a substrate error
        pub fn set_failing(&self, failing: bool) {
            self.inner.lock().failing = failing;
        }

        pub fn lookups(&self) -> usize {
            self.inner.lock().lookups
        }
    }

    #[async_trait]
    impl ArtifactStore for FakeArtifactStore {
        async fn exists(
            &self,
            kind: ArtifactKind,
            namespace: &str,
            name: &str,
        ) -> Result<bool, ArtifactError> {
            let mut state = self.inner.lock();
            state.lookups += 1;
            if state.failing {
                return Err(ArtifactError::Lookup {
                    kind,
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                    message: "injected failure".to_string(),
                });
            }
            Ok(state.present.contains(&(kind, namespace.to_string(), name.to_string())))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeArtifactStore;
