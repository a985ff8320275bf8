// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Substrate adapters for the cluster operation controller

pub mod artifact;
pub mod job;
pub mod k8s;
pub mod store;

pub use artifact::{ArtifactError, ArtifactKind, ArtifactStore};
pub use job::{JobAdapter, JobAdapterError};
pub use k8s::{KubeArtifactStore, KubeJobAdapter, KubeResourceStore};
pub use store::{ResourceStore, StoreError};

#[cfg(any(test, feature = "test-support"))]
pub use artifact::FakeArtifactStore;
#[cfg(any(test, feature = "test-support"))]
pub use job::{FakeJobAdapter, JobCall};
#[cfg(any(test, feature = "test-support"))]
pub use store::FakeResourceStore;
