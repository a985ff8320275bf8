// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ko-core: resource model and shared types for the cluster operation controller

pub mod macros;

pub mod clock;
pub mod cluster;
pub mod condition;
pub mod digest;
pub mod effect;
pub mod job;
pub mod operation;
pub mod reference;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use cluster::{Cluster, ClusterCondition, ClusterConditionType, ClusterSpec, ClusterStatus};
pub use condition::{ConditionIndex, ConditionLog, ConditionOutcome};
pub use digest::{digest, DigestError, SpecDigest};
pub use effect::Effect;
pub use job::{
    ArtifactMount, FailureReason, JobOwner, JobRequest, JobRunState, MountSource, OPERATION_LABEL,
};
#[cfg(any(test, feature = "test-support"))]
pub use operation::OperationSpecBuilder;
pub use operation::{
    ActionSource, ActionType, ClusterOperation, ClusterOperationSpec, ClusterOperationStatus,
    HookAction, OpsStatus, ResourceRequirements,
};
pub use reference::{ConfigMapRef, DataRef, JobRef, PodRef, Reference, SecretRef};
