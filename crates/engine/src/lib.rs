// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ko-engine: reconciliation of cluster operations

mod actuator;
mod config;
mod error;
mod executor;
mod hooks;
mod recorder;
mod resolver;
mod runtime;
mod state_machine;

pub use actuator::{build_request, job_name, observe, JobActuator, JobObservation};
pub use config::ReconcileConfig;
pub use error::{ExecuteError, RecordError, ResolveError, RuntimeError};
pub use executor::{Executed, Executor};
pub use hooks::{ExecutionPlan, PlannedStage, Stage};
pub use recorder::{ConditionRecorder, RecordOutcome};
pub use resolver::{ResolvedRefs, Resolver};
pub use runtime::{ReconcileDeps, ReconcileOutcome, Reconciler};
pub use state_machine::{step, AllowDrift, BlockOnDrift, DriftAction, DriftPolicy, Observation, Transition};
