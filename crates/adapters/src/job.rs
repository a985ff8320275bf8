// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job-execution substrate.

use async_trait::async_trait;
use ko_core::{JobRef, JobRequest, JobRunState};
use thiserror::Error;

/// Errors from job substrate operations
#[derive(Debug, Error)]
pub enum JobAdapterError {
    #[error("submit failed: {0}")]
    SubmitFailed(String),
    #[error("status query failed: {0}")]
    StatusFailed(String),
    #[error("cancel failed: {0}")]
    CancelFailed(String),
}

/// Adapter for running plan stages as jobs
#[async_trait]
pub trait JobAdapter: Clone + Send + Sync + 'static {
    /// Create the job. A job with the same name that already exists is
    /// returned as-is rather than created again, provided it was created for
    /// the same operation; otherwise the submit fails.
    async fn submit(&self, request: &JobRequest) -> Result<JobRef, JobAdapterError>;

    async fn status(&self, job: &JobRef) -> Result<JobRunState, JobAdapterError>;

    /// Delete the job and its pods. Deleting a job that no longer exists
    /// succeeds.
    async fn cancel(&self, job: &JobRef) -> Result<(), JobAdapterError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{JobAdapter, JobAdapterError};
    use async_trait::async_trait;
    use ko_core::{JobRef, JobRequest, JobRunState};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    /// Recorded job call
    #[derive(Debug, Clone, PartialEq)]
    pub enum JobCall {
        Submit { name: String },
        Status { name: String },
        Cancel { name: String },
    }

    struct FakeJobState {
        jobs: HashMap<String, JobRunState>,
        /// Requests behind the jobs that still exist
        live: HashMap<String, JobRequest>,
        created: Vec<JobRequest>,
        cancelled: Vec<JobRef>,
        calls: Vec<JobCall>,
        /// States handed to newly created jobs, in creation order
        scripted: VecDeque<JobRunState>,
        default_state: JobRunState,
        fail_submits: bool,
    }

    /// Fake job substrate for testing
    #[derive(Clone)]
    pub struct FakeJobAdapter {
        inner: Arc<Mutex<FakeJobState>>,
    }

    impl Default for FakeJobAdapter {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeJobState {
                    jobs: HashMap::new(),
                    live: HashMap::new(),
                    created: Vec::new(),
                    cancelled: Vec::new(),
                    calls: Vec::new(),
                    scripted: VecDeque::new(),
                    default_state: JobRunState::Succeeded,
                    fail_submits: false,
                })),
            }
        }
    }

    impl FakeJobAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        /// State for newly created jobs once the script runs out
        pub fn set_default_state(&self, state: JobRunState) {
            self.inner.lock().default_state = state;
        }

        /// Queue states for the next created jobs, one per job
        pub fn script(&self, states: impl IntoIterator<Item = JobRunState>) {
            self.inner.lock().scripted.extend(states);
        }

        /// Change the state of an existing job
        pub fn set_state(&self, name: &str, state: JobRunState) {
            self.inner.lock().jobs.insert(name.to_string(), state);
        }

        /// Drop a job as if it was deleted out of band
        pub fn forget(&self, name: &str) {
            let mut state = self.inner.lock();
            state.jobs.remove(name);
            state.live.remove(name);
        }

        pub fn set_fail_submits(&self, fail: bool) {
            self.inner.lock().fail_submits = fail;
        }

        /// Requests that created a new job
        pub fn created(&self) -> Vec<JobRequest> {
            self.inner.lock().created.clone()
        }

        pub fn created_names(&self) -> Vec<String> {
            self.inner.lock().created.iter().map(|r| r.name.clone()).collect()
        }

        pub fn cancelled(&self) -> Vec<JobRef> {
            self.inner.lock().cancelled.clone()
        }

        pub fn calls(&self) -> Vec<JobCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl JobAdapter for FakeJobAdapter {
        async fn submit(&self, request: &JobRequest) -> Result<JobRef, JobAdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Submit { name: request.name.clone() });
            if state.fail_submits {
                return Err(JobAdapterError::SubmitFailed("injected failure".to_string()));
            }
            if let Some(existing) = state.live.get(&request.name) {
                let owner_uids: Vec<&str> = existing.owner.iter().map(|o| o.uid.as_str()).collect();
                if !request.is_same_operation(&owner_uids, &existing.labels) {
                    return Err(JobAdapterError::SubmitFailed(format!(
                        "job {} belongs to another operation",
                        request.name
                    )));
                }
                return Ok(JobRef::new(&request.name, &request.namespace));
            }
            let initial = match state.scripted.pop_front() {
                Some(s) => s,
                None => state.default_state.clone(),
            };
            state.jobs.insert(request.name.clone(), initial);
            state.live.insert(request.name.clone(), request.clone());
            state.created.push(request.clone());
            Ok(JobRef::new(&request.name, &request.namespace))
        }

        async fn status(&self, job: &JobRef) -> Result<JobRunState, JobAdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Status { name: job.name().to_string() });
            Ok(state.jobs.get(job.name()).cloned().unwrap_or(JobRunState::Missing))
        }

        async fn cancel(&self, job: &JobRef) -> Result<(), JobAdapterError> {
            let mut state = self.inner.lock();
            state.calls.push(JobCall::Cancel { name: job.name().to_string() });
            state.jobs.remove(job.name());
            state.live.remove(job.name());
            state.cancelled.push(job.clone());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobAdapter, JobCall};

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
