// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Effect executor

use crate::actuator::JobActuator;
use crate::error::ExecuteError;
use crate::recorder::{ConditionRecorder, RecordOutcome};
use ko_adapters::{JobAdapter, ResourceStore};
use ko_core::{Effect, JobRef};

/// What running an effect produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Executed {
    /// The job now exists under this reference.
    Submitted(JobRef),
    Cancelled,
    Recorded(RecordOutcome),
}

/// Executes effects against the job substrate and the cluster store
#[derive(Clone)]
pub struct Executor<S, J> {
    actuator: JobActuator<J>,
    recorder: ConditionRecorder<S>,
}

impl<S, J> Executor<S, J>
where
    S: ResourceStore,
    J: JobAdapter,
{
    pub fn new(actuator: JobActuator<J>, recorder: ConditionRecorder<S>) -> Self {
        Self { actuator, recorder }
    }

    /// Execute a single effect with tracing
    pub async fn execute(&self, effect: Effect) -> Result<Executed, ExecuteError> {
        // Format the fields as `key=val`
        let info = {
            let fields = effect.fields();
            let cap = fields.iter().map(|(a, b)| a.len() + b.len() + 2).sum();
            let mut fmt = String::with_capacity(cap);
            for (key, val) in fields {
                fmt.push_str(key);
                fmt.push('=');
                fmt.push_str(&val);
                fmt.push(' ');
            }
            fmt.pop();
            fmt
        };

        let op = effect.name();
        let verbose = effect.verbose();
        if verbose {
            tracing::info!("executing effect={} {}", op, info);
        }

        let start = std::time::Instant::now();
        let result = self.execute_inner(effect).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;
        if verbose {
            match &result {
                Ok(executed) => tracing::info!(?executed, elapsed_ms, "completed"),
                Err(e) => tracing::error!(error = %e, elapsed_ms, "failed"),
            }
        } else {
            match &result {
                Ok(executed) => {
                    tracing::info!(?executed, elapsed_ms, "executed effect={} {}", op, info)
                }
                Err(e) => tracing::error!(error = %e, elapsed_ms, "error effect={} {}", op, info),
            }
        }

        result
    }

    async fn execute_inner(&self, effect: Effect) -> Result<Executed, ExecuteError> {
        match effect {
            Effect::SubmitJob { request } => {
                let job = self.actuator.submit(&request).await?;
                if job.name() != request.name {
                    tracing::warn!(requested = %request.name, adopted = %job.name(), "job name differs");
                }
                Ok(Executed::Submitted(job))
            }

            Effect::CancelJob { job, reason } => {
                tracing::debug!(job = %job.name(), %reason, "cancelling job");
                self.actuator.cancel(&job).await?;
                Ok(Executed::Cancelled)
            }

            Effect::RecordCondition { namespace, cluster, condition } => {
                let outcome = self.recorder.record(&namespace, &cluster, condition).await?;
                Ok(Executed::Recorded(outcome))
            }
        }
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
