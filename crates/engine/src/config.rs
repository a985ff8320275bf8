// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile tuning

use std::time::Duration;

/// Timing and retry knobs for the reconcile loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Re-check interval while a job is in flight
    pub poll_interval: Duration,
    /// Delay before the second attempt
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
    pub backoff_multiplier: u32,
    /// Fresh-read passes allowed after a status write conflict
    pub conflict_retries: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            backoff_initial: Duration::from_secs(10),
            backoff_max: Duration::from_secs(300),
            backoff_multiplier: 2,
            conflict_retries: 5,
        }
    }
}

impl ReconcileConfig {
    ko_core::setters! {
        set {
            poll_interval: Duration,
            backoff_initial: Duration,
            backoff_max: Duration,
            backoff_multiplier: u32,
            conflict_retries: u32,
        }
    }

    /// Delay after the given number of failed attempts.
    ///
    /// `initial * multiplier^(failed - 1)`, capped at `backoff_max`.
    pub fn backoff(&self, failed_attempts: u32) -> Duration {
        let exponent = failed_attempts.saturating_sub(1);
        let factor = self.backoff_multiplier.max(1).saturating_pow(exponent);
        self.backoff_initial.saturating_mul(factor).min(self.backoff_max)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
