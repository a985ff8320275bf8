// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.

use std::path::PathBuf;
use std::time::Duration;

use ko_engine::ReconcileConfig;

use crate::controller::Settings;

pub const DEFAULT_LOG_FILTER: &str = "info,kube=warn";

/// Namespace to watch. Unset or empty watches all namespaces.
pub fn watch_namespace() -> Option<String> {
    std::env::var("KO_WATCH_NAMESPACE").ok().filter(|s| !s.is_empty())
}

fn duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_millis)
}

/// Reconcile timing, overridable per knob
pub fn reconcile_config() -> ReconcileConfig {
    let mut config = ReconcileConfig::default();
    if let Some(d) = duration_ms("KO_POLL_INTERVAL_MS") {
        config = config.poll_interval(d);
    }
    if let Some(d) = duration_ms("KO_BACKOFF_INITIAL_MS") {
        config = config.backoff_initial(d);
    }
    if let Some(d) = duration_ms("KO_BACKOFF_MAX_MS") {
        config = config.backoff_max(d);
    }
    if let Some(n) = std::env::var("KO_CONFLICT_RETRIES").ok().and_then(|s| s.parse::<u32>().ok())
    {
        config = config.conflict_retries(n);
    }
    config
}

/// Requeue delay after a failed reconcile (default 30s)
pub fn error_requeue() -> Duration {
    duration_ms("KO_ERROR_REQUEUE_MS").unwrap_or(Duration::from_secs(30))
}

/// Block running operations whose spec changed after acceptance
pub fn block_on_drift() -> bool {
    matches!(
        std::env::var("KO_BLOCK_ON_DRIFT").as_deref().map(str::to_ascii_lowercase).as_deref(),
        Ok("1" | "true" | "yes")
    )
}

/// Directory for rolling log files. Logs go to stdout when unset.
pub fn log_dir() -> Option<PathBuf> {
    std::env::var("KO_LOG_DIR").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Tracing filter directives: `KO_LOG`, then `RUST_LOG`, then `info,kube=warn`
pub fn log_filter() -> String {
    ["KO_LOG", "RUST_LOG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

pub fn settings() -> Settings {
    Settings {
        namespace: watch_namespace(),
        config: reconcile_config(),
        block_on_drift: block_on_drift(),
        error_requeue: error_requeue(),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
