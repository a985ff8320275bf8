// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::env;

/// Install the global subscriber.
///
/// With `KO_LOG_DIR` set, logs roll daily into `kod.log.<date>` under that
/// directory and the returned guard must be held until exit to flush them.
pub fn init() -> Option<WorkerGuard> {
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));

    match env::log_dir() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "kod.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}
