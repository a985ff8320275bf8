// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kod: cluster operation controller
//!
//! Watches `ClusterOperation` resources and the Jobs they own, and drives
//! each operation through its hook stages. `kod crds` prints the custom
//! resource definitions instead of running.

mod controller;
mod env;
mod error;
mod logging;

use error::DaemonError;
use ko_core::{Cluster, ClusterOperation};
use kube::{Client, CustomResourceExt};

#[tokio::main]
async fn main() -> Result<(), DaemonError> {
    if std::env::args().nth(1).as_deref() == Some("crds") {
        return print_crds();
    }

    let _log_guard = logging::init();
    let settings = env::settings();

    let client = Client::try_default().await?;
    tracing::info!(
        namespace = settings.namespace.as_deref().unwrap_or("*"),
        block_on_drift = settings.block_on_drift,
        "starting cluster operation controller"
    );

    controller::run(client, settings).await;
    tracing::info!("controller stopped");
    Ok(())
}

fn print_crds() -> Result<(), DaemonError> {
    for crd in [Cluster::crd(), ClusterOperation::crd()] {
        println!("{}", serde_json::to_string_pretty(&crd)?);
    }
    Ok(())
}
