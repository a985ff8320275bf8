// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status merge patches.
//!
//! A merge patch leaves absent keys untouched, so cleared optional fields
//! are written as explicit nulls. The patch also carries the
//! `resourceVersion` the status was derived from; the API server rejects it
//! with 409 when the object has moved on.

use ko_core::ClusterOperationStatus;
use serde_json::{json, Map, Value};

/// Optional status keys that must be nulled out when unset.
const CLEARABLE: &[&str] =
    &["jobRef", "status", "startTime", "endTime", "nextRetryTime", "message"];

/// Wrap a status value in a version-guarded merge patch.
pub fn guarded_patch(resource_version: &str, status: Value) -> Value {
    json!({
        "metadata": { "resourceVersion": resource_version },
        "status": status,
    })
}

/// Serialize an operation status for a merge patch.
pub fn operation_status_value(
    status: Option<&ClusterOperationStatus>,
) -> Result<Value, serde_json::Error> {
    let Some(status) = status else {
        return Ok(Value::Null);
    };
    let mut value = serde_json::to_value(status)?;
    if let Value::Object(map) = &mut value {
        null_missing(map);
    }
    Ok(value)
}

fn null_missing(map: &mut Map<String, Value>) {
    for key in CLEARABLE {
        map.entry(key.to_string()).or_insert(Value::Null);
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
