// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for resource types.
pub mod strategies {
    use crate::operation::{ActionSource, ActionType, ClusterOperationSpec, HookAction, OpsStatus};
    use crate::reference::ConfigMapRef;
    use proptest::prelude::*;

    pub fn arb_ops_status() -> impl Strategy<Value = OpsStatus> {
        prop_oneof![
            Just(OpsStatus::Running),
            Just(OpsStatus::Succeeded),
            Just(OpsStatus::Failed),
            Just(OpsStatus::Blocked),
        ]
    }

    pub fn arb_action_type() -> impl Strategy<Value = ActionType> {
        prop_oneof![Just(ActionType::Playbook), Just(ActionType::Shell)]
    }

    pub fn arb_hook_action() -> impl Strategy<Value = HookAction> {
        (arb_action_type(), "[a-z]{1,8}\\.(yml|sh)", "[a-z =-]{0,12}", any::<bool>()).prop_map(
            |(action_type, action, extra_args, from_map)| {
                let hook = HookAction::new(action_type, action).extra_args(extra_args);
                if from_map {
                    hook.action_source(ActionSource::Configmap)
                        .action_source_ref(ConfigMapRef::new("scripts", ""))
                } else {
                    hook
                }
            },
        )
    }

    pub fn arb_operation_spec() -> impl Strategy<Value = ClusterOperationSpec> {
        (
            "[a-z]{1,8}",
            arb_hook_action(),
            proptest::collection::vec(arb_hook_action(), 0..3),
            proptest::collection::vec(arb_hook_action(), 0..3),
            0i32..5,
            proptest::option::of(1i64..3600),
        )
            .prop_map(|(cluster, primary, pre_hook, post_hook, backoff_limit, deadline)| {
                ClusterOperationSpec {
                    cluster,
                    action: primary.action,
                    action_type: primary.action_type,
                    action_source: primary.action_source,
                    action_source_ref: primary.action_source_ref,
                    extra_args: primary.extra_args,
                    image: "kubespray:latest".to_string(),
                    pre_hook,
                    post_hook,
                    backoff_limit,
                    active_deadline_seconds: deadline,
                    ..ClusterOperationSpec::default()
                }
            })
    }
}

// ── Resource fixtures ───────────────────────────────────────────────────

/// Ready-made resources for tests.
pub mod fixtures {
    use crate::cluster::{Cluster, ClusterSpec};
    use crate::job::{ArtifactMount, JobRequest};
    use crate::operation::{ClusterOperation, ClusterOperationSpec, ResourceRequirements};
    use crate::reference::{ConfigMapRef, SecretRef};
    use std::collections::BTreeMap;

    pub const NAMESPACE: &str = "kubeop-system";

    /// Cluster with hosts, vars and SSH references set.
    pub fn cluster(name: &str) -> Cluster {
        let mut cluster = Cluster::new(
            name,
            ClusterSpec {
                hosts_conf_ref: ConfigMapRef::new(format!("{}-hosts", name), ""),
                vars_conf_ref: ConfigMapRef::new(format!("{}-vars", name), ""),
                ssh_auth_ref: Some(SecretRef::new(format!("{}-ssh", name), "")),
                ..ClusterSpec::default()
            },
        );
        cluster.metadata.namespace = Some(NAMESPACE.to_string());
        cluster
    }

    /// Names of the artifacts [`cluster`] references.
    pub fn cluster_artifacts(name: &str) -> Vec<(&'static str, String)> {
        vec![
            ("ConfigMap", format!("{}-hosts", name)),
            ("ConfigMap", format!("{}-vars", name)),
            ("Secret", format!("{}-ssh", name)),
        ]
    }

    pub fn operation(name: &str, spec: ClusterOperationSpec) -> ClusterOperation {
        let mut op = ClusterOperation::new(name, spec);
        op.metadata.namespace = Some(NAMESPACE.to_string());
        op.metadata.uid = Some(format!("uid-{}", name));
        op
    }

    pub fn job_request(name: &str) -> JobRequest {
        JobRequest {
            name: name.to_string(),
            namespace: NAMESPACE.to_string(),
            image: "kubespray:latest".to_string(),
            command: vec!["/bin/bash".into(), "-c".into(), "true".into()],
            mounts: vec![ArtifactMount::config_map(
                "hosts-conf",
                &ConfigMapRef::new("demo-hosts", NAMESPACE),
                "/conf/hosts",
            )],
            resources: ResourceRequirements::default(),
            active_deadline_seconds: None,
            labels: BTreeMap::new(),
            owner: None,
        }
    }
}
