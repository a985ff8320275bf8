// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hook sequencing.
//!
//! An operation runs as an ordered plan: every pre-hook in declared order,
//! the primary action, then every post-hook in declared order. Each stage is
//! its own job. The state machine only moves to stage `k + 1` after stage `k`
//! succeeded, so a failure anywhere leaves the rest of the plan unexecuted.

use ko_core::{ClusterOperationSpec, HookAction};
use std::fmt;

/// Position of a stage within the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Pre(usize),
    Primary,
    Post(usize),
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Pre(i) => write!(f, "pre-hook[{}]", i),
            Stage::Primary => f.write_str("primary"),
            Stage::Post(i) => write!(f, "post-hook[{}]", i),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStage {
    pub stage: Stage,
    pub action: HookAction,
}

/// Ordered stages of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    stages: Vec<PlannedStage>,
}

impl ExecutionPlan {
    pub fn plan(spec: &ClusterOperationSpec) -> Self {
        let pre = spec
            .pre_hook
            .iter()
            .enumerate()
            .map(|(i, a)| PlannedStage { stage: Stage::Pre(i), action: a.clone() });
        let primary = PlannedStage { stage: Stage::Primary, action: spec.primary_action() };
        let post = spec
            .post_hook
            .iter()
            .enumerate()
            .map(|(i, a)| PlannedStage { stage: Stage::Post(i), action: a.clone() });
        Self { stages: pre.chain(std::iter::once(primary)).chain(post).collect() }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Never true: a plan always holds the primary action.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn get(&self, index: u32) -> Option<&PlannedStage> {
        self.stages.get(index as usize)
    }

    /// Index of the stage that runs after `index` succeeded, if any.
    pub fn next(&self, index: u32) -> Option<u32> {
        let next = index + 1;
        ((next as usize) < self.stages.len()).then_some(next)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlannedStage> {
        self.stages.iter()
    }
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
