// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only condition history.
//!
//! [`ConditionLog`] exposes no way to remove, reorder or edit an entry once
//! it has been appended. Every entry gets a [`ConditionIndex`] that is fixed
//! for the lifetime of the log.

use crate::cluster::ClusterCondition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Position of an entry in a [`ConditionLog`]. Monotonic in append order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConditionIndex(usize);

impl ConditionIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Result of [`ConditionLog::record`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOutcome {
    Appended(ConditionIndex),
    /// An entry with the same outcome was already present at this index.
    Duplicate(ConditionIndex),
}

crate::simple_display! {
    ConditionOutcome {
        Appended(..) => "appended",
        Duplicate(..) => "duplicate",
    }
}

impl ConditionOutcome {
    pub fn index(self) -> ConditionIndex {
        match self {
            Self::Appended(i) | Self::Duplicate(i) => i,
        }
    }

    pub fn is_appended(self) -> bool {
        matches!(self, Self::Appended(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct ConditionLog {
    entries: Vec<ClusterCondition>,
}

impl ConditionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append unconditionally.
    pub fn append(&mut self, condition: ClusterCondition) -> ConditionIndex {
        self.entries.push(condition);
        ConditionIndex(self.entries.len() - 1)
    }

    /// Append unless an entry with the same outcome is already present.
    pub fn record(&mut self, condition: ClusterCondition) -> ConditionOutcome {
        match self.find(&condition) {
            Some(index) => ConditionOutcome::Duplicate(index),
            None => ConditionOutcome::Appended(self.append(condition)),
        }
    }

    pub fn find(&self, condition: &ClusterCondition) -> Option<ConditionIndex> {
        self.entries.iter().position(|c| c.same_outcome(condition)).map(ConditionIndex)
    }

    pub fn contains(&self, condition: &ClusterCondition) -> bool {
        self.find(condition).is_some()
    }

    pub fn get(&self, index: ConditionIndex) -> Option<&ClusterCondition> {
        self.entries.get(index.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ConditionIndex, &ClusterCondition)> {
        self.entries.iter().enumerate().map(|(i, c)| (ConditionIndex(i), c))
    }

    /// Entries recorded for one operation, oldest first.
    pub fn for_operation<'a>(
        &'a self,
        operation: &'a str,
    ) -> impl Iterator<Item = &'a ClusterCondition> + 'a {
        self.entries.iter().filter(move |c| c.cluster_ops == operation)
    }

    pub fn last(&self) -> Option<&ClusterCondition> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `self` is `earlier` with zero or more entries appended.
    pub fn extends(&self, earlier: &ConditionLog) -> bool {
        self.entries.len() >= earlier.entries.len()
            && self.entries[..earlier.entries.len()] == earlier.entries[..]
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
