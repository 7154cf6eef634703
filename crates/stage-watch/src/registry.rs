//! Registry of pipeline stages currently believed to be failing.
//!
//! Shared by every concurrent evaluation. Backed by a sharded `DashMap`, so
//! insert-if-absent and remove-if-present are atomic per key without any
//! cross-key lock. State lives for the process lifetime only.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;

use crate::event::PipelineStageKey;

/// Known-failing pipeline stages, keyed by pipeline and stage name.
#[derive(Debug, Default)]
pub struct FailureRegistry {
    /// Failing keys and the time the failure was first recorded
    failing: DashMap<PipelineStageKey, DateTime<Utc>>,
}

/// Snapshot entry for a failing stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailingStage {
    pub pipeline: String,
    pub stage: String,
    pub since: DateTime<Utc>,
}

impl FailureRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as failing.
    ///
    /// Returns `true` only for the caller that actually inserted the key.
    pub fn mark_failing(&self, key: PipelineStageKey) -> bool {
        match self.failing.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                true
            }
        }
    }

    /// Forget `key` if it was failing.
    ///
    /// Returns when the failure was first recorded, only for the caller that
    /// actually removed it.
    pub fn clear(&self, key: &PipelineStageKey) -> Option<DateTime<Utc>> {
        self.failing.remove(key).map(|(_, since)| since)
    }

    #[must_use]
    pub fn contains(&self, key: &PipelineStageKey) -> bool {
        self.failing.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failing.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failing.is_empty()
    }

    /// Point-in-time copy of all failing stages, sorted by pipeline then stage.
    #[must_use]
    pub fn snapshot(&self) -> Vec<FailingStage> {
        let mut stages: Vec<FailingStage> = self
            .failing
            .iter()
            .map(|entry| FailingStage {
                pipeline: entry.key().pipeline.clone(),
                stage: entry.key().stage.clone(),
                since: *entry.value(),
            })
            .collect();

        stages.sort_by(|a, b| (&a.pipeline, &a.stage).cmp(&(&b.pipeline, &b.stage)));
        stages
    }
}
