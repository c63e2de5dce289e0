//! Research call lifecycle: stages and observers.
//!
//! A call moves forward through the stages in declaration order and never
//! goes back. Any fatal error moves it straight to [`ResearchStage::Failed`].

use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Stage of a research call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchStage {
    Started,
    Searched,
    /// Content extracted and each source analyzed.
    Analyzed,
    /// Only reached when verification is enabled.
    Verified,
    Synthesized,
    /// Cache written and result file persisted (both best-effort).
    Persisted,
    Completed,
    Failed,
}

impl ResearchStage {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: ResearchStage) -> bool {
        match (self, next) {
            (ResearchStage::Completed | ResearchStage::Failed, _) => false,
            (_, ResearchStage::Failed) => true,
            (current, next) => next > current,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ResearchStage::Completed | ResearchStage::Failed)
    }
}

impl std::fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ResearchStage::Started => "started",
            ResearchStage::Searched => "searched",
            ResearchStage::Analyzed => "analyzed",
            ResearchStage::Verified => "verified",
            ResearchStage::Synthesized => "synthesized",
            ResearchStage::Persisted => "persisted",
            ResearchStage::Completed => "completed",
            ResearchStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Receives lifecycle notifications, synchronously, at stage boundaries.
pub trait ResearchObserver: Send + Sync {
    fn on_stage(&self, _topic: &str, _stage: ResearchStage) {}
    fn on_cache_hit(&self, _topic: &str, _key: &str) {}
    fn on_source_skipped(&self, _source_id: &str, _reason: &str) {}
    fn on_failure(&self, _topic: &str, _error: &str) {}
}

/// Observer that ignores every notification.
pub struct NoOpObserver;

impl ResearchObserver for NoOpObserver {}

/// Observer that records notifications for later inspection.
#[derive(Default)]
pub struct RecordingObserver {
    stages: Mutex<Vec<ResearchStage>>,
    cache_hits: Mutex<Vec<String>>,
    skipped: Mutex<Vec<String>>,
    failures: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stages(&self) -> Vec<ResearchStage> {
        self.stages.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn cache_hits(&self) -> Vec<String> {
        self.cache_hits.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn skipped(&self) -> Vec<String> {
        self.skipped.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

impl ResearchObserver for RecordingObserver {
    fn on_stage(&self, _topic: &str, stage: ResearchStage) {
        if let Ok(mut stages) = self.stages.lock() {
            stages.push(stage);
        }
    }

    fn on_cache_hit(&self, _topic: &str, key: &str) {
        if let Ok(mut hits) = self.cache_hits.lock() {
            hits.push(key.to_string());
        }
    }

    fn on_source_skipped(&self, source_id: &str, _reason: &str) {
        if let Ok(mut skipped) = self.skipped.lock() {
            skipped.push(source_id.to_string());
        }
    }

    fn on_failure(&self, _topic: &str, error: &str) {
        if let Ok(mut failures) = self.failures.lock() {
            failures.push(error.to_string());
        }
    }
}
