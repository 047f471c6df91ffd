// Run outcomes: per-unit errors, run-aborting errors, and the run summary.
//
// A ThemeError or EventError costs one theme or one event and is recorded
// in the summary; a RunError stops the run before anything downstream
// of the failed query is attempted.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::store::StoreError;
use crate::topics::vector::VectorError;

/// Failure building or persisting one theme's fingerprint. The theme is skipped.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("evidence query for {theme} failed: {source}")]
    Evidence {
        theme: String,
        #[source]
        source: StoreError,
    },

    #[error("{theme} has no usable topic evidence: {source}")]
    NoEvidence {
        theme: String,
        #[source]
        source: VectorError,
    },

    #[error("clearing previous fingerprints of {theme} failed: {source}")]
    Clear {
        theme: String,
        #[source]
        source: StoreError,
    },

    #[error("persisting fingerprint of {theme} failed: {source}")]
    Persist {
        theme: String,
        #[source]
        source: StoreError,
    },
}

impl ThemeError {
    pub fn theme(&self) -> &str {
        match self {
            ThemeError::Evidence { theme, .. }
            | ThemeError::NoEvidence { theme, .. }
            | ThemeError::Clear { theme, .. }
            | ThemeError::Persist { theme, .. } => theme,
        }
    }
}

/// Failure persisting one event's learned scores. The run moves on.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("clearing previous learned scores of {event} failed: {source}")]
    Clear {
        event: String,
        #[source]
        source: StoreError,
    },

    #[error("persisting learned scores of {event} failed: {source}")]
    Persist {
        event: String,
        #[source]
        source: StoreError,
    },
}

impl EventError {
    pub fn event(&self) -> &str {
        match self {
            EventError::Clear { event, .. } | EventError::Persist { event, .. } => event,
        }
    }
}

/// A failed bulk query every later stage depends on.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("listing curated themes failed: {0}")]
    ListThemes(#[source] StoreError),

    #[error("reading back fingerprints failed: {0}")]
    LoadFingerprints(#[source] StoreError),

    #[error("loading event topic vectors failed: {0}")]
    LoadEventVectors(#[source] StoreError),
}

/// Pipeline stage a unit failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BuildFingerprints,
    PersistResults,
}

/// One skipped theme or event.
#[derive(Debug, Clone, Serialize)]
pub struct UnitFailure {
    pub stage: Stage,
    /// IRI of the theme or event that was skipped
    pub unit: String,
    pub error: String,
}

impl From<&ThemeError> for UnitFailure {
    fn from(e: &ThemeError) -> Self {
        Self {
            stage: Stage::BuildFingerprints,
            unit: e.theme().to_string(),
            error: e.to_string(),
        }
    }
}

impl From<&EventError> for UnitFailure {
    fn from(e: &EventError) -> Self {
        Self {
            stage: Stage::PersistResults,
            unit: e.event().to_string(),
            error: e.to_string(),
        }
    }
}

/// Counts and failures of one completed run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Creation timestamp stamped on every record this run wrote
    pub generation: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub themes_found: usize,
    pub themes_fingerprinted: usize,
    /// (topic, weight) entries across all fingerprints written
    pub topicprints_written: usize,
    /// Themes present in the read-back fingerprint map
    pub fingerprints_loaded: usize,
    pub events_loaded: usize,
    pub events_scored: usize,
    pub events_persisted: usize,
    pub learned_scores_written: usize,
    pub failures: Vec<UnitFailure>,
}

impl RunSummary {
    pub fn new(generation: DateTime<Utc>) -> Self {
        Self {
            generation,
            finished_at: None,
            themes_found: 0,
            themes_fingerprinted: 0,
            topicprints_written: 0,
            fingerprints_loaded: 0,
            events_loaded: 0,
            events_scored: 0,
            events_persisted: 0,
            learned_scores_written: 0,
            failures: Vec::new(),
        }
    }

    /// Whether any theme or event was skipped.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn failures_in(&self, stage: Stage) -> impl Iterator<Item = &UnitFailure> {
        self.failures.iter().filter(move |f| f.stage == stage)
    }
}
