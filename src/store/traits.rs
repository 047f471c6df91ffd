// Store traits: the seams between the scoring pipeline and the graph store.
//
// StoreGateway is the raw capability: run a read query, run an update.
// ThemeStore is the typed repository the pipeline talks to; SparqlThemeStore
// implements it over any gateway, MemoryStore implements it in-process.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::error::StoreError;
use super::results::{Bindings, FingerprintRow, TopicScoreRow};
use crate::topics::fingerprint::Fingerprint;
use crate::topics::vector::SparseVector;

/// Executes query text against the store.
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Run a read query and return its result rows.
    async fn query(&self, sparql: &str) -> Result<Vec<Bindings>, StoreError>;

    /// Run a write query.
    async fn update(&self, sparql: &str) -> Result<(), StoreError>;
}

/// Mints identities for persisted records.
pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> String;
}

/// Record counts, for `themer status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub curated_themes: u64,
    pub events_with_topics: u64,
    pub fingerprints: u64,
    pub learned_scores: u64,
}

/// Typed access to themes, evidence, fingerprints and learned scores.
#[async_trait]
pub trait ThemeStore: Send + Sync {
    /// All curated themes.
    async fn list_themes(&self) -> Result<Vec<String>, StoreError>;

    /// One evidence row per (event, topic entry) of events curated with `theme`.
    async fn theme_evidence(&self, theme: &str) -> Result<Vec<TopicScoreRow>, StoreError>;

    /// Delete every fingerprint previously stored for `theme`.
    async fn clear_fingerprints(&self, theme: &str) -> Result<(), StoreError>;

    /// Store `fingerprint` under a fresh identity. Returns the new record's IRI.
    async fn persist_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        created: DateTime<Utc>,
    ) -> Result<String, StoreError>;

    /// Every stored fingerprint entry, across all runs.
    async fn load_fingerprints(&self) -> Result<Vec<FingerprintRow>, StoreError>;

    /// Topic evidence of every event.
    async fn load_event_vectors(&self) -> Result<Vec<TopicScoreRow>, StoreError>;

    /// Delete every learned score previously stored for `event`.
    async fn clear_learned_scores(&self, event: &str) -> Result<(), StoreError>;

    /// Store one learned score record per theme in `scores`. Returns the number written.
    async fn persist_learned_scores(
        &self,
        event: &str,
        scores: &SparseVector,
        created: DateTime<Utc>,
    ) -> Result<usize, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}
