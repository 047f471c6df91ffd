// MemoryStore: in-process ThemeStore.
//
// Holds curation links, topic evidence and the written records in plain
// vectors behind a tokio Mutex, mirroring how the SPARQL store behaves:
// inserts always append, nothing is overwritten, and deletes only happen
// through the explicit clear_* calls. Individual operations can be made to
// fail so the pipeline's skip/abort policy can be exercised.

use std::collections::{BTreeSet, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::error::StoreError;
use super::results::{FingerprintRow, TopicScoreRow};
use super::traits::{StoreStats, ThemeStore};
use crate::topics::fingerprint::Fingerprint;
use crate::topics::vector::SparseVector;

/// A fingerprint record as written by `persist_fingerprint`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFingerprint {
    pub iri: String,
    pub theme: String,
    pub created: DateTime<Utc>,
    pub topics: SparseVector,
}

/// A learned score record as written by `persist_learned_scores`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLearnedScore {
    pub iri: String,
    pub event: String,
    pub theme: String,
    pub score: f64,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct MemoryState {
    curated: Vec<(String, String)>,
    topic_scores: Vec<TopicScoreRow>,
    fingerprints: Vec<StoredFingerprint>,
    learned: Vec<StoredLearnedScore>,
    next_id: u64,
    failing_evidence: HashSet<String>,
    failing_prints: HashSet<String>,
    failing_events: HashSet<String>,
    fail_list_themes: bool,
    fail_event_vectors: bool,
    fail_fingerprint_load: bool,
}

impl MemoryState {
    fn mint(&mut self, kind: &str) -> String {
        self.next_id += 1;
        format!("urn:themer:{kind}:{:06}", self.next_id)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag `event` with the curated `theme`.
    pub fn with_curated(mut self, event: &str, theme: &str) -> Self {
        self.state
            .get_mut()
            .curated
            .push((event.to_string(), theme.to_string()));
        self
    }

    /// Attach one topic evidence entry to `event`.
    pub fn with_topic_score(mut self, event: &str, topic: &str, score: f64) -> Self {
        self.state.get_mut().topic_scores.push(TopicScoreRow {
            event: event.to_string(),
            topic: topic.to_string(),
            score,
        });
        self
    }

    /// Make the evidence query for `theme` fail.
    pub fn fail_evidence_for(mut self, theme: &str) -> Self {
        self.state.get_mut().failing_evidence.insert(theme.to_string());
        self
    }

    /// Make writing a fingerprint for `theme` fail.
    pub fn fail_persist_fingerprint_for(mut self, theme: &str) -> Self {
        self.state.get_mut().failing_prints.insert(theme.to_string());
        self
    }

    /// Make persisting learned scores for `event` fail.
    pub fn fail_persist_for(mut self, event: &str) -> Self {
        self.state.get_mut().failing_events.insert(event.to_string());
        self
    }

    pub fn fail_list_themes(mut self) -> Self {
        self.state.get_mut().fail_list_themes = true;
        self
    }

    pub fn fail_event_vectors(mut self) -> Self {
        self.state.get_mut().fail_event_vectors = true;
        self
    }

    pub fn fail_fingerprint_load(mut self) -> Self {
        self.state.get_mut().fail_fingerprint_load = true;
        self
    }

    /// Every fingerprint record written so far, in write order.
    pub async fn fingerprints(&self) -> Vec<StoredFingerprint> {
        self.state.lock().await.fingerprints.clone()
    }

    /// Every learned score record written so far, in write order.
    pub async fn learned_scores(&self) -> Vec<StoredLearnedScore> {
        self.state.lock().await.learned.clone()
    }

    /// Learned score records of one event.
    pub async fn learned_scores_for(&self, event: &str) -> Vec<StoredLearnedScore> {
        self.state
            .lock()
            .await
            .learned
            .iter()
            .filter(|r| r.event == event)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl ThemeStore for MemoryStore {
    async fn list_themes(&self) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_list_themes {
            return Err(StoreError::Query("theme listing unavailable".to_string()));
        }
        let themes: BTreeSet<&String> = state.curated.iter().map(|(_, t)| t).collect();
        Ok(themes.into_iter().cloned().collect())
    }

    async fn theme_evidence(&self, theme: &str) -> Result<Vec<TopicScoreRow>, StoreError> {
        let state = self.state.lock().await;
        if state.failing_evidence.contains(theme) {
            return Err(StoreError::Query(format!("evidence for {theme} unavailable")));
        }
        let events: HashSet<&str> = state
            .curated
            .iter()
            .filter(|(_, t)| t == theme)
            .map(|(e, _)| e.as_str())
            .collect();
        Ok(state
            .topic_scores
            .iter()
            .filter(|row| events.contains(row.event.as_str()))
            .cloned()
            .collect())
    }

    async fn clear_fingerprints(&self, theme: &str) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .fingerprints
            .retain(|fp| fp.theme != theme);
        Ok(())
    }

    async fn persist_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        created: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_prints.contains(&fingerprint.theme) {
            return Err(StoreError::Update(format!(
                "fingerprint write for {} rejected",
                fingerprint.theme
            )));
        }
        let iri = state.mint("print");
        state.fingerprints.push(StoredFingerprint {
            iri: iri.clone(),
            theme: fingerprint.theme.clone(),
            created,
            topics: fingerprint.topics.clone(),
        });
        Ok(iri)
    }

    async fn load_fingerprints(&self) -> Result<Vec<FingerprintRow>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_fingerprint_load {
            return Err(StoreError::Query("fingerprint read-back unavailable".to_string()));
        }
        let curated: HashSet<&str> = state.curated.iter().map(|(_, t)| t.as_str()).collect();
        Ok(state
            .fingerprints
            .iter()
            .filter(|fp| curated.contains(fp.theme.as_str()))
            .flat_map(|fp| {
                fp.topics.iter().map(move |(topic, score)| FingerprintRow {
                    theme: fp.theme.clone(),
                    print: fp.iri.clone(),
                    created: Some(fp.created),
                    topic: topic.to_string(),
                    score,
                })
            })
            .collect())
    }

    async fn load_event_vectors(&self) -> Result<Vec<TopicScoreRow>, StoreError> {
        let state = self.state.lock().await;
        if state.fail_event_vectors {
            return Err(StoreError::Query("event vectors unavailable".to_string()));
        }
        Ok(state.topic_scores.clone())
    }

    async fn clear_learned_scores(&self, event: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_events.contains(event) {
            return Err(StoreError::Update(format!("clearing {event} rejected")));
        }
        state.learned.retain(|r| r.event != event);
        Ok(())
    }

    async fn persist_learned_scores(
        &self,
        event: &str,
        scores: &SparseVector,
        created: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        let mut state = self.state.lock().await;
        if state.failing_events.contains(event) {
            return Err(StoreError::Update(format!("write for {event} rejected")));
        }
        for (theme, score) in scores.iter() {
            let iri = state.mint("learned");
            state.learned.push(StoredLearnedScore {
                iri,
                event: event.to_string(),
                theme: theme.to_string(),
                score,
                created,
            });
        }
        Ok(scores.len())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let state = self.state.lock().await;
        let themes: HashSet<&str> = state.curated.iter().map(|(_, t)| t.as_str()).collect();
        let events: HashSet<&str> = state.topic_scores.iter().map(|r| r.event.as_str()).collect();
        Ok(StoreStats {
            curated_themes: themes.len() as u64,
            events_with_topics: events.len() as u64,
            fingerprints: state.fingerprints.len() as u64,
            learned_scores: state.learned.len() as u64,
        })
    }
}
