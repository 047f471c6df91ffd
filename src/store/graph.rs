// SparqlThemeStore: ThemeStore over a SPARQL gateway.
//
// Builds the canonical queries from queries.rs against one named graph,
// sends them through a StoreGateway, and turns the result rows into typed
// records. Every IRI that ends up inside query text is checked first.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::StoreError;
use super::queries::{self, ScoreRecord};
use super::results::{is_valid_iri, parse_rows, CountRow, FingerprintRow, ThemeRow, TopicScoreRow};
use super::traits::{IdGenerator, StoreGateway, StoreStats, ThemeStore};
use crate::topics::fingerprint::Fingerprint;
use crate::topics::vector::SparseVector;

pub struct SparqlThemeStore {
    gateway: Box<dyn StoreGateway>,
    ids: Box<dyn IdGenerator>,
    graph: String,
}

impl SparqlThemeStore {
    /// `graph` is the named graph every query and update targets.
    pub fn new(gateway: Box<dyn StoreGateway>, ids: Box<dyn IdGenerator>, graph: &str) -> Self {
        Self {
            gateway,
            ids,
            graph: graph.to_string(),
        }
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    async fn count(&self, sparql: &str) -> Result<u64, StoreError> {
        let rows = self.gateway.query(sparql).await?;
        let counts: Vec<CountRow> = parse_rows(&rows)?;
        Ok(counts.first().map(|c| c.count).unwrap_or(0))
    }
}

fn check_iri(iri: &str) -> Result<(), StoreError> {
    if is_valid_iri(iri) {
        Ok(())
    } else {
        Err(StoreError::InvalidIri(iri.to_string()))
    }
}

#[async_trait]
impl ThemeStore for SparqlThemeStore {
    async fn list_themes(&self) -> Result<Vec<String>, StoreError> {
        let rows = self.gateway.query(&queries::themes(&self.graph)).await?;
        let themes: Vec<ThemeRow> = parse_rows(&rows)?;
        Ok(themes.into_iter().map(|r| r.theme).collect())
    }

    async fn theme_evidence(&self, theme: &str) -> Result<Vec<TopicScoreRow>, StoreError> {
        check_iri(theme)?;
        let rows = self
            .gateway
            .query(&queries::theme_evidence(&self.graph, theme))
            .await?;
        Ok(parse_rows(&rows)?)
    }

    async fn clear_fingerprints(&self, theme: &str) -> Result<(), StoreError> {
        check_iri(theme)?;
        self.gateway
            .update(&queries::delete_fingerprints(&self.graph, theme))
            .await
    }

    async fn persist_fingerprint(
        &self,
        fingerprint: &Fingerprint,
        created: DateTime<Utc>,
    ) -> Result<String, StoreError> {
        check_iri(&fingerprint.theme)?;
        for topic in fingerprint.topics.keys() {
            check_iri(topic)?;
        }

        let id = self.ids.new_id();
        let sparql = queries::insert_fingerprint(
            &self.graph,
            &fingerprint.theme,
            &id,
            created,
            &fingerprint.topics,
        );
        self.gateway.update(&sparql).await?;
        Ok(queries::topic_print_iri(&id))
    }

    async fn load_fingerprints(&self) -> Result<Vec<FingerprintRow>, StoreError> {
        let rows = self.gateway.query(&queries::fingerprints(&self.graph)).await?;
        Ok(parse_rows(&rows)?)
    }

    async fn load_event_vectors(&self) -> Result<Vec<TopicScoreRow>, StoreError> {
        let rows = self.gateway.query(&queries::event_vectors(&self.graph)).await?;
        Ok(parse_rows(&rows)?)
    }

    async fn clear_learned_scores(&self, event: &str) -> Result<(), StoreError> {
        check_iri(event)?;
        self.gateway
            .update(&queries::delete_learned_scores(&self.graph, event))
            .await
    }

    async fn persist_learned_scores(
        &self,
        event: &str,
        scores: &SparseVector,
        created: DateTime<Utc>,
    ) -> Result<usize, StoreError> {
        check_iri(event)?;
        for theme in scores.keys() {
            check_iri(theme)?;
        }

        let ids: Vec<String> = scores.keys().map(|_| self.ids.new_id()).collect();
        let records: Vec<ScoreRecord<'_>> = scores
            .iter()
            .zip(&ids)
            .map(|((theme, score), id)| ScoreRecord {
                id: id.as_str(),
                theme,
                score,
            })
            .collect();

        let sparql = queries::insert_learned_scores(&self.graph, event, created, &records);
        self.gateway.update(&sparql).await?;
        Ok(records.len())
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        Ok(StoreStats {
            curated_themes: self.count(&queries::count_themes(&self.graph)).await?,
            events_with_topics: self.count(&queries::count_events(&self.graph)).await?,
            fingerprints: self.count(&queries::count_fingerprints(&self.graph)).await?,
            learned_scores: self.count(&queries::count_learned_scores(&self.graph)).await?,
        })
    }
}
