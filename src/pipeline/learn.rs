// Learned-theme pipeline: curated themes -> fingerprints -> event scores.
//
// Six strictly sequential stages:
// 1. List curated themes                     (fatal on failure)
// 2. Build and persist a fingerprint per theme (failures skip the theme)
// 3. Read fingerprints back from the store  (fatal on failure)
// 4. Load every event's topic vector          (fatal on failure)
// 5. Score every event against the fingerprints
// 6. Persist each event's learned scores      (failures skip the event)
//
// Stage 3 scores against what was durably written rather than against the
// in-memory results of stage 2, so a fingerprint whose write was lost is
// simply absent from scoring. Only themes persisted by this run are kept:
// a theme skipped in stage 2 is not scored against a print left over from
// an earlier run.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use super::entities;
use super::summary::{EventError, RunError, RunSummary, ThemeError, UnitFailure};
use crate::store::ThemeStore;
use crate::topics::affinity::{AffinityScorer, ThemeFingerprints};
use crate::topics::fingerprint::{Fingerprint, FingerprintBuilder};
use crate::topics::vector::SparseVector;

/// Run options.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Delete a theme's / event's previous records right before writing new ones
    pub clear_prior: bool,
    /// Themes (stage 2) or events (stage 6) processed concurrently
    pub concurrency: usize,
    /// Show a progress bar while persisting event scores
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            clear_prior: false,
            concurrency: 1,
            show_progress: false,
        }
    }
}

pub struct Pipeline<'a> {
    store: &'a dyn ThemeStore,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a dyn ThemeStore, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    /// Execute one full recompute.
    ///
    /// Returns the summary once every stage has run, even if individual
    /// themes or events failed (see `RunSummary::failures`). Only the bulk
    /// queries of stages 1, 3 and 4 abort the run.
    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::new(Utc::now());

        // Stage 1
        let themes = self.store.list_themes().await.map_err(|e| {
            warn!(error = %e, "Listing curated themes failed, aborting run");
            RunError::ListThemes(e)
        })?;
        summary.themes_found = themes.len();
        info!(themes = themes.len(), "Curated themes listed");

        // Stage 2
        let persisted = self.build_fingerprints(&themes, &mut summary).await;
        info!(
            fingerprinted = summary.themes_fingerprinted,
            topicprints = summary.topicprints_written,
            skipped = summary.themes_found - summary.themes_fingerprinted,
            "Fingerprints built"
        );

        // Stage 3
        let fingerprints = self.load_fingerprints(&persisted).await?;
        summary.fingerprints_loaded = fingerprints.len();
        info!(themes = fingerprints.len(), "Fingerprints read back");

        // Stage 4
        let events = self.load_event_vectors().await?;
        summary.events_loaded = events.len();
        info!(events = events.len(), "Event topic vectors loaded");

        // Stage 5
        let scored = score_events(&events, &fingerprints);
        summary.events_scored = scored.len();
        info!(events = scored.len(), themes = fingerprints.len(), "Events scored");

        // Stage 6
        self.persist_results(scored, &mut summary).await;
        info!(
            persisted = summary.events_persisted,
            learned_scores = summary.learned_scores_written,
            failures = summary.failures.len(),
            "Learned theme scores written"
        );

        summary.finished_at = Some(Utc::now());
        Ok(summary)
    }

    /// Compute a theme's fingerprint from its curated evidence, without persisting it.
    pub async fn compute_fingerprint(&self, theme: &str) -> Result<Fingerprint, ThemeError> {
        let rows = self
            .store
            .theme_evidence(theme)
            .await
            .map_err(|source| ThemeError::Evidence {
                theme: theme.to_string(),
                source,
            })?;
        debug!(theme = %theme, rows = rows.len(), "Theme evidence loaded");

        let mut builder = FingerprintBuilder::new(theme);
        builder.extend(rows.into_iter().map(|r| (r.topic, r.score)));
        builder.build().map_err(|source| ThemeError::NoEvidence {
            theme: theme.to_string(),
            source,
        })
    }

    async fn fingerprint_theme(
        &self,
        theme: &str,
        generation: DateTime<Utc>,
    ) -> Result<Fingerprint, ThemeError> {
        let fingerprint = self.compute_fingerprint(theme).await?;

        if self.config.clear_prior {
            self.store
                .clear_fingerprints(theme)
                .await
                .map_err(|source| ThemeError::Clear {
                    theme: theme.to_string(),
                    source,
                })?;
        }

        let iri = self
            .store
            .persist_fingerprint(&fingerprint, generation)
            .await
            .map_err(|source| ThemeError::Persist {
                theme: theme.to_string(),
                source,
            })?;
        debug!(theme = %theme, print = %iri, topics = fingerprint.topics.len(), "Fingerprint stored");

        Ok(fingerprint)
    }

    /// Returns the themes whose fingerprint was persisted.
    async fn build_fingerprints(
        &self,
        themes: &[String],
        summary: &mut RunSummary,
    ) -> BTreeSet<String> {
        let generation = summary.generation;
        let results: Vec<Result<Fingerprint, ThemeError>> = stream::iter(
            themes
                .iter()
                .map(|theme| self.fingerprint_theme(theme, generation)),
        )
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;

        let mut persisted = BTreeSet::new();
        for result in results {
            match result {
                Ok(fingerprint) => {
                    summary.themes_fingerprinted += 1;
                    summary.topicprints_written += fingerprint.topics.len();
                    persisted.insert(fingerprint.theme);
                }
                Err(e) => {
                    warn!(theme = %e.theme(), error = %e, "Theme fingerprint failed, skipping");
                    summary.failures.push(UnitFailure::from(&e));
                }
            }
        }
        persisted
    }

    async fn load_fingerprints(
        &self,
        persisted: &BTreeSet<String>,
    ) -> Result<ThemeFingerprints, RunError> {
        let rows = self.store.load_fingerprints().await.map_err(|e| {
            warn!(error = %e, "Reading back fingerprints failed, aborting run");
            RunError::LoadFingerprints(e)
        })?;

        let mut fingerprints = entities::latest_fingerprints(rows);
        let stored = fingerprints.len();
        fingerprints.retain(|theme, _| persisted.contains(theme));
        if fingerprints.len() < stored {
            debug!(
                ignored = stored - fingerprints.len(),
                "Ignoring stored fingerprints of themes not fingerprinted in this run"
            );
        }
        Ok(fingerprints)
    }

    async fn load_event_vectors(&self) -> Result<BTreeMap<String, SparseVector>, RunError> {
        let rows = self.store.load_event_vectors().await.map_err(|e| {
            warn!(error = %e, "Loading event topic vectors failed, aborting run");
            RunError::LoadEventVectors(e)
        })?;
        Ok(entities::event_vectors(rows))
    }

    async fn persist_event(
        &self,
        event: &str,
        learned: &SparseVector,
        generation: DateTime<Utc>,
    ) -> Result<usize, EventError> {
        if self.config.clear_prior {
            self.store
                .clear_learned_scores(event)
                .await
                .map_err(|source| EventError::Clear {
                    event: event.to_string(),
                    source,
                })?;
        }

        // No fingerprints means nothing to record for this event
        if learned.is_empty() {
            return Ok(0);
        }

        self.store
            .persist_learned_scores(event, learned, generation)
            .await
            .map_err(|source| EventError::Persist {
                event: event.to_string(),
                source,
            })
    }

    async fn persist_results(
        &self,
        scored: BTreeMap<String, SparseVector>,
        summary: &mut RunSummary,
    ) {
        let generation = summary.generation;

        let pb = if self.config.show_progress {
            let pb = ProgressBar::new(scored.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("  Persisting [{bar:30}] {pos}/{len} ({eta})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let results: Vec<Result<usize, EventError>> = stream::iter(scored.iter().map(
            |(event, learned)| {
                let pb = &pb;
                async move {
                    let result = self.persist_event(event, learned, generation).await;
                    pb.inc(1);
                    result
                }
            },
        ))
        .buffer_unordered(self.config.concurrency.max(1))
        .collect()
        .await;
        pb.finish_and_clear();

        for result in results {
            match result {
                Ok(written) => {
                    summary.events_persisted += 1;
                    summary.learned_scores_written += written;
                }
                Err(e) => {
                    warn!(event = %e.event(), error = %e, "Persisting learned scores failed, skipping");
                    summary.failures.push(UnitFailure::from(&e));
                }
            }
        }
    }
}

/// Score every event against every fingerprint.
pub fn score_events(
    events: &BTreeMap<String, SparseVector>,
    fingerprints: &ThemeFingerprints,
) -> BTreeMap<String, SparseVector> {
    let scorer = AffinityScorer::new(fingerprints);
    events
        .iter()
        .map(|(event, topics)| (event.clone(), scorer.score(topics)))
        .collect()
}
