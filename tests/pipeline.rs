// Pipeline tests: full runs against the in-process MemoryStore.
//
// Covers the skip/abort policy for each stage, the worked example from the
// curation data, and what repeated runs do to the stored records.

use chrono::{TimeZone, Utc};

use themer::pipeline::{Pipeline, PipelineConfig, RunError, Stage, ThemeError};
use themer::store::{MemoryStore, ThemeStore};
use themer::topics::fingerprint::FingerprintBuilder;

const T1: &str = "http://example.org/themes/T1";
const T2: &str = "http://example.org/themes/T2";
const C1: &str = "http://example.org/events/curated-1";
const C2: &str = "http://example.org/events/curated-2";
const E1: &str = "http://example.org/events/E1";
const TOPIC_A: &str = "http://example.org/topics/A";
const TOPIC_B: &str = "http://example.org/topics/B";
const TOPIC_C: &str = "http://example.org/topics/C";

/// T1 curated on two events with {A: 1, B: 1} each, plus an uncurated event
/// E1 with {A: 4, C: 1}.
fn scenario() -> MemoryStore {
    MemoryStore::new()
        .with_curated(C1, T1)
        .with_curated(C2, T1)
        .with_topic_score(C1, TOPIC_A, 1.0)
        .with_topic_score(C1, TOPIC_B, 1.0)
        .with_topic_score(C2, TOPIC_A, 1.0)
        .with_topic_score(C2, TOPIC_B, 1.0)
        .with_topic_score(E1, TOPIC_A, 4.0)
        .with_topic_score(E1, TOPIC_C, 1.0)
}

/// Store a fingerprint for `theme` as an earlier run would have left it.
async fn seed_prior_print(store: &MemoryStore, theme: &str, topic: &str) {
    let mut builder = FingerprintBuilder::new(theme);
    builder.add(topic, 1.0);
    let created = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    store
        .persist_fingerprint(&builder.build().unwrap(), created)
        .await
        .unwrap();
}

fn learned_score(records: &[themer::store::memory::StoredLearnedScore], theme: &str) -> Option<f64> {
    records.iter().find(|r| r.theme == theme).map(|r| r.score)
}

#[tokio::test]
async fn end_to_end_learned_score() {
    let store = scenario();
    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.themes_found, 1);
    assert_eq!(summary.themes_fingerprinted, 1);
    assert_eq!(summary.topicprints_written, 2);
    assert_eq!(summary.fingerprints_loaded, 1);
    assert_eq!(summary.events_loaded, 3);
    assert_eq!(summary.events_scored, 3);
    assert!(!summary.is_partial());

    let fingerprints = store.fingerprints().await;
    assert_eq!(fingerprints.len(), 1);
    assert!((fingerprints[0].topics.get(TOPIC_A).unwrap() - 0.5).abs() < 1e-12);
    assert!((fingerprints[0].topics.get(TOPIC_B).unwrap() - 0.5).abs() < 1e-12);

    let e1 = store.learned_scores_for(E1).await;
    assert_eq!(e1.len(), 1);
    assert!((learned_score(&e1, T1).unwrap() - 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn theme_without_evidence_is_skipped() {
    // T2 is curated on an event that has no topic scores at all
    let store = scenario().with_curated("http://example.org/events/bare", T2);
    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.themes_found, 2);
    assert_eq!(summary.themes_fingerprinted, 1);
    assert_eq!(summary.fingerprints_loaded, 1);

    let skipped: Vec<_> = summary.failures_in(Stage::BuildFingerprints).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].unit, T2);

    // T2 never appears in any event's learned scores
    for record in store.learned_scores().await {
        assert_ne!(record.theme, T2);
    }
    let e1 = store.learned_scores_for(E1).await;
    assert!((learned_score(&e1, T1).unwrap() - 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn skipped_theme_ignores_its_print_from_an_earlier_run() {
    for clear_prior in [false, true] {
        // T2 was fingerprinted once, but its only curated event has no evidence now
        let store = scenario().with_curated("http://example.org/events/bare", T2);
        seed_prior_print(&store, T2, TOPIC_A).await;

        let config = PipelineConfig {
            clear_prior,
            ..PipelineConfig::default()
        };
        let summary = Pipeline::new(&store, config).run().await.unwrap();

        let skipped: Vec<_> = summary.failures_in(Stage::BuildFingerprints).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].unit, T2);
        assert_eq!(summary.fingerprints_loaded, 1);

        for record in store.learned_scores().await {
            assert_ne!(record.theme, T2, "clear_prior={clear_prior}");
        }
        let e1 = store.learned_scores_for(E1).await;
        assert!((learned_score(&e1, T1).unwrap() - 2.0).abs() < 1e-12);
    }
}

#[tokio::test]
async fn prints_of_themes_no_longer_curated_are_not_read_back() {
    let store = scenario();
    seed_prior_print(&store, "http://example.org/themes/retired", TOPIC_A).await;

    let rows = store.load_fingerprints().await.unwrap();
    assert!(rows.iter().all(|row| row.theme != "http://example.org/themes/retired"));
}

#[tokio::test]
async fn failed_fingerprint_write_skips_only_that_theme() {
    let store = scenario()
        .with_curated(E1, T2)
        .fail_persist_fingerprint_for(T2);
    // An older T2 print must not stand in for the one that failed to write
    seed_prior_print(&store, T2, TOPIC_A).await;

    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.themes_found, 2);
    assert_eq!(summary.themes_fingerprinted, 1);
    let skipped: Vec<_> = summary.failures_in(Stage::BuildFingerprints).collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].unit, T2);
    assert!(skipped[0].error.contains("persisting fingerprint"));

    // T1 was still written in this run, next to the seeded T2 print
    let fingerprints = store.fingerprints().await;
    assert_eq!(fingerprints.iter().filter(|fp| fp.theme == T1).count(), 1);
    assert_eq!(summary.fingerprints_loaded, 1);

    for record in store.learned_scores().await {
        assert_ne!(record.theme, T2);
    }
    let e1 = store.learned_scores_for(E1).await;
    assert!((learned_score(&e1, T1).unwrap() - 2.0).abs() < 1e-12);
}

#[tokio::test]
async fn failing_evidence_query_skips_only_that_theme() {
    let store = scenario()
        .with_curated(E1, T2)
        .fail_evidence_for(T2);
    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.themes_fingerprinted, 1);
    assert_eq!(summary.failures.len(), 1);
    assert!(summary.failures[0].error.contains("evidence query"));
    assert!(learned_score(&store.learned_scores_for(E1).await, T1).is_some());
}

#[tokio::test]
async fn zero_overlap_is_recorded_as_zero() {
    let store = scenario()
        .with_curated(C1, T2)
        .with_topic_score("http://example.org/events/E9", "http://example.org/topics/Z", 3.0);
    Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    let e9 = store.learned_scores_for("http://example.org/events/E9").await;
    assert_eq!(e9.len(), 2);
    assert_eq!(learned_score(&e9, T1), Some(0.0));
    assert_eq!(learned_score(&e9, T2), Some(0.0));
}

#[tokio::test]
async fn theme_listing_failure_aborts_before_writing() {
    let store = scenario().fail_list_themes();
    let err = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::ListThemes(_)));
    assert!(store.fingerprints().await.is_empty());
    assert!(store.learned_scores().await.is_empty());
}

#[tokio::test]
async fn event_vector_failure_aborts_after_fingerprints() {
    let store = scenario().fail_event_vectors();
    let err = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, RunError::LoadEventVectors(_)));
    // Stage 2 already ran
    assert_eq!(store.fingerprints().await.len(), 1);
    assert!(store.learned_scores().await.is_empty());
}

#[tokio::test]
async fn fingerprint_read_back_failure_aborts() {
    let store = scenario().fail_fingerprint_load();
    let err = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, RunError::LoadFingerprints(_)));
    assert!(store.learned_scores().await.is_empty());
}

#[tokio::test]
async fn failing_event_write_does_not_stop_other_events() {
    let store = scenario().fail_persist_for(C1);
    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.events_scored, 3);
    assert_eq!(summary.events_persisted, 2);
    let unsaved: Vec<_> = summary.failures_in(Stage::PersistResults).collect();
    assert_eq!(unsaved.len(), 1);
    assert_eq!(unsaved[0].unit, C1);

    assert!(store.learned_scores_for(C1).await.is_empty());
    assert_eq!(store.learned_scores_for(C2).await.len(), 1);
    assert_eq!(store.learned_scores_for(E1).await.len(), 1);
}

#[tokio::test]
async fn repeated_runs_accumulate_records_by_default() {
    // Current behavior without clear_prior: every run appends a new
    // generation of fingerprints and learned scores.
    let store = scenario();
    let pipeline = Pipeline::new(&store, PipelineConfig::default());
    pipeline.run().await.unwrap();
    let second = pipeline.run().await.unwrap();

    let fingerprints = store.fingerprints().await;
    assert_eq!(fingerprints.len(), 2);
    assert_eq!(fingerprints[0].topics, fingerprints[1].topics);
    assert_ne!(fingerprints[0].iri, fingerprints[1].iri);

    let e1 = store.learned_scores_for(E1).await;
    assert_eq!(e1.len(), 2);
    assert_eq!(e1[0].score, e1[1].score);

    // Scoring still sees one fingerprint per theme
    assert_eq!(second.fingerprints_loaded, 1);

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.fingerprints, 2);
    assert_eq!(stats.learned_scores, 6);
}

#[tokio::test]
async fn clear_prior_keeps_a_single_generation() {
    let store = scenario();
    let config = PipelineConfig {
        clear_prior: true,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(&store, config);
    pipeline.run().await.unwrap();
    let second = pipeline.run().await.unwrap();

    assert_eq!(store.fingerprints().await.len(), 1);
    assert_eq!(store.learned_scores_for(E1).await.len(), 1);
    assert_eq!(store.fingerprints().await[0].created, second.generation);
}

#[tokio::test]
async fn concurrent_run_matches_sequential_run() {
    let sequential = scenario().with_curated(E1, T2);
    let concurrent = scenario().with_curated(E1, T2);

    Pipeline::new(&sequential, PipelineConfig::default())
        .run()
        .await
        .unwrap();
    let config = PipelineConfig {
        concurrency: 4,
        ..PipelineConfig::default()
    };
    let summary = Pipeline::new(&concurrent, config).run().await.unwrap();
    assert_eq!(summary.themes_fingerprinted, 2);

    for event in [C1, C2, E1] {
        let a = sequential.learned_scores_for(event).await;
        let b = concurrent.learned_scores_for(event).await;
        for theme in [T1, T2] {
            let x = learned_score(&a, theme).unwrap();
            let y = learned_score(&b, theme).unwrap();
            assert!((x - y).abs() < 1e-12);
        }
    }
}

#[tokio::test]
async fn compute_fingerprint_writes_nothing() {
    let store = scenario();
    let pipeline = Pipeline::new(&store, PipelineConfig::default());

    let fingerprint = pipeline.compute_fingerprint(T1).await.unwrap();
    assert_eq!(fingerprint.evidence_count, 4);
    assert!(store.fingerprints().await.is_empty());

    let err = pipeline.compute_fingerprint(T2).await.unwrap_err();
    assert!(matches!(err, ThemeError::NoEvidence { .. }));
}

#[tokio::test]
async fn no_themes_writes_no_scores() {
    let store = MemoryStore::new().with_topic_score(E1, TOPIC_A, 1.0);
    let summary = Pipeline::new(&store, PipelineConfig::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.themes_found, 0);
    assert_eq!(summary.events_scored, 1);
    assert_eq!(summary.learned_scores_written, 0);
    assert!(store.learned_scores().await.is_empty());
}
