// Colored terminal output for run summaries, theme lists and store status.

use colored::Colorize;

use super::short_iri;
use crate::pipeline::{RunSummary, Stage};
use crate::store::StoreStats;

/// Display the outcome of a pipeline run.
pub fn display_summary(summary: &RunSummary) {
    println!("\n{}", "=== Learned theme run ===".bold());
    println!(
        "  Generation:          {}",
        summary.generation.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "  Themes fingerprinted: {}/{}",
        summary.themes_fingerprinted, summary.themes_found
    );
    println!("  Topicprints written:  {}", summary.topicprints_written);
    println!("  Fingerprints scored:  {}", summary.fingerprints_loaded);
    println!(
        "  Events scored:        {} ({} persisted)",
        summary.events_scored, summary.events_persisted
    );
    println!("  Learned scores:       {}", summary.learned_scores_written);

    if !summary.is_partial() {
        println!("\n  {}", "All themes and events processed.".green());
        return;
    }

    println!();
    for (stage, label) in [
        (Stage::BuildFingerprints, "Skipped themes"),
        (Stage::PersistResults, "Unsaved events"),
    ] {
        let failures: Vec<_> = summary.failures_in(stage).collect();
        if failures.is_empty() {
            continue;
        }
        println!("  {} {} ({})", "!".yellow().bold(), label, failures.len());
        for failure in failures {
            println!(
                "    {:<48} {}",
                short_iri(&failure.unit, 48),
                failure.error.dimmed()
            );
        }
    }
}

/// Display the curated themes.
pub fn display_themes(themes: &[String]) {
    if themes.is_empty() {
        println!("No curated themes found. Tag events with ext:hasCuratedTheme first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Curated themes ({}) ===", themes.len()).bold()
    );
    for (i, theme) in themes.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, theme);
    }
}

/// Display record counts in the store.
pub fn display_stats(graph: &str, stats: &StoreStats) {
    println!("Graph: {graph}");
    println!("Curated themes: {}", stats.curated_themes);
    println!("Events with topic scores: {}", stats.events_with_topics);
    println!("Stored fingerprints: {}", stats.fingerprints);
    println!("Stored learned scores: {}", stats.learned_scores);

    // More fingerprints than themes means earlier runs were never cleared
    if stats.curated_themes > 0 && stats.fingerprints > stats.curated_themes {
        println!(
            "  {} {} fingerprints for {} themes; older generations are kept. \
             Run with --clear-prior to replace them.",
            "Note:".yellow(),
            stats.fingerprints,
            stats.curated_themes
        );
    }
}
