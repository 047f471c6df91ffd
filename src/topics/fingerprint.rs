// Fingerprint: the normalized topic distribution of a curated theme.
//
// A theme's fingerprint is built from every (topic, weight) evidence entry
// of the events a curator tagged with that theme. The weights are summed per
// topic and then normalized to sum to 1.0, so a theme with 200 curated events
// and one with 3 end up on the same scale: what matters is the shape of the
// distribution, not the raw volume of evidence.

use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::vector::{SparseVector, VectorError};

/// A theme's normalized topic profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fingerprint {
    /// IRI of the owning theme
    pub theme: String,
    /// Topic -> weight, summing to 1.0
    pub topics: SparseVector,
    /// Number of evidence entries that went into the fingerprint
    pub evidence_count: usize,
}

/// Accumulates raw evidence for one theme.
#[derive(Debug, Clone)]
pub struct FingerprintBuilder {
    theme: String,
    evidence: SparseVector,
    evidence_count: usize,
}

impl FingerprintBuilder {
    pub fn new(theme: impl Into<String>) -> Self {
        Self {
            theme: theme.into(),
            evidence: SparseVector::new(),
            evidence_count: 0,
        }
    }

    /// Add one (topic, weight) evidence entry.
    pub fn add(&mut self, topic: impl Into<String>, weight: f64) -> &mut Self {
        self.evidence.add(topic, weight);
        self.evidence_count += 1;
        self
    }

    /// Add a sequence of evidence entries.
    pub fn extend<K, I>(&mut self, entries: I) -> &mut Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, f64)>,
    {
        for (topic, weight) in entries {
            self.add(topic, weight);
        }
        self
    }

    /// Normalize the accumulated evidence into a fingerprint.
    ///
    /// A theme without evidence (or with only zero weights) has no
    /// distribution, so this fails with `DivisionByZero`. A NaN or infinite
    /// weight fails with `NonFinite`.
    pub fn build(&self) -> Result<Fingerprint, VectorError> {
        let topics = self.evidence.normalize()?;
        Ok(Fingerprint {
            theme: self.theme.clone(),
            topics,
            evidence_count: self.evidence_count,
        })
    }
}

impl Fingerprint {
    /// Display the fingerprint as a bar chart in the terminal, heaviest topic first.
    pub fn display(&self) {
        println!(
            "\n{}",
            format!(
                "=== Fingerprint for {} ({} evidence entries) ===",
                self.theme, self.evidence_count
            )
            .bold()
        );
        println!();

        let bar_width: usize = 20;

        let mut ranked: Vec<(&str, f64)> = self.topics.iter().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        for (i, (topic, weight)) in ranked.iter().enumerate() {
            let filled = (weight * bar_width as f64).round().max(0.0) as usize;
            let empty = bar_width.saturating_sub(filled);
            let bar = format!("[{}{}]", "=".repeat(filled.min(bar_width)), " ".repeat(empty));

            let colored_bar = if *weight >= 0.25 {
                bar.bright_green()
            } else if *weight >= 0.10 {
                bar.bright_yellow()
            } else {
                bar.bright_blue()
            };

            println!(
                "  {:>2}. {:<60} {} {:.3}",
                i + 1,
                crate::output::short_iri(topic, 60).bold(),
                colored_bar,
                weight
            );
        }
        println!();
    }
}
