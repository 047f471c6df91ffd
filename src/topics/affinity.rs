// Affinity scoring between an event and every theme fingerprint.
//
// The learned score of an event for a theme is the sparse dot product of the
// event's raw topic vector with the theme's fingerprint. Only topics both
// sides mention contribute. Since fingerprints sum to 1.0, the score is the
// fingerprint-weighted average of the event's own topic weights.
//
// Themes with no shared topic still get an explicit 0.0 entry, so a zero
// affinity is stored as a fact and can be told apart from "never scored".

use std::collections::BTreeMap;

use super::vector::SparseVector;

/// Theme IRI -> fingerprint topic vector.
pub type ThemeFingerprints = BTreeMap<String, SparseVector>;

/// Scores events against a fixed set of theme fingerprints.
pub struct AffinityScorer<'a> {
    fingerprints: &'a ThemeFingerprints,
}

impl<'a> AffinityScorer<'a> {
    pub fn new(fingerprints: &'a ThemeFingerprints) -> Self {
        Self { fingerprints }
    }

    /// Number of themes each event is scored against.
    pub fn theme_count(&self) -> usize {
        self.fingerprints.len()
    }

    /// Compute the learned theme vector (theme -> score) for one event.
    pub fn score(&self, event_topics: &SparseVector) -> SparseVector {
        self.fingerprints
            .iter()
            .map(|(theme, fingerprint)| (theme.as_str(), event_topics.dot(fingerprint)))
            .collect()
    }
}
