// Grouping result rows into per-entity vectors.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::store::results::{FingerprintRow, TopicScoreRow};
use crate::topics::affinity::ThemeFingerprints;
use crate::topics::vector::SparseVector;

/// Event IRI -> raw topic vector. Repeated (event, topic) entries accumulate.
pub fn event_vectors(rows: Vec<TopicScoreRow>) -> BTreeMap<String, SparseVector> {
    let mut events: BTreeMap<String, SparseVector> = BTreeMap::new();
    for row in rows {
        events.entry(row.event).or_default().add(row.topic, row.score);
    }
    events
}

/// Theme IRI -> topic vector of the newest stored fingerprint of that theme.
///
/// Stores that never clear old fingerprints hold one per run; only the most
/// recent generation is used so runs never blend. Newest means the latest
/// `created` (records without one count as oldest), ties broken by the
/// larger fingerprint IRI.
pub fn latest_fingerprints(rows: Vec<FingerprintRow>) -> ThemeFingerprints {
    struct Print {
        theme: String,
        created: Option<DateTime<Utc>>,
        // One weight per topic: a print repeated across rows is not summed
        topics: BTreeMap<String, f64>,
    }

    let mut prints: HashMap<String, Print> = HashMap::new();
    for row in rows {
        let print = prints.entry(row.print).or_insert_with(|| Print {
            theme: row.theme,
            created: row.created,
            topics: BTreeMap::new(),
        });
        print.topics.insert(row.topic, row.score);
    }

    let mut newest: BTreeMap<String, (Option<DateTime<Utc>>, String, BTreeMap<String, f64>)> =
        BTreeMap::new();
    for (iri, print) in prints {
        let replace = match newest.get(&print.theme) {
            Some((created, current_iri, _)) => (print.created, &iri) > (*created, current_iri),
            None => true,
        };
        if replace {
            newest.insert(print.theme, (print.created, iri, print.topics));
        }
    }

    newest
        .into_iter()
        .map(|(theme, (_, _, topics))| (theme, topics.into_iter().collect::<SparseVector>()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fp_row(theme: &str, print: &str, hour: Option<u32>, topic: &str, score: f64) -> FingerprintRow {
        FingerprintRow {
            theme: theme.to_string(),
            print: print.to_string(),
            created: hour.map(|h| Utc.with_ymd_and_hms(2026, 10, 15, h, 0, 0).unwrap()),
            topic: topic.to_string(),
            score,
        }
    }

    #[test]
    fn test_event_vectors_accumulate() {
        let rows = vec![
            TopicScoreRow {
                event: "e1".to_string(),
                topic: "a".to_string(),
                score: 1.0,
            },
            TopicScoreRow {
                event: "e1".to_string(),
                topic: "a".to_string(),
                score: 2.0,
            },
            TopicScoreRow {
                event: "e2".to_string(),
                topic: "b".to_string(),
                score: 5.0,
            },
        ];
        let events = event_vectors(rows);
        assert_eq!(events.len(), 2);
        assert_eq!(events["e1"].get("a"), Some(3.0));
        assert_eq!(events["e2"].get("b"), Some(5.0));
    }

    #[test]
    fn test_latest_generation_wins() {
        let rows = vec![
            fp_row("t1", "p-old", Some(8), "a", 1.0),
            fp_row("t1", "p-new", Some(9), "b", 0.4),
            fp_row("t1", "p-new", Some(9), "c", 0.6),
            fp_row("t2", "p-undated", None, "a", 1.0),
        ];
        let fps = latest_fingerprints(rows);
        assert_eq!(fps.len(), 2);
        assert!(!fps["t1"].contains("a"));
        assert_eq!(fps["t1"].get("c"), Some(0.6));
        assert_eq!(fps["t2"].get("a"), Some(1.0));
    }

    #[test]
    fn test_dated_beats_undated_and_ties_use_iri() {
        let rows = vec![
            fp_row("t1", "p-undated", None, "a", 1.0),
            fp_row("t1", "p-1", Some(9), "b", 1.0),
            fp_row("t1", "p-2", Some(9), "c", 1.0),
        ];
        let fps = latest_fingerprints(rows);
        assert_eq!(fps["t1"].get("c"), Some(1.0));
        assert_eq!(fps["t1"].len(), 1);
    }
}
