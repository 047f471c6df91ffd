// Query builders: every SPARQL string the service sends lives here.
//
// One canonical schema: `?topic` always binds the topic IRI and `?score`
// always binds the numeric weight, in every query. Select lists carry the
// owning event and the evidence entry so DISTINCT never folds two separate
// evidence entries that happen to share a topic and weight.
//
// Builders assume their IRI arguments already passed `is_valid_iri`; the
// store adapter checks that before calling in here.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::topics::vector::SparseVector;

pub const VOC: &str = "http://mu.semte.ch/vocabularies/ext/topic-tools/voc/";
pub const RESOURCES: &str = "http://mu.semte.ch/vocabularies/ext/topic-tools/resources/";

const PREFIXES: &str = "PREFIX ext: <http://mu.semte.ch/vocabularies/ext/topic-tools/voc/>
PREFIX ost: <http://w3id.org/ost/ns#>
PREFIX mu: <http://mu.semte.ch/vocabularies/core/>
PREFIX dct: <http://purl.org/dc/terms/>
PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>
";

/// A learned score record about to be written.
#[derive(Debug, Clone, Copy)]
pub struct ScoreRecord<'a> {
    pub id: &'a str,
    pub theme: &'a str,
    pub score: f64,
}

/// IRI of a freshly minted fingerprint.
pub fn topic_print_iri(id: &str) -> String {
    format!("{RESOURCES}TopicPrint/{id}")
}

/// IRI of a freshly minted learned score.
pub fn learned_score_iri(id: &str) -> String {
    format!("{RESOURCES}LearnedThemeScore/{id}")
}

/// All themes at least one event is curated with.
pub fn themes(graph: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?theme WHERE {{
  GRAPH <{graph}> {{
    ?event ext:hasCuratedTheme ?theme .
  }}
}}"
    )
}

/// Topic evidence of every event curated with `theme`.
pub fn theme_evidence(graph: &str, theme: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?event ?entry ?topic ?score WHERE {{
  GRAPH <{graph}> {{
    ?event ext:hasCuratedTheme <{theme}> ;
           ost:infoUrl/ext:hasTopicScore ?entry .
    ?entry ext:hasTopic ?topic ;
           ext:hasScore ?score .
  }}
}}"
    )
}

/// Topic evidence of every event, for scoring.
pub fn event_vectors(graph: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?event ?entry ?topic ?score WHERE {{
  GRAPH <{graph}> {{
    ?event ost:infoUrl/ext:hasTopicScore ?entry .
    ?entry ext:hasTopic ?topic ;
           ext:hasScore ?score .
  }}
}}"
    )
}

/// Every stored fingerprint entry of a still-curated theme, with the
/// fingerprint it belongs to.
pub fn fingerprints(graph: &str) -> String {
    format!(
        "{PREFIXES}SELECT DISTINCT ?theme ?print ?created ?topic ?score WHERE {{
  GRAPH <{graph}> {{
    ?theme ext:hasTopicPrint ?print .
    FILTER EXISTS {{ ?event ext:hasCuratedTheme ?theme . }}
    ?print ext:hasTopicScore ?entry .
    ?entry ext:hasTopic ?topic ;
           ext:hasScore ?score .
    OPTIONAL {{ ?print dct:created ?created . }}
  }}
}}"
    )
}

/// Insert one fingerprint for `theme` under a new `TopicPrint` identity.
pub fn insert_fingerprint(
    graph: &str,
    theme: &str,
    id: &str,
    created: DateTime<Utc>,
    topics: &SparseVector,
) -> String {
    let print = topic_print_iri(id);
    let mut triples = format!(
        "    <{theme}> ext:hasTopicPrint <{print}> .
    <{print}> a ext:TopicPrint ;
      mu:uuid {} ;
      dct:created {} .
",
        string_literal(id),
        datetime_literal(created),
    );

    for (i, (topic, weight)) in topics.iter().enumerate() {
        triples.push_str(&format!(
            "    <{print}> ext:hasTopicScore _:entry{i} .
    _:entry{i} a ext:TopicScore ;
      ext:hasTopic <{topic}> ;
      ext:hasScore {} .
",
            double_literal(weight)
        ));
    }

    insert_data(graph, &triples)
}

/// Insert one `LearnedThemeScore` per record, all attached to `event`.
pub fn insert_learned_scores(
    graph: &str,
    event: &str,
    created: DateTime<Utc>,
    records: &[ScoreRecord<'_>],
) -> String {
    let created = datetime_literal(created);
    let mut triples = String::new();

    for record in records {
        let lts = learned_score_iri(record.id);
        triples.push_str(&format!(
            "    <{event}> ext:hasLearnedThemeScore <{lts}> .
    <{lts}> a ext:LearnedThemeScore ;
      mu:uuid {} ;
      dct:created {created} ;
      ext:hasLearnedTheme <{}> ;
      ext:hasScore {} .
",
            string_literal(record.id),
            record.theme,
            double_literal(record.score),
        ));
    }

    insert_data(graph, &triples)
}

/// Remove every fingerprint previously stored for `theme`.
pub fn delete_fingerprints(graph: &str, theme: &str) -> String {
    format!(
        "{PREFIXES}DELETE {{
  GRAPH <{graph}> {{
    <{theme}> ext:hasTopicPrint ?print .
    ?print ?p ?o .
    ?entry ?ep ?eo .
  }}
}}
WHERE {{
  GRAPH <{graph}> {{
    <{theme}> ext:hasTopicPrint ?print .
    ?print ?p ?o .
    OPTIONAL {{
      ?print ext:hasTopicScore ?entry .
      ?entry ?ep ?eo .
    }}
  }}
}}"
    )
}

/// Remove every learned score previously stored for `event`.
pub fn delete_learned_scores(graph: &str, event: &str) -> String {
    format!(
        "{PREFIXES}DELETE {{
  GRAPH <{graph}> {{
    <{event}> ext:hasLearnedThemeScore ?lts .
    ?lts ?p ?o .
  }}
}}
WHERE {{
  GRAPH <{graph}> {{
    <{event}> ext:hasLearnedThemeScore ?lts .
    ?lts ?p ?o .
  }}
}}"
    )
}

/// Count distinct curated themes.
pub fn count_themes(graph: &str) -> String {
    count(graph, "?theme", "?event ext:hasCuratedTheme ?theme .")
}

/// Count distinct events carrying topic evidence.
pub fn count_events(graph: &str) -> String {
    count(graph, "?event", "?event ost:infoUrl/ext:hasTopicScore ?entry .")
}

/// Count stored fingerprints, across all runs.
pub fn count_fingerprints(graph: &str) -> String {
    count(graph, "?print", "?print a ext:TopicPrint .")
}

/// Count stored learned score records, across all runs.
pub fn count_learned_scores(graph: &str) -> String {
    count(graph, "?lts", "?lts a ext:LearnedThemeScore .")
}

fn count(graph: &str, var: &str, pattern: &str) -> String {
    format!(
        "{PREFIXES}SELECT (COUNT(DISTINCT {var}) AS ?count) WHERE {{
  GRAPH <{graph}> {{
    {pattern}
  }}
}}"
    )
}

fn insert_data(graph: &str, triples: &str) -> String {
    format!(
        "{PREFIXES}INSERT DATA {{
  GRAPH <{graph}> {{
{triples}  }}
}}"
    )
}

/// Quoted string literal with N-Triples escapes.
pub fn string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// `xsd:double` literal. Non-finite values use the XSD spellings.
pub fn double_literal(v: f64) -> String {
    let lexical = if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "INF".to_string()
    } else if v == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{v:?}")
    };
    format!("\"{lexical}\"^^xsd:double")
}

fn datetime_literal(dt: DateTime<Utc>) -> String {
    format!(
        "\"{}\"^^xsd:dateTime",
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
