// SPARQL 1.1 JSON results and the fixed row records built from them.
//
// The store hands back rows as untyped `variable -> term` maps. Each query we
// issue has exactly one record type here, and rows are converted (and
// validated) right at the boundary so the rest of the crate never handles
// raw bindings.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::RowError;

/// One RDF term in a result binding.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RdfTerm {
    Uri {
        value: String,
    },
    Literal {
        value: String,
        #[serde(default)]
        datatype: Option<String>,
        #[serde(default, rename = "xml:lang")]
        lang: Option<String>,
    },
    /// Virtuoso still emits the SPARQL 1.0 `typed-literal` form.
    TypedLiteral {
        value: String,
        datatype: String,
    },
    Bnode {
        value: String,
    },
}

impl RdfTerm {
    pub fn value(&self) -> &str {
        match self {
            RdfTerm::Uri { value }
            | RdfTerm::Literal { value, .. }
            | RdfTerm::TypedLiteral { value, .. }
            | RdfTerm::Bnode { value } => value,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            RdfTerm::Uri { .. } => "uri",
            RdfTerm::Literal { .. } | RdfTerm::TypedLiteral { .. } => "literal",
            RdfTerm::Bnode { .. } => "bnode",
        }
    }
}

/// A single result row.
pub type Bindings = HashMap<String, RdfTerm>;

/// Full `application/sparql-results+json` document.
#[derive(Debug, Clone, Deserialize)]
pub struct SparqlResults {
    #[serde(default)]
    pub head: ResultHead,
    pub results: ResultSet,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResultHead {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultSet {
    pub bindings: Vec<Bindings>,
}

/// Convert a raw row into a typed record.
pub trait FromBindings: Sized {
    fn from_bindings(row: &Bindings) -> Result<Self, RowError>;
}

/// Convert every row, failing on the first malformed one.
pub fn parse_rows<T: FromBindings>(rows: &[Bindings]) -> Result<Vec<T>, RowError> {
    rows.iter().map(T::from_bindings).collect()
}

/// Whether `s` can be written between `<` and `>` in query text.
pub fn is_valid_iri(s: &str) -> bool {
    !s.is_empty()
        && s.contains(':')
        && !s
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "<>\"{}|^`\\".contains(c))
}

fn term<'a>(row: &'a Bindings, var: &str) -> Result<&'a RdfTerm, RowError> {
    row.get(var).ok_or_else(|| RowError::Missing(var.to_string()))
}

fn iri(row: &Bindings, var: &str) -> Result<String, RowError> {
    match term(row, var)? {
        RdfTerm::Uri { value } if is_valid_iri(value) => Ok(value.clone()),
        other => Err(RowError::NotIri {
            var: var.to_string(),
            kind: other.kind(),
            value: other.value().to_string(),
        }),
    }
}

/// A finite number. `NaN` and `INF` are valid xsd:double spellings but are
/// rejected here like any other non-number.
fn number(row: &Bindings, var: &str) -> Result<f64, RowError> {
    let raw = term(row, var)?.value();
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| RowError::NotNumeric {
            var: var.to_string(),
            value: raw.to_string(),
        })
}

fn optional_datetime(row: &Bindings, var: &str) -> Result<Option<DateTime<Utc>>, RowError> {
    let Some(t) = row.get(var) else {
        return Ok(None);
    };
    DateTime::parse_from_rfc3339(t.value())
        .map(|dt| Some(dt.with_timezone(&Utc)))
        .map_err(|_| RowError::NotDateTime {
            var: var.to_string(),
            value: t.value().to_string(),
        })
}

/// `?theme`: one curated theme.
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeRow {
    pub theme: String,
}

impl FromBindings for ThemeRow {
    fn from_bindings(row: &Bindings) -> Result<Self, RowError> {
        Ok(Self {
            theme: iri(row, "theme")?,
        })
    }
}

/// `?event ?topic ?score`: one topic evidence entry of one event.
///
/// Used both for a theme's curated evidence and for the bulk event vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicScoreRow {
    pub event: String,
    pub topic: String,
    pub score: f64,
}

impl FromBindings for TopicScoreRow {
    fn from_bindings(row: &Bindings) -> Result<Self, RowError> {
        Ok(Self {
            event: iri(row, "event")?,
            topic: iri(row, "topic")?,
            score: number(row, "score")?,
        })
    }
}

/// `?theme ?print ?created ?topic ?score`: one entry of a stored fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintRow {
    pub theme: String,
    pub print: String,
    pub created: Option<DateTime<Utc>>,
    pub topic: String,
    pub score: f64,
}

impl FromBindings for FingerprintRow {
    fn from_bindings(row: &Bindings) -> Result<Self, RowError> {
        Ok(Self {
            theme: iri(row, "theme")?,
            print: iri(row, "print")?,
            created: optional_datetime(row, "created")?,
            topic: iri(row, "topic")?,
            score: number(row, "score")?,
        })
    }
}

/// `?count`: result of an aggregate query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CountRow {
    pub count: u64,
}

impl FromBindings for CountRow {
    fn from_bindings(row: &Bindings) -> Result<Self, RowError> {
        let n = number(row, "count")?;
        Ok(Self {
            count: n.max(0.0) as u64,
        })
    }
}
