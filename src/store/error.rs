// Store errors: failures at the boundary with the SPARQL store.

use thiserror::Error;

/// A result row that doesn't match the shape its query promises.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RowError {
    #[error("missing variable ?{0}")]
    Missing(String),

    #[error("?{var} should be an IRI, got {kind} {value:?}")]
    NotIri {
        var: String,
        kind: &'static str,
        value: String,
    },

    #[error("?{var} is not a finite number: {value:?}")]
    NotNumeric { var: String, value: String },

    #[error("?{var} is not an xsd:dateTime: {value:?}")]
    NotDateTime { var: String, value: String },
}

/// Failure of a store round trip.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or store-side failure of a read query.
    #[error("SPARQL query failed: {0}")]
    Query(String),

    /// Transport or store-side failure of an update.
    #[error("SPARQL update failed: {0}")]
    Update(String),

    /// The query succeeded but returned a row we can't use.
    #[error("malformed result row: {0}")]
    Row(#[from] RowError),

    /// An identifier that can't be written as `<iri>` in query text.
    #[error("not a usable IRI: {0:?}")]
    InvalidIri(String),
}
