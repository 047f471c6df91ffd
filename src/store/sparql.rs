// HTTP client for a SPARQL 1.1 protocol endpoint.
//
// Queries are POSTed form-encoded (`query=`) and answered as
// application/sparql-results+json; updates are POSTed form-encoded
// (`update=`). Every request carries a timeout. Read queries are retried
// with exponential backoff. Updates are sent exactly once: they are
// INSERT DATA / DELETE statements and replaying a half-applied insert
// would duplicate facts.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, warn};

use super::error::StoreError;
use super::results::{Bindings, SparqlResults};
use super::traits::StoreGateway;

const RESULTS_JSON: &str = "application/sparql-results+json";

/// Initial backoff between query attempts; doubles on each retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(250);

/// Backoff stops doubling after this many retries (250ms * 2^6 = 16s).
const MAX_BACKOFF_DOUBLINGS: u32 = 6;

/// Delay before retry number `attempt + 1`.
fn retry_delay(attempt: u32) -> Duration {
    RETRY_BACKOFF * 2u32.pow(attempt.min(MAX_BACKOFF_DOUBLINGS))
}

/// Client for a SPARQL query/update endpoint pair.
pub struct SparqlClient {
    client: reqwest::Client,
    query_url: String,
    update_url: String,
    max_retries: u32,
}

impl SparqlClient {
    /// Create a client. `max_retries` is the number of extra attempts for read queries.
    pub fn new(
        query_url: &str,
        update_url: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("themer/0.1 (learned-theme-scoring)")
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            query_url: query_url.to_string(),
            update_url: update_url.to_string(),
            max_retries,
        })
    }

    async fn send_query(&self, sparql: &str) -> Result<Vec<Bindings>, StoreError> {
        let response = self
            .client
            .post(&self.query_url)
            .header(reqwest::header::ACCEPT, RESULTS_JSON)
            .form(&[("query", sparql)])
            .send()
            .await
            .map_err(|e| StoreError::Query(format!("request to {} failed: {e}", self.query_url)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Query(format!("endpoint returned {status}: {body}")));
        }

        let results: SparqlResults = response
            .json()
            .await
            .map_err(|e| StoreError::Query(format!("failed to parse results: {e}")))?;

        debug!(
            vars = ?results.head.vars,
            rows = results.results.bindings.len(),
            "SPARQL query complete"
        );
        Ok(results.results.bindings)
    }
}

#[async_trait]
impl StoreGateway for SparqlClient {
    async fn query(&self, sparql: &str) -> Result<Vec<Bindings>, StoreError> {
        let mut attempt = 0;
        loop {
            match self.send_query(sparql).await {
                Ok(rows) => return Ok(rows),
                Err(e) if attempt < self.max_retries => {
                    let backoff = retry_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "SPARQL query failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn update(&self, sparql: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .post(&self.update_url)
            .form(&[("update", sparql)])
            .send()
            .await
            .map_err(|e| {
                StoreError::Update(format!("request to {} failed: {e}", self.update_url))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Update(format!("endpoint returned {status}: {body}")));
        }

        debug!(bytes = sparql.len(), "SPARQL update complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_delay_doubles_then_caps() {
        assert_eq!(retry_delay(0), Duration::from_millis(250));
        assert_eq!(retry_delay(1), Duration::from_millis(500));
        assert_eq!(retry_delay(6), Duration::from_secs(16));
        assert_eq!(retry_delay(7), Duration::from_secs(16));
        assert_eq!(retry_delay(u32::MAX), Duration::from_secs(16));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_query_error() {
        // Port 9 (discard) on localhost is closed in test environments
        let client = SparqlClient::new(
            "http://127.0.0.1:9/sparql",
            "http://127.0.0.1:9/sparql",
            Duration::from_millis(500),
            0,
        )
        .unwrap();

        let err = client.query("SELECT * WHERE { ?s ?p ?o }").await.unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));

        let err = client.update("INSERT DATA { }").await.unwrap_err();
        assert!(matches!(err, StoreError::Update(_)));
    }
}
