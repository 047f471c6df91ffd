use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::pipeline::PipelineConfig;

pub const DEFAULT_SPARQL_ENDPOINT: &str = "http://database:8890/sparql";
pub const DEFAULT_APPLICATION_GRAPH: &str = "http://mu.semte.ch/application";

/// Central configuration loaded from environment variables.
///
/// The .env file is loaded at startup via dotenvy. Nothing below this
/// module reads the environment: the graph identifier and pipeline options
/// are handed to the store and pipeline explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    /// SPARQL query endpoint (MU_SPARQL_ENDPOINT)
    pub sparql_endpoint: String,
    /// SPARQL update endpoint (MU_SPARQL_UPDATEPOINT, defaults to the query endpoint)
    pub update_endpoint: String,
    /// Named graph every query targets (MU_APPLICATION_GRAPH)
    pub graph: String,
    /// Per-request HTTP timeout (THEMER_TIMEOUT_SECS)
    pub request_timeout: Duration,
    /// Extra attempts for read queries (THEMER_QUERY_RETRIES)
    pub query_retries: u32,
    /// Clear previous records before writing new ones (THEMER_CLEAR_PRIOR)
    pub clear_prior: bool,
    /// Themes / events processed concurrently (THEMER_CONCURRENCY)
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let sparql_endpoint = env::var("MU_SPARQL_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_SPARQL_ENDPOINT.to_string());
        let update_endpoint =
            env::var("MU_SPARQL_UPDATEPOINT").unwrap_or_else(|_| sparql_endpoint.clone());

        let timeout_secs: u64 = parse_var("THEMER_TIMEOUT_SECS", 60)?;
        let concurrency: usize = parse_var("THEMER_CONCURRENCY", 1)?;

        Ok(Self {
            sparql_endpoint,
            update_endpoint,
            graph: env::var("MU_APPLICATION_GRAPH")
                .unwrap_or_else(|_| DEFAULT_APPLICATION_GRAPH.to_string()),
            request_timeout: Duration::from_secs(timeout_secs),
            query_retries: parse_var("THEMER_QUERY_RETRIES", 2)?,
            clear_prior: parse_flag("THEMER_CLEAR_PRIOR")?,
            concurrency: concurrency.max(1),
        })
    }

    /// Pipeline options derived from this configuration.
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            clear_prior: self.clear_prior,
            concurrency: self.concurrency,
            show_progress: false,
        }
    }

    /// Check that the graph identifier can be used in queries.
    pub fn require_graph(&self) -> Result<()> {
        if !crate::store::results::is_valid_iri(&self.graph) {
            anyhow::bail!(
                "MU_APPLICATION_GRAPH is not a usable IRI: {:?}\n\
                 Set it to the named graph holding events and themes.",
                self.graph
            );
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("{name} has an invalid value: {raw:?}")),
        _ => Ok(default),
    }
}

fn parse_flag(name: &str) -> Result<bool> {
    match env::var(name).as_deref().map(str::trim) {
        Ok("1") | Ok("true") | Ok("yes") | Ok("on") => Ok(true),
        Ok("0") | Ok("false") | Ok("no") | Ok("off") | Ok("") | Err(_) => Ok(false),
        Ok(other) => anyhow::bail!("{name} should be true or false, got {other:?}"),
    }
}
