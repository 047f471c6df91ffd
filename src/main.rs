use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use themer::config::Config;
use themer::pipeline::Pipeline;
use themer::store::ids::UuidGenerator;
use themer::store::sparql::SparqlClient;
use themer::store::{SparqlThemeStore, ThemeStore};

/// Themer: learned theme scores for topic-annotated events.
///
/// Builds a topic fingerprint for every curated theme and scores every
/// event against those fingerprints.
#[derive(Parser)]
#[command(name = "themer", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute fingerprints and learned theme scores for every event
    Run {
        /// Delete previous fingerprints and learned scores before writing new ones
        #[arg(long)]
        clear_prior: bool,

        /// Number of themes / events processed in parallel
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,

        /// Show a progress bar while writing event scores
        #[arg(long)]
        progress: bool,
    },

    /// List curated themes
    Themes,

    /// Compute and show one theme's fingerprint (nothing is written)
    Fingerprint {
        /// IRI of the theme
        theme: String,
    },

    /// Show record counts in the store
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("themer=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    config.require_graph()?;
    let store = open_store(&config)?;

    match cli.command {
        Commands::Run {
            clear_prior,
            concurrency,
            json,
            progress,
        } => {
            let mut options = config.pipeline();
            options.clear_prior |= clear_prior;
            if let Some(n) = concurrency {
                options.concurrency = n.max(1);
            }
            options.show_progress = progress && !json;

            info!(
                graph = %config.graph,
                clear_prior = options.clear_prior,
                concurrency = options.concurrency,
                "Starting learned theme run"
            );

            let summary = Pipeline::new(&store, options)
                .run()
                .await
                .context("Learned theme run aborted")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                themer::output::terminal::display_summary(&summary);
            }
        }

        Commands::Themes => {
            let themes = store
                .list_themes()
                .await
                .context("Failed to list curated themes")?;
            themer::output::terminal::display_themes(&themes);
        }

        Commands::Fingerprint { theme } => {
            let fingerprint = Pipeline::new(&store, config.pipeline())
                .compute_fingerprint(&theme)
                .await?;
            fingerprint.display();
            println!(
                "{}",
                "Nothing was written. Run `themer run` to store fingerprints.".dimmed()
            );
        }

        Commands::Status => {
            let stats = store.stats().await.context("Failed to read store status")?;
            themer::output::terminal::display_stats(&config.graph, &stats);
        }
    }

    Ok(())
}

/// Build the SPARQL-backed store from configuration.
fn open_store(config: &Config) -> Result<SparqlThemeStore> {
    let client = SparqlClient::new(
        &config.sparql_endpoint,
        &config.update_endpoint,
        config.request_timeout,
        config.query_retries,
    )?;
    Ok(SparqlThemeStore::new(
        Box::new(client),
        Box::new(UuidGenerator),
        &config.graph,
    ))
}
