//! Ask command handler.
//!
//! One-shot similarity search against the persisted snapshot.

use clap::Args;
use radar_core::{config::AppConfig, AppResult};
use radar_index::Query;

/// Search the persisted snapshot
#[derive(Args, Debug)]
pub struct AskCommand {
    /// Query text
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Minimum similarity score (inclusive)
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum number of results
    #[arg(short = 'n', long)]
    pub max_results: Option<usize>,

    /// Include raw scores and best unfiltered candidates
    #[arg(long)]
    pub debug: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");

        let services = super::load_services(config).await?;

        let query = Query::new(self.query.join(" "))
            .with_threshold(self.threshold.unwrap_or(config.retrieval.threshold))
            .with_max_results(self.max_results.unwrap_or(config.retrieval.max_results))
            .with_breadth_multiplier(config.retrieval.ask_multiplier)
            .with_debug(self.debug);

        let outcome = services.engine.search(&query).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            return Ok(());
        }

        if outcome.results.is_empty() {
            println!(
                "No relevant messages found above confidence threshold {}.",
                outcome.threshold
            );
        }
        for result in &outcome.results {
            println!("{}. [{:.3}] {}", result.rank, result.score, result.text);
        }

        if let Some(debug) = &outcome.debug {
            println!();
            println!(
                "debug: generation {}, {} indexed, search_k {}",
                debug.generation, debug.indexed_count, debug.search_k
            );
            println!("debug: raw scores {:?}", debug.raw_scores);
            for candidate in debug.best_unfiltered.iter().flatten() {
                println!("debug: [{:.3}] {}", candidate.score, candidate.text);
            }
        }

        Ok(())
    }
}
