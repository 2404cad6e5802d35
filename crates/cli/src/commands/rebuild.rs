//! Rebuild command handler.

use clap::Args;
use radar_core::{config::AppConfig, AppResult};
use radar_index::IndexServices;

/// Run one rebuild cycle in the foreground
#[derive(Args, Debug)]
pub struct RebuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl RebuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing rebuild command");

        let services = IndexServices::from_config(config)?;
        // Continue the persisted generation count.
        services.scheduler.bootstrap().await;

        let report = services.scheduler.run_cycle().await?;

        if self.json {
            let body = serde_json::json!({
                "generation": report.generation,
                "entries": report.entries,
                "dropped": report.dropped,
                "skipped_sources": report.skipped_sources,
                "persisted": report.persisted,
                "duration_ms": report.duration.as_millis() as u64,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        } else {
            println!(
                "Indexed {} summaries (generation {}, {} dropped, {} sources skipped) in {:.2}s",
                report.entries,
                report.generation,
                report.dropped,
                report.skipped_sources,
                report.duration.as_secs_f64()
            );
            if !report.persisted {
                println!(
                    "Warning: snapshot was not written to {}",
                    services.persistence.dir().display()
                );
            }
        }

        Ok(())
    }
}
