//! Status command handler.

use clap::Args;
use radar_core::{config::AppConfig, AppResult};
use radar_index::SnapshotPersistence;

/// Show snapshot and source file status
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let persistence = SnapshotPersistence::new(config.index_dir());
        let snapshot = match persistence.load(config.embedding.dimensions) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Persisted snapshot unusable: {}", e);
                None
            }
        };

        let position_exists = config.sources.position_reports.exists();
        let messages_exists = config.sources.messages.exists();

        if self.json {
            let body = serde_json::json!({
                "indexed_messages": snapshot.as_ref().map(|s| s.len()).unwrap_or(0),
                "generation": snapshot.as_ref().map(|s| s.generation()),
                "built_at": snapshot.as_ref().and_then(|s| s.built_at()),
                "index_dimension": config.embedding.dimensions,
                "model": config.embedding.model,
                "index_dir": persistence.dir(),
                "files": {
                    "position_reports": { "path": config.sources.position_reports, "exists": position_exists },
                    "messages": { "path": config.sources.messages, "exists": messages_exists },
                },
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
            return Ok(());
        }

        match &snapshot {
            Some(snapshot) => {
                println!(
                    "Snapshot: generation {}, {} summaries",
                    snapshot.generation(),
                    snapshot.len()
                );
                if let Some(built_at) = snapshot.built_at() {
                    println!("Built at: {}", built_at.to_rfc3339());
                }
            }
            None => println!("Snapshot: none persisted"),
        }
        println!(
            "Embedding: {} ({} dimensions)",
            config.embedding.model, config.embedding.dimensions
        );
        println!("Index dir: {}", persistence.dir().display());
        println!(
            "Position reports: {} ({})",
            config.sources.position_reports.display(),
            if position_exists { "present" } else { "missing" }
        );
        println!(
            "Messages: {} ({})",
            config.sources.messages.display(),
            if messages_exists { "present" } else { "missing" }
        );

        Ok(())
    }
}
