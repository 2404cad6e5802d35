//! Command handlers for the radar CLI.

pub mod ask;
pub mod chat;
pub mod rebuild;
pub mod serve;
pub mod status;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use rebuild::RebuildCommand;
pub use serve::ServeCommand;
pub use status::StatusCommand;

use radar_core::{config::AppConfig, AppResult};
use radar_index::IndexServices;
use std::time::Duration;

/// Upper bound for one generation call.
pub(crate) const GENERATION_TIMEOUT: Duration = Duration::from_secs(120);

/// Build the services and publish the persisted snapshot, if any.
pub(crate) async fn load_services(config: &AppConfig) -> AppResult<IndexServices> {
    let services = IndexServices::from_config(config)?;
    if services.scheduler.bootstrap().await.is_none() {
        tracing::info!("No persisted snapshot yet; run 'radar rebuild' or 'radar serve' first");
    }
    Ok(services)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn workspace_config(temp: &TempDir) -> AppConfig {
        let dir = temp.path();
        let aircraft = json!({
            "aircraft": [
                { "flight": "UAL123", "hex": "a1b2c3", "alt_baro": 35000, "gs": 450, "lat": 37.7, "lon": -122.4 }
            ]
        });
        let messages = json!([
            { "vdl2": { "acars": { "flight": "DAL456", "msg_text": "FUEL STATUS OK" } } }
        ]);
        std::fs::write(dir.join("aircraft.json"), aircraft.to_string()).unwrap();
        std::fs::write(dir.join("vdl2.json"), messages.to_string()).unwrap();

        let mut config = AppConfig {
            workspace: dir.to_path_buf(),
            ..Default::default()
        };
        config.sources.position_reports = dir.join("aircraft.json");
        config.sources.messages = dir.join("vdl2.json");
        config.embedding.provider = "mock".to_string();
        config.embedding.dimensions = 64;
        config
    }

    #[tokio::test]
    async fn test_load_services_starts_empty_in_fresh_workspace() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);

        let services = load_services(&config).await.unwrap();
        assert!(services.store.pin().is_empty());
        assert!(!services.persistence.exists());
    }

    #[tokio::test]
    async fn test_rebuild_persists_and_continues_generation() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);
        let rebuild = RebuildCommand { json: true };

        rebuild.execute(&config).await.unwrap();
        rebuild.execute(&config).await.unwrap();

        let services = load_services(&config).await.unwrap();
        let snapshot = services.store.pin();
        assert_eq!(snapshot.generation(), 2);
        assert_eq!(snapshot.len(), 2);
        assert!(config.index_dir().join(radar_index::persist::INDEX_FILE).exists());
    }

    #[tokio::test]
    async fn test_status_reads_workspace_with_and_without_snapshot() {
        let temp = TempDir::new().unwrap();
        let config = workspace_config(&temp);

        StatusCommand { json: true }.execute(&config).await.unwrap();
        RebuildCommand { json: false }.execute(&config).await.unwrap();
        StatusCommand { json: false }.execute(&config).await.unwrap();
    }
}
