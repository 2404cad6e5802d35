//! Serve command handler.

use crate::server::{self, AppState};
use clap::Args;
use radar_core::{config::AppConfig, AppError, AppResult};
use radar_index::{ChatService, IndexServices};
use radar_llm::{create_client, SamplingParams};
use radar_prompt::PromptAssembler;
use std::sync::Arc;

/// Run the rebuild loop and the HTTP query interface
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Address to bind (overrides config)
    #[arg(short, long, env = "RADAR_BIND")]
    pub bind: Option<String>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing serve command");

        let services = IndexServices::from_config(config)?;
        if let Err(e) = services.engine.embedder().verify().await {
            tracing::warn!(
                "Embedding provider not ready, rebuilds and queries will fail until it is: {}",
                e
            );
        }
        services.scheduler.bootstrap().await;

        // Runs for the life of the process.
        let _rebuild = Arc::clone(&services.scheduler).spawn();

        let llm = create_client(&config.chat, super::GENERATION_TIMEOUT)?;
        let chat = ChatService::new(
            services.engine.clone(),
            llm,
            PromptAssembler::new()?,
            config.chat.model.clone(),
        )
        .with_sampling(SamplingParams::from(&config.chat));

        let state = AppState::new(config.clone(), services.engine, chat);
        let bind = self.bind.clone().unwrap_or_else(|| config.server.bind.clone());

        server::run_server(state, &bind).await.map_err(AppError::from)
    }
}
