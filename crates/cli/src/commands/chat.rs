//! Chat command handler.

use clap::Args;
use radar_core::{config::AppConfig, AppResult};
use radar_index::{ChatRequest, ChatService};
use radar_llm::{create_client, SamplingParams};
use radar_prompt::PromptAssembler;

/// Ask the chat model, grounded in the persisted snapshot
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Question text
    #[arg(required = true, num_args = 1..)]
    pub query: Vec<String>,

    /// Minimum similarity score for context lines
    #[arg(short, long)]
    pub threshold: Option<f32>,

    /// Maximum number of context lines
    #[arg(long)]
    pub max_context: Option<usize>,

    /// Print the context lines that were used
    #[arg(long)]
    pub show_context: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        let services = super::load_services(config).await?;
        let llm = create_client(&config.chat, super::GENERATION_TIMEOUT)?;

        let chat = ChatService::new(
            services.engine,
            llm,
            PromptAssembler::new()?,
            config.chat.model.clone(),
        )
        .with_sampling(SamplingParams::from(&config.chat));

        let request = ChatRequest::new(self.query.join(" "))
            .with_threshold(self.threshold.unwrap_or(config.retrieval.threshold))
            .with_max_context(self.max_context.unwrap_or(config.retrieval.max_context))
            .with_breadth_multiplier(config.retrieval.chat_multiplier);

        let answer = chat.chat(&request).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            return Ok(());
        }

        println!("{}", answer.response);

        if self.show_context {
            println!();
            println!(
                "Context ({} lines, threshold {}):",
                answer.context_used(),
                answer.threshold_used
            );
            for line in &answer.context {
                println!("  [{:.3}] {}", line.score, line.text);
            }
        }

        Ok(())
    }
}
