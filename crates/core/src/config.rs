//! Configuration management for the radar assistant.
//!
//! Configuration is merged from several layers, later layers winning:
//! - Built-in defaults
//! - Config file (`.radar/config.yaml` in the workspace, or an explicit path)
//! - Environment variables
//! - Command-line flags
//!
//! Durable state (the persisted snapshot) lives under `.radar/` in the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, AppResult};
use crate::logging::LogFormat;

/// Embedding providers the index crate knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["ollama", "mock"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .radar/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Log output format ("pretty" or "json")
    pub log_format: String,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Telemetry source locations
    pub sources: SourcesConfig,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// Generation provider settings
    pub chat: ChatSettings,

    /// Background rebuild settings
    pub rebuild: RebuildSettings,

    /// Retrieval defaults
    pub retrieval: RetrievalSettings,

    /// HTTP query interface
    pub server: ServerSettings,
}

/// Locations of the two telemetry files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct SourcesConfig {
    /// Position-report file (ADS-B style `{"aircraft": [...]}`)
    pub position_reports: PathBuf,

    /// Message file (VDL2/ACARS style, object or array)
    pub messages: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            position_reports: PathBuf::from("/tmp/aircraft.json"),
            messages: PathBuf::from("/tmp/vdl2.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct EmbeddingSettings {
    /// Provider name: "ollama" or "mock"
    pub provider: String,

    /// Provider base URL
    pub endpoint: String,

    /// Embedding model identifier
    pub model: String,

    /// Vector dimension every embedding must have
    pub dimensions: usize,

    /// Maximum in-flight embedding requests during a rebuild
    pub concurrency: usize,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
            concurrency: 4,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatSettings {
    /// Generation provider name
    pub provider: String,

    /// Provider base URL
    pub endpoint: String,

    /// Default generation model
    pub model: String,

    pub temperature: f32,

    pub top_p: f32,

    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "gemma3:4b".to_string(),
            temperature: 0.7,
            top_p: 0.9,
            max_tokens: 512,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RebuildSettings {
    /// Seconds between rebuild cycles
    pub interval_secs: u64,
}

impl Default for RebuildSettings {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

impl RebuildSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RetrievalSettings {
    /// Inclusive lower bound on cosine similarity
    pub threshold: f32,

    /// Default result count for search
    pub max_results: usize,

    /// Candidate headroom for search (`max_results * multiplier`)
    pub ask_multiplier: usize,

    /// Candidate headroom for chat context retrieval
    pub chat_multiplier: usize,

    /// Default number of context lines handed to the chat model
    pub max_context: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            threshold: 0.3,
            max_results: 5,
            ask_multiplier: 3,
            chat_multiplier: 2,
            max_context: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Socket address the HTTP query interface binds to
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:11435".to_string(),
        }
    }
}

/// Full configuration file structure. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
    sources: Option<SourcesConfig>,
    embedding: Option<EmbeddingSettings>,
    chat: Option<ChatSettings>,
    rebuild: Option<RebuildSettings>,
    retrieval: Option<RetrievalSettings>,
    server: Option<ServerSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
    format: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            log_format: "pretty".to_string(),
            verbose: false,
            no_color: false,
            sources: SourcesConfig::default(),
            embedding: EmbeddingSettings::default(),
            chat: ChatSettings::default(),
            rebuild: RebuildSettings::default(),
            retrieval: RetrievalSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the config file and the environment.
    ///
    /// Environment variables:
    /// - `RADAR_WORKSPACE`: Override workspace path
    /// - `RADAR_CONFIG`: Path to config file
    /// - `RADAR_OLLAMA_URL`: Base URL for both embedding and chat providers
    /// - `RADAR_EMBED_MODEL`: Embedding model identifier
    /// - `RADAR_CHAT_MODEL`: Generation model identifier
    /// - `RADAR_ADSB_FILE` / `RADAR_VDL2_FILE`: Telemetry source paths
    /// - `RADAR_BIND`: HTTP bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use radar_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with explicit workspace/config-file paths
    /// taking precedence over their environment variables.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| env_path("RADAR_WORKSPACE")) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| env_path("RADAR_CONFIG"));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.radar_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file does not exist: {:?}",
                config_path
            )));
        }

        config.apply_env();
        Ok(config)
    }

    /// Environment variables override YAML config.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("RADAR_OLLAMA_URL") {
            self.embedding.endpoint = url.clone();
            self.chat.endpoint = url;
        }

        if let Ok(model) = std::env::var("RADAR_EMBED_MODEL") {
            self.embedding.model = model;
        }

        if let Ok(model) = std::env::var("RADAR_CHAT_MODEL") {
            self.chat.model = model;
        }

        if let Some(path) = env_path("RADAR_ADSB_FILE") {
            self.sources.position_reports = path;
        }

        if let Some(path) = env_path("RADAR_VDL2_FILE") {
            self.sources.messages = path;
        }

        if let Ok(bind) = std::env::var("RADAR_BIND") {
            self.server.bind = bind;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            self.no_color = true;
        }
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        self.merge_yaml_str(&contents).map_err(|e| match e {
            AppError::Serialization(msg) => {
                AppError::Config(format!("Failed to parse config file {:?}: {}", path, msg))
            }
            other => other,
        })
    }

    fn merge_yaml_str(&self, contents: &str) -> AppResult<Self> {
        let config_file: ConfigFile = if contents.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(contents)?
        };

        let mut result = self.clone();

        if let Some(path) = config_file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
            if let Some(format) = logging.format {
                result.log_format = format;
            }
        }

        if let Some(sources) = config_file.sources {
            result.sources = sources;
        }
        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }
        if let Some(chat) = config_file.chat {
            result.chat = chat;
        }
        if let Some(rebuild) = config_file.rebuild {
            result.rebuild = rebuild;
        }
        if let Some(retrieval) = config_file.retrieval {
            result.retrieval = retrieval;
        }
        if let Some(server) = config_file.server {
            result.server = server;
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the environment and config file.
    pub fn with_overrides(
        mut self,
        ollama_url: Option<String>,
        chat_model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(url) = ollama_url {
            self.embedding.endpoint = url.clone();
            self.chat.endpoint = url;
        }

        if let Some(model) = chat_model {
            self.chat.model = model;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Parsed log format, falling back to pretty output.
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.log_format).unwrap_or_default()
    }

    /// Get the path to the .radar directory.
    pub fn radar_dir(&self) -> PathBuf {
        self.workspace.join(".radar")
    }

    /// Directory holding the persisted snapshot pair.
    pub fn index_dir(&self) -> PathBuf {
        self.radar_dir().join("index")
    }

    /// Ensure the .radar directory exists.
    pub fn ensure_radar_dir(&self) -> AppResult<()> {
        let radar_dir = self.radar_dir();
        if !radar_dir.exists() {
            std::fs::create_dir_all(&radar_dir).map_err(|e| {
                AppError::Config(format!("Failed to create .radar directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.embedding.provider.as_str();
        if !KNOWN_EMBEDDING_PROVIDERS.contains(&provider) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be greater than zero".to_string(),
            ));
        }

        if self.embedding.concurrency == 0 {
            return Err(AppError::Config(
                "Embedding concurrency must be greater than zero".to_string(),
            ));
        }

        if self.rebuild.interval_secs == 0 {
            return Err(AppError::Config(
                "Rebuild interval must be at least one second".to_string(),
            ));
        }

        if self.retrieval.ask_multiplier == 0 || self.retrieval.chat_multiplier == 0 {
            return Err(AppError::Config(
                "Search breadth multipliers must be greater than zero".to_string(),
            ));
        }

        if !self.retrieval.threshold.is_finite() {
            return Err(AppError::Config(format!(
                "Retrieval threshold must be a finite number, got {}",
                self.retrieval.threshold
            )));
        }

        Ok(())
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    std::env::var(key).ok().map(PathBuf::from)
}
