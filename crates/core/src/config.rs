//! Configuration management for PostApply.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Defaults
//! - Config files (.postapply/config.yaml)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric: the corpus directory and the index
//! snapshot are resolved relative to the workspace root unless absolute.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Generation providers the factory knows how to build.
pub const KNOWN_LLM_PROVIDERS: [&str; 2] = ["ollama", "echo"];

/// Embedding providers the factory knows how to build.
pub const KNOWN_EMBEDDING_PROVIDERS: [&str; 2] = ["hashed", "ollama"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .postapply/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Text generation settings
    pub llm: LlmSettings,

    /// Embedding settings
    pub embedding: EmbeddingSettings,

    /// Corpus, chunking and retrieval settings
    pub knowledge: KnowledgeSettings,
}

/// Text generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LlmSettings {
    /// Provider identifier ("ollama", "echo")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Default completion budget
    pub max_tokens: u32,

    /// Default sampling temperature
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(), // Local-first default
            model: "llama3.2".to_string(),
            endpoint: None,
            timeout_secs: 60,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmbeddingSettings {
    /// Provider identifier ("hashed", "ollama")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Vector dimension
    pub dimensions: usize,

    /// Texts per embed_batch call during index build
    pub batch_size: usize,

    /// Custom endpoint URL
    pub endpoint: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hashed".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: 384,
            batch_size: 32,
            endpoint: None,
            timeout_secs: 30,
        }
    }
}

/// Corpus and retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KnowledgeSettings {
    /// Directory of text documents
    pub corpus_dir: PathBuf,

    /// Index snapshot file
    pub snapshot_path: PathBuf,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks
    pub chunk_overlap: usize,

    /// Default number of chunks retrieved per query
    pub top_k: usize,

    /// File extensions loaded from the corpus directory
    pub extensions: Vec<String>,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("knowledge_base"),
            snapshot_path: PathBuf::from(".postapply/index/snapshot.bin"),
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 3,
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSettings>,
    embedding: Option<EmbeddingSettings>,
    knowledge: Option<KnowledgeSettings>,
    workspace: Option<WorkspaceConfig>,
    logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WorkspaceConfig {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingConfig {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            log_level: None,
            verbose: false,
            no_color: false,
            llm: LlmSettings::default(),
            embedding: EmbeddingSettings::default(),
            knowledge: KnowledgeSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and environment variables.
    ///
    /// Environment variables:
    /// - `POSTAPPLY_WORKSPACE`: Override workspace path
    /// - `POSTAPPLY_CONFIG`: Path to config file
    /// - `POSTAPPLY_PROVIDER`: Generation provider
    /// - `POSTAPPLY_MODEL`: Generation model
    /// - `POSTAPPLY_EMBEDDING_MODEL`: Embedding model
    /// - `POSTAPPLY_ENDPOINT`: Generation endpoint
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use postapply_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load() -> AppResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("POSTAPPLY_WORKSPACE") {
            config.workspace = PathBuf::from(workspace);
        }

        if let Ok(config_file) = std::env::var("POSTAPPLY_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = match config.config_file {
            Some(ref cf) => cf.clone(),
            None => config.postapply_dir().join("config.yaml"),
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("POSTAPPLY_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("POSTAPPLY_MODEL") {
            config.llm.model = model;
        }

        if let Ok(model) = std::env::var("POSTAPPLY_EMBEDDING_MODEL") {
            config.embedding.model = model;
        }

        if let Ok(endpoint) = std::env::var("POSTAPPLY_ENDPOINT") {
            config.llm.endpoint = Some(endpoint);
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(ws) = config_file.workspace {
            if let Some(path) = ws.path {
                result.workspace = PathBuf::from(path);
            }
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = config_file.llm {
            result.llm = llm;
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(knowledge) = config_file.knowledge {
            result.knowledge = knowledge;
        }

        tracing::debug!("Merged config file {:?}", path);
        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over environment variables and the config file.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.llm.provider = provider;
        }

        if let Some(model) = model {
            self.llm.model = model;
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

    /// Get the path to the .postapply directory.
    pub fn postapply_dir(&self) -> PathBuf {
        self.workspace.join(".postapply")
    }

    /// Ensure the .postapply directory exists.
    pub fn ensure_postapply_dir(&self) -> AppResult<()> {
        let dir = self.postapply_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .postapply directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Corpus directory resolved against the workspace.
    pub fn corpus_dir(&self) -> PathBuf {
        self.resolve(&self.knowledge.corpus_dir)
    }

    /// Snapshot path resolved against the workspace.
    pub fn snapshot_path(&self) -> PathBuf {
        self.resolve(&self.knowledge.snapshot_path)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.workspace.join(path)
        }
    }

    /// Validate provider names and retrieval settings.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.llm.provider,
                KNOWN_LLM_PROVIDERS.join(", ")
            )));
        }

        if !KNOWN_EMBEDDING_PROVIDERS.contains(&self.embedding.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                KNOWN_EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        let knowledge = &self.knowledge;
        if knowledge.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be positive".to_string()));
        }
        if knowledge.chunk_overlap >= knowledge.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                knowledge.chunk_overlap, knowledge.chunk_size
            )));
        }
        if knowledge.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }
        if self.embedding.dimensions == 0 || self.embedding.batch_size == 0 {
            return Err(AppError::Config(
                "embedding dimensions and batchSize must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.knowledge.chunk_size, 500);
        assert_eq!(config.knowledge.chunk_overlap, 50);
        assert_eq!(config.knowledge.top_k, 3);
        assert!(!config.verbose);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_overrides() {
        let overridden = AppConfig::default().with_overrides(
            None,
            None,
            Some("echo".to_string()),
            Some("tiny".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(overridden.llm.provider, "echo");
        assert_eq!(overridden.llm.model, "tiny");
        assert!(overridden.verbose);
        assert_eq!(overridden.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_partial_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
knowledge:
  chunkSize: 100
  chunkOverlap: 20
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.knowledge.chunk_size, 100);
        assert_eq!(merged.knowledge.chunk_overlap, 20);
        // Fields missing from the section keep their defaults
        assert_eq!(merged.knowledge.top_k, 3);
        assert_eq!(merged.log_level, Some("warn".to_string()));
        assert!(merged.no_color);
        assert_eq!(merged.llm.provider, "ollama");
    }

    #[test]
    fn test_resolve_relative_paths() {
        let mut config = AppConfig::default();
        config.workspace = PathBuf::from("/srv/career");
        assert_eq!(
            config.corpus_dir(),
            PathBuf::from("/srv/career/knowledge_base")
        );
        config.knowledge.snapshot_path = PathBuf::from("/tmp/idx.bin");
        assert_eq!(config.snapshot_path(), PathBuf::from("/tmp/idx.bin"));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.llm.provider = "unknown".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.knowledge.chunk_overlap = 500;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.knowledge.top_k = 0;
        assert!(config.validate().is_err());
    }
}
