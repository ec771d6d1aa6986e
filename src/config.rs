use crate::log_debug;
use crate::pipeline::{FileMode, UiMode};
use crate::questions::{QueryItem, QuestionSet};

use anyhow::{Context, Result, anyhow};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable consulted before the stored API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Default system instruction sent with every conversation
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "You are an expert file search assistant. Provide concise and structured responses based solely on the provided content and the query's requirements. \
Do not ignore related content to the query as the information is very critical. If asked to list out details about anything make sure to include all the data related to it. \
Avoid including example information, formulas, or unnecessary details in your answers. Make sure to include tabular information wherever detected.";

/// Configuration structure for rfp-autofill
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct Config {
    /// Built-in question set used when no custom questions are configured
    #[serde(default)]
    pub question_set: QuestionSet,
    /// Gemini connection and generation settings
    #[serde(default)]
    pub gemini: GeminiConfig,
    /// Upload readiness polling
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Output rendering
    #[serde(default)]
    pub render: RenderConfig,
    /// Defaults for `run`
    #[serde(default)]
    pub run: RunDefaults,
    /// Custom questions, replacing the built-in set when non-empty
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<QueryItem>,
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct GeminiConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_system_instruction")]
    pub system_instruction: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_top_k(),
            max_output_tokens: default_max_output_tokens(),
            system_instruction: default_system_instruction(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl GeminiConfig {
    /// API key from the environment, falling back to the stored one
    pub fn effective_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| Some(self.api_key.clone()).filter(|key| !key.is_empty()))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct IngestionConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Upper bound on waiting for a single asset to become active
    #[serde(default = "default_max_wait")]
    pub max_wait_seconds: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: default_poll_interval(),
            max_wait_seconds: default_max_wait(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct RenderConfig {
    /// Office binary used for `.docx` to PDF conversion
    #[serde(default = "default_converter")]
    pub converter: String,
    #[serde(default = "default_true")]
    pub render_pdf: bool,
    #[serde(default = "default_converter_timeout")]
    pub converter_timeout_seconds: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            converter: default_converter(),
            render_pdf: true,
            converter_timeout_seconds: default_converter_timeout(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct RunDefaults {
    #[serde(default)]
    pub ui_mode: UiMode,
    #[serde(default)]
    pub file_mode: FileMode,
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_top_p() -> f32 {
    0.95
}

fn default_top_k() -> u32 {
    40
}

fn default_max_output_tokens() -> u32 {
    8192
}

fn default_system_instruction() -> String {
    DEFAULT_SYSTEM_INSTRUCTION.to_string()
}

fn default_request_timeout() -> u64 {
    300
}

fn default_poll_interval() -> u64 {
    10
}

fn default_max_wait() -> u64 {
    900
}

fn default_converter() -> String {
    "soffice".to_string()
}

fn default_converter_timeout() -> u64 {
    180
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the personal configuration, or defaults if none is saved yet
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            log_debug!("No configuration at {}, using defaults", config_path.display());
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            anyhow!(
                "Invalid configuration file format: {}. Please check {} for syntax errors.",
                e,
                path.display()
            )
        })?;
        log_debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the configuration to the personal config file
    pub fn save(&self) -> Result<()> {
        let config_path = Self::get_config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        log_debug!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let mut path =
            config_dir().ok_or_else(|| anyhow!("Unable to determine config directory"))?;
        path.push("rfp-autofill");
        fs::create_dir_all(&path)?;
        path.push("config.toml");
        Ok(path)
    }

    /// Questions for this run: custom ones if configured, otherwise the selected set
    pub fn effective_questions(&self) -> Vec<QueryItem> {
        if self.questions.is_empty() {
            self.question_set.items()
        } else {
            self.questions.clone()
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.ingestion.poll_interval_seconds)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.ingestion.max_wait_seconds)
    }

    /// Update the configuration with new values
    pub fn update(
        &mut self,
        api_key: Option<String>,
        temperature: Option<f32>,
        max_output_tokens: Option<u32>,
        converter: Option<String>,
        ui_mode: Option<UiMode>,
        file_mode: Option<FileMode>,
    ) {
        if let Some(key) = api_key {
            self.gemini.api_key = key;
        }
        if let Some(temperature) = temperature {
            self.gemini.temperature = temperature;
        }
        if let Some(tokens) = max_output_tokens {
            self.gemini.max_output_tokens = tokens;
        }
        if let Some(converter) = converter {
            self.render.converter = converter;
        }
        if let Some(mode) = ui_mode {
            self.run.ui_mode = mode;
        }
        if let Some(mode) = file_mode {
            self.run.file_mode = mode;
        }
        log_debug!("Configuration updated");
    }
}
