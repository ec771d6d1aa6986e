use std::path::PathBuf;

/// Fatal failures of a fill run
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Ingestion failed for {asset}: {reason}")]
    Ingestion { asset: String, reason: String },
    #[error("Completion service call failed: {0}")]
    ServiceCall(#[from] ServiceError),
    #[error("Failed to load template {path}: {reason}")]
    TemplateLoad { path: String, reason: String },
    #[error("Rendering failed: {0}")]
    Render(String),
    #[error("Unsupported input file {}: only .pdf and .docx are accepted", .0.display())]
    UnsupportedInput(PathBuf),
    #[error("Single-file mode accepts exactly one input, got {0}")]
    FileMode(usize),
    #[error("No input documents given: pass at least one .pdf or .docx file")]
    NoInputs,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors reported by the Gemini file and generation endpoints
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Protocol(String),
    #[error("Response blocked: {0}")]
    Blocked(String),
    #[error("API key required: set GEMINI_API_KEY or run `rfp-autofill config --api-key`")]
    MissingApiKey,
}
