//! Service seams for the LLM file and completion APIs.
//!
//! The dispatcher and ingestion code only see these traits; the Gemini
//! implementation lives in [`crate::llm_providers::gemini`].

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use strum_macros::Display;

/// A file registered with the LLM service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetHandle {
    /// Service-side resource name, e.g. `files/abc123`
    pub name: String,
    pub uri: String,
    pub mime_type: String,
    pub display_name: String,
}

/// Processing state of an uploaded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetState {
    Processing,
    Active,
    Failed,
    #[default]
    #[serde(other)]
    StateUnspecified,
}

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// One piece of a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    Asset(AssetHandle),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl ChatTurn {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Role::User,
            parts,
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            parts: vec![Part::Text(text.into())],
        }
    }
}

/// A stateless generation call carrying the whole conversation
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub system_instruction: Option<&'a str>,
    pub history: &'a [ChatTurn],
}

/// Text completion over a conversation
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, ServiceError>;
}

/// Upload and readiness polling for source documents
#[async_trait]
pub trait IngestionService: Send + Sync {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<AssetHandle, ServiceError>;

    async fn poll_status(&self, handle: &AssetHandle) -> Result<AssetState, ServiceError>;
}
