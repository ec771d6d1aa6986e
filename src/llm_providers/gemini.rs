use crate::config::GeminiConfig;
use crate::error::ServiceError;
use crate::llm::{
    AssetHandle, AssetState, ChatTurn, CompletionService, GenerateRequest, IngestionService, Part,
};
use crate::{log_debug, log_warn};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;

/// Gemini client covering the Files API and `generateContent`
pub struct GeminiClient {
    config: GeminiConfig,
    api_key: String,
    client: Client,
}

impl GeminiClient {
    /// Creates a client; fails when no API key is configured
    pub fn new(config: GeminiConfig) -> Result<Self, ServiceError> {
        let api_key = config
            .effective_api_key()
            .ok_or(ServiceError::MissingApiKey)?;
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Builds the `generateContent` body for a conversation
    pub fn request_body(&self, request: GenerateRequest<'_>) -> serde_json::Value {
        let body = GenerateContentRequest {
            system_instruction: request
                .system_instruction
                .filter(|instruction| !instruction.trim().is_empty())
                .map(|instruction| WireContent {
                    role: None,
                    parts: vec![WirePart::text(instruction)],
                }),
            contents: request.history.iter().map(WireContent::from_turn).collect(),
            generation_config: GenerationConfig {
                temperature: self.config.temperature,
                top_p: self.config.top_p,
                top_k: self.config.top_k,
                max_output_tokens: self.config.max_output_tokens,
                response_mime_type: "text/plain".to_string(),
            },
        };
        serde_json::to_value(body).unwrap_or_else(|_| json!({}))
    }
}

#[async_trait]
impl CompletionService for GeminiClient {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, ServiceError> {
        log_debug!(
            "Calling {} with {} conversation turn(s)",
            self.config.model,
            request.history.len()
        );

        let url = self.endpoint(&format!(
            "v1beta/models/{}:generateContent",
            self.config.model
        ));
        let response = self
            .client
            .post(url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(request))
            .send()
            .await?;

        let body: GenerateContentResponse = ensure_success(response).await?.json().await?;
        extract_text(body)
    }
}

#[async_trait]
impl IngestionService for GeminiClient {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<AssetHandle, ServiceError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ServiceError::Protocol(format!("Cannot read {}: {e}", path.display())))?;
        let display_name = path
            .file_name()
            .map_or_else(|| "document".to_string(), |name| name.to_string_lossy().into_owned());

        log_debug!(
            "Starting upload of {} ({} bytes, {})",
            display_name,
            bytes.len(),
            mime_type
        );

        // Resumable protocol: a start request yields the upload URL, then one
        // request uploads the bytes and finalizes the file.
        let start = self
            .client
            .post(self.endpoint("upload/v1beta/files"))
            .query(&[("key", self.api_key.as_str())])
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", mime_type)
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;
        let start = ensure_success(start).await?;

        let upload_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ServiceError::Protocol("Upload URL missing from response".to_string()))?
            .to_string();

        let finished = self
            .client
            .post(upload_url)
            .header("Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        let envelope: FileEnvelope = ensure_success(finished).await?.json().await?;
        let handle = envelope.file.into_handle(mime_type);
        log_debug!("Uploaded {} as {}", handle.display_name, handle.uri);
        Ok(handle)
    }

    async fn poll_status(&self, handle: &AssetHandle) -> Result<AssetState, ServiceError> {
        let response = self
            .client
            .get(self.endpoint(&format!("v1beta/{}", handle.name)))
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let file: WireFile = ensure_success(response).await?.json().await?;
        if let Some(error) = &file.error {
            log_warn!("File {} reported an error: {}", handle.name, error.message);
        }
        Ok(file.state)
    }
}

async fn ensure_success(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Api {
        status: status.as_u16(),
        body,
    })
}

/// Concatenates the text parts of the first candidate
fn extract_text(body: GenerateContentResponse) -> Result<String, ServiceError> {
    let Some(candidate) = body.candidates.into_iter().next() else {
        let reason = body
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(ServiceError::Blocked(reason));
    };

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    match candidate.finish_reason.as_deref() {
        None | Some("STOP" | "MAX_TOKENS") => Ok(text),
        Some(reason) if text.is_empty() => Err(ServiceError::Blocked(reason.to_string())),
        Some(reason) => {
            log_warn!("Candidate finished with {}, keeping partial text", reason);
            Ok(text)
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<WireContent>,
    contents: Vec<WireContent>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
    response_mime_type: String,
}

#[derive(Serialize, Deserialize, Default)]
struct WireContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<WirePart>,
}

impl WireContent {
    fn from_turn(turn: &ChatTurn) -> Self {
        Self {
            role: Some(turn.role.to_string()),
            parts: turn
                .parts
                .iter()
                .map(|part| match part {
                    Part::Text(text) => WirePart::text(text),
                    Part::Asset(asset) => WirePart {
                        text: None,
                        file_data: Some(FileData {
                            mime_type: asset.mime_type.clone(),
                            file_uri: asset.uri.clone(),
                        }),
                    },
                })
                .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct WirePart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

impl WirePart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            file_data: None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<WireContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct FileEnvelope {
    file: WireFile,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireFile {
    name: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    state: AssetState,
    error: Option<WireStatus>,
}

impl WireFile {
    fn into_handle(self, requested_mime: &str) -> AssetHandle {
        AssetHandle {
            mime_type: if self.mime_type.is_empty() {
                requested_mime.to_string()
            } else {
                self.mime_type
            },
            name: self.name,
            uri: self.uri,
            display_name: self.display_name,
        }
    }
}

#[derive(Deserialize)]
struct WireStatus {
    #[serde(default)]
    message: String,
}
