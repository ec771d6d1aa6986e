//! Sequential question dispatch over one conversation.

use crate::error::RunError;
use crate::llm::{AssetHandle, ChatTurn, CompletionService, GenerateRequest, Part};
use crate::questions::QueryItem;
use crate::{log_debug, log_info};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// The answer collected for one question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question: String,
    pub tag: String,
    pub raw_text: String,
}

/// Progress notification emitted before each question is sent
#[derive(Debug, Clone, Copy)]
pub struct DispatchProgress<'a> {
    /// 1-based position of the question
    pub index: usize,
    pub total: usize,
    pub item: &'a QueryItem,
}

/// Conversation history plus the system instruction it runs under
pub struct ChatSession {
    system_instruction: Option<String>,
    history: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new(system_instruction: Option<String>) -> Self {
        Self {
            system_instruction: system_instruction.filter(|text| !text.trim().is_empty()),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatTurn] {
        &self.history
    }

    /// Send one user message and record the reply.
    ///
    /// On failure the user turn is removed again so the history only holds
    /// completed exchanges.
    pub async fn send_message(
        &mut self,
        service: &dyn CompletionService,
        parts: Vec<Part>,
    ) -> Result<String, RunError> {
        self.history.push(ChatTurn::user(parts));
        let request = GenerateRequest {
            system_instruction: self.system_instruction.as_deref(),
            history: &self.history,
        };

        let result = service.generate(request).await;

        match result {
            Ok(text) => {
                self.history.push(ChatTurn::model(text.clone()));
                Ok(text)
            }
            Err(err) => {
                self.history.pop();
                Err(RunError::ServiceCall(err))
            }
        }
    }
}

/// Asks every question against the uploaded assets, one at a time
pub struct QueryDispatcher {
    service: Arc<dyn CompletionService>,
    system_instruction: Option<String>,
}

impl QueryDispatcher {
    pub fn new(service: Arc<dyn CompletionService>, system_instruction: Option<String>) -> Self {
        Self {
            service,
            system_instruction,
        }
    }

    /// Dispatch all questions in order; the first failed call aborts the run
    pub async fn dispatch<F>(
        &self,
        assets: &[AssetHandle],
        items: &[QueryItem],
        mut on_progress: F,
    ) -> Result<Vec<ResponseRecord>, RunError>
    where
        F: FnMut(DispatchProgress<'_>),
    {
        let mut session = ChatSession::new(self.system_instruction.clone());
        let mut records = Vec::with_capacity(items.len());

        for (position, item) in items.iter().enumerate() {
            on_progress(DispatchProgress {
                index: position + 1,
                total: items.len(),
                item,
            });
            log_debug!("Asking for {}: {}", item.tag, item.question);

            // Every message carries all asset references ahead of the question
            let mut parts: Vec<Part> = assets.iter().cloned().map(Part::Asset).collect();
            parts.push(Part::Text(item.question.clone()));

            let answer = session.send_message(self.service.as_ref(), parts).await?;
            records.push(ResponseRecord {
                question: item.question.clone(),
                tag: item.tag.clone(),
                raw_text: answer.trim().to_string(),
            });
        }

        log_info!("Collected {} response(s)", records.len());
        Ok(records)
    }
}

pub fn save_responses(path: &Path, records: &[ResponseRecord]) -> Result<(), RunError> {
    let json = serde_json::to_string_pretty(records).map_err(std::io::Error::from)?;
    std::fs::write(path, json)?;
    log_debug!("Saved {} response(s) to {}", records.len(), path.display());
    Ok(())
}

pub fn load_responses(path: &Path) -> anyhow::Result<Vec<ResponseRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read responses from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid responses file {}", path.display()))
}
