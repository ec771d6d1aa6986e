#![allow(dead_code)]

use async_trait::async_trait;
use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
use parking_lot::Mutex;
use rfp_autofill::llm::{
    AssetHandle, AssetState, ChatTurn, CompletionService, GenerateRequest, IngestionService,
};
use rfp_autofill::template::DocxTemplate;
use rfp_autofill::ServiceError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

/// Completion service answering from a fixed script, in order
pub struct ScriptedCompletion {
    answers: Mutex<VecDeque<Result<String, ServiceError>>>,
    /// Snapshot of the history sent with every call
    pub requests: Mutex<Vec<Vec<ChatTurn>>>,
    pub system_instructions: Mutex<Vec<Option<String>>>,
}

impl ScriptedCompletion {
    pub fn new(answers: Vec<Result<String, ServiceError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
            system_instructions: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(answers: &[&str]) -> Self {
        Self::new(answers.iter().map(|a| Ok((*a).to_string())).collect())
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn generate(&self, request: GenerateRequest<'_>) -> Result<String, ServiceError> {
        self.requests.lock().push(request.history.to_vec());
        self.system_instructions
            .lock()
            .push(request.system_instruction.map(str::to_string));
        self.answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::Protocol("script exhausted".to_string())))
    }
}

/// Ingestion service whose files walk through a fixed list of states
pub struct ScriptedIngestion {
    states: Mutex<VecDeque<AssetState>>,
    pub uploaded: Mutex<Vec<(PathBuf, String)>>,
    pub polls: Mutex<usize>,
    fail_upload: bool,
}

impl ScriptedIngestion {
    pub fn with_states(states: &[AssetState]) -> Self {
        Self {
            states: Mutex::new(states.iter().copied().collect()),
            uploaded: Mutex::new(Vec::new()),
            polls: Mutex::new(0),
            fail_upload: false,
        }
    }

    pub fn ready() -> Self {
        Self::with_states(&[])
    }

    pub fn failing_upload() -> Self {
        Self {
            fail_upload: true,
            ..Self::ready()
        }
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock()
    }
}

#[async_trait]
impl IngestionService for ScriptedIngestion {
    async fn upload(&self, path: &Path, mime_type: &str) -> Result<AssetHandle, ServiceError> {
        if self.fail_upload {
            return Err(ServiceError::Api {
                status: 400,
                body: "bad file".to_string(),
            });
        }
        let mut uploaded = self.uploaded.lock();
        uploaded.push((path.to_path_buf(), mime_type.to_string()));
        Ok(handle(uploaded.len()))
    }

    async fn poll_status(&self, _handle: &AssetHandle) -> Result<AssetState, ServiceError> {
        *self.polls.lock() += 1;
        // Once the script runs out every file reports active
        Ok(self.states.lock().pop_front().unwrap_or(AssetState::Active))
    }
}

pub fn handle(n: usize) -> AssetHandle {
    AssetHandle {
        name: format!("files/doc{n}"),
        uri: format!("https://files.example/doc{n}"),
        mime_type: "application/pdf".to_string(),
        display_name: format!("tender{n}.pdf"),
    }
}

pub fn paragraph(text: &str) -> Paragraph {
    Paragraph::new().add_run(Run::new().add_text(text))
}

/// A table whose cells each hold one paragraph of text
pub fn table(rows: &[&[&str]]) -> Table {
    Table::new(
        rows.iter()
            .map(|row| {
                TableRow::new(
                    row.iter()
                        .map(|text| TableCell::new().add_paragraph(paragraph(text)))
                        .collect(),
                )
            })
            .collect(),
    )
}

/// The proposal skeleton used across tests
pub fn proposal_docx() -> Docx {
    Docx::new()
        .add_paragraph(paragraph("1. Scope of Supply"))
        .add_paragraph(paragraph("<<Scope of Assets>>"))
        .add_paragraph(paragraph("2. Modules"))
        .add_paragraph(paragraph("Modules offered: <<Modules>>"))
        .add_table(table(&[
            &["Item", "Value"],
            &["Training", "<<Training Days>> days"],
        ]))
        .add_paragraph(paragraph("End of document"))
}

pub fn proposal_template() -> DocxTemplate {
    DocxTemplate::from_docx(proposal_docx())
}

/// Writes the proposal skeleton as a `.docx` file
pub fn write_proposal(dir: &Path) -> PathBuf {
    let path = dir.join("template.docx");
    proposal_template()
        .save(&path)
        .expect("Failed to write template");
    path
}
