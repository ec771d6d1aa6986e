//! The questions asked of every tender and the template tags they fill.

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use strum_macros::{Display, EnumString};

/// A question and the template placeholder its answer replaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryItem {
    pub question: String,
    pub tag: String,
}

impl QueryItem {
    pub fn new(question: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            tag: tag.into(),
        }
    }
}

/// Built-in question sets
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QuestionSet {
    /// Scope, deliverables, hardware and commercial flags
    #[default]
    Default,
    /// The default set plus customer, project and tender reference
    Extended,
}

impl QuestionSet {
    pub fn items(self) -> Vec<QueryItem> {
        let mut items = default_questions();
        if self == Self::Extended {
            items.extend(header_questions());
        }
        items
    }
}

const DEFAULT_QUESTIONS: &[(&str, &str)] = &[
    (
        "List out all the application software modules to be provided.",
        "<<Modules>>",
    ),
    (
        "List out all details of all the pipelines required to be configured in a table.",
        "<<Scope of Assets>>",
    ),
    (
        "List out all the deliverables from the APPS Vendor side.",
        "<<Deliverables>>",
    ),
    (
        "What are all the works to be performed for the customer assets?",
        "<<Work to be performed>>",
    ),
    (
        "What all hardware requirements are mentioned?",
        "<<Hardware requirement>>",
    ),
    (
        "What are the products to be covered in terms of crude, HSD, MS or so?",
        "<<Product Type>>",
    ),
    (
        "Respond only with 'Leak Sensitivity Study' if Leak sensitivity study is required or else respond with an empty space.",
        "<<Leak Sensitivity Study>>",
    ),
    (
        "Just give how many training days are required.",
        "<<Training Days>>",
    ),
    (
        "Respond only with 'Dual Redundant' if Dual redundant PipelineManager is required or else respond with an empty space.",
        "<<Dual Redundant>>",
    ),
];

const HEADER_QUESTIONS: &[(&str, &str)] = &[
    (
        "Just give the customer name which you can find in the header.",
        "<<Customer Name>>",
    ),
    (
        "Just give the project name which can be found in the header.",
        "<<Project Name>>",
    ),
    (
        "Just give the Tender No. from the footer",
        "<<Customer Ref Number>>",
    ),
];

pub fn default_questions() -> Vec<QueryItem> {
    DEFAULT_QUESTIONS
        .iter()
        .map(|(question, tag)| QueryItem::new(*question, *tag))
        .collect()
}

fn header_questions() -> Vec<QueryItem> {
    HEADER_QUESTIONS
        .iter()
        .map(|(question, tag)| QueryItem::new(*question, *tag))
        .collect()
}

#[derive(Deserialize)]
struct QuestionFile {
    questions: Vec<QueryItem>,
}

/// Load a TOML file of `[[questions]]` tables with `question` and `tag` keys
pub fn load_questions(path: &Path) -> Result<Vec<QueryItem>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read question file {}", path.display()))?;
    let file: QuestionFile = toml::from_str(&content)
        .with_context(|| format!("Invalid question file {}", path.display()))?;
    validate(&file.questions)?;
    Ok(file.questions)
}

/// Tags must be non-empty and unique, questions non-empty
pub fn validate(items: &[QueryItem]) -> Result<()> {
    let mut seen = HashSet::new();
    for item in items {
        if item.question.trim().is_empty() {
            return Err(anyhow!("Question for tag {} is empty", item.tag));
        }
        if item.tag.is_empty() {
            return Err(anyhow!("Question '{}' has no tag", item.question));
        }
        if !seen.insert(item.tag.as_str()) {
            return Err(anyhow!("Tag {} is used by more than one question", item.tag));
        }
    }
    Ok(())
}
