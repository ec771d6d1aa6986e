//! rfp-autofill - answers tender questions with Gemini and writes them into proposal templates
//!
//! The library covers the whole run: document ingestion, sequential question
//! dispatch, segmentation of answers into text and tables, and filling `.docx`
//! templates at `<<Tag>>` placeholders.

// Allow certain clippy warnings that are stylistic
#![allow(clippy::uninlined_format_args)] // Style preference
#![allow(clippy::format_push_string)] // Performance improvement but stylistic
#![allow(clippy::return_self_not_must_use)] // Builder pattern is clear enough
#![allow(clippy::items_after_statements)] // Locally-scoped use statements are fine
#![allow(clippy::too_many_arguments)] // Some functions legitimately need many params

pub mod cli;
pub mod commands;
pub mod common;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod llm_providers;
pub mod logger;
pub mod pipeline;
pub mod questions;
pub mod render;
pub mod segment;
pub mod template;
pub mod ui;

// Re-export important structs and functions for easier testing
pub use config::Config;
pub use dispatch::{QueryDispatcher, ResponseRecord};
pub use error::{RunError, ServiceError};
pub use pipeline::{FileMode, RunOptions, RunSummary, UiMode};
pub use questions::QueryItem;
pub use segment::{ContentBlock, SegmentedResponse, TableBlock, TextBlock, segment};
pub use template::{Answer, DocxTemplate, FillReport, TemplateDocument, fill, fill_in_place};
