//! One fill run: template check, ingestion, dispatch, fill, save, render.
//!
//! The interactive and unattended variants share this code and differ only in
//! [`RunOptions`].

use crate::config::Config;
use crate::dispatch::{self, DispatchProgress, QueryDispatcher, ResponseRecord};
use crate::error::RunError;
use crate::ingest::{self, PollSettings};
use crate::llm::{CompletionService, IngestionService};
use crate::questions::QueryItem;
use crate::render::PdfRenderer;
use crate::template::{Answer, DocxTemplate, FillReport, TemplateSurface, fill_in_place};
use crate::{log_info, log_warn, trace_debug, trace_info, ui};

use clap::ValueEnum;
use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use strum_macros::Display;

/// Whether the run talks to the terminal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UiMode {
    /// Logs and errors only
    None,
    /// Spinners, progress and answer echo
    #[default]
    Interactive,
}

/// How many source documents a run accepts
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FileMode {
    /// Exactly one tender document
    Single,
    /// Any number of tender documents
    #[default]
    Multi,
}

/// Everything a run needs besides the services
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub inputs: Vec<PathBuf>,
    pub template: PathBuf,
    pub output: PathBuf,
    pub ui_mode: UiMode,
    pub file_mode: FileMode,
    pub render_pdf: bool,
    /// Write the collected answers here as JSON
    pub save_responses: Option<PathBuf>,
    pub questions: Vec<QueryItem>,
}

/// Artifacts and diagnostics of a finished run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub responses: Vec<ResponseRecord>,
    pub report: FillReport,
    pub document: PathBuf,
    pub pdf: Option<PathBuf>,
}

/// `<template dir>/<template stem>_filled.docx`
pub fn default_output_path(template: &Path) -> PathBuf {
    let stem = template
        .file_stem()
        .map_or_else(|| "proposal".to_string(), |s| s.to_string_lossy().into_owned());
    template.with_file_name(format!("{stem}_filled.docx"))
}

/// Terminal feedback that disappears in `UiMode::None`
struct Reporter {
    mode: UiMode,
}

impl Reporter {
    fn interactive(&self) -> bool {
        self.mode == UiMode::Interactive
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        if self.interactive() {
            ui::create_spinner(message)
        } else {
            ProgressBar::hidden()
        }
    }

    fn info(&self, message: &str) {
        if self.interactive() {
            ui::print_info(message);
        }
    }

    fn warning(&self, message: &str) {
        if self.interactive() {
            ui::print_warning(message);
        }
    }
}

/// Run the whole pipeline against the given services
pub async fn run(
    config: &Config,
    options: &RunOptions,
    ingestion: &dyn IngestionService,
    completion: Arc<dyn CompletionService>,
) -> Result<RunSummary, RunError> {
    let reporter = Reporter {
        mode: options.ui_mode,
    };
    let started = Instant::now();
    trace_info!("Starting fill run with {} input(s)", options.inputs.len());

    // A broken template must fail before anything is uploaded
    let mut template = DocxTemplate::open(&options.template)?;
    check_coverage(&template, &options.questions, &reporter);

    let renderer = PdfRenderer::from_config(&config.render);
    let scratch = tempfile::tempdir()?;

    let spinner = reporter.spinner("Preparing documents...");
    let prepared =
        ingest::prepare_inputs(&options.inputs, options.file_mode, &renderer, scratch.path())
            .await;
    let prepared = finish_spinner(spinner, prepared)?;

    let spinner = reporter.spinner("Uploading documents...");
    let handles = ingest::upload_all(ingestion, &prepared).await;
    let handles = finish_spinner(spinner, handles)?;
    for handle in &handles {
        reporter.info(&format!("Uploaded file '{}' as: {}", handle.display_name, handle.uri));
    }

    let spinner = reporter.spinner("Waiting for file processing...");
    let settings = PollSettings {
        interval: config.poll_interval(),
        max_wait: config.max_wait(),
    };
    let ready = ingest::wait_for_active(ingestion, &handles, settings).await;
    finish_spinner(spinner, ready)?;
    trace_debug!("Ingestion finished after {:?}", started.elapsed());

    let dispatcher = QueryDispatcher::new(
        completion,
        Some(config.gemini.system_instruction.clone()),
    );
    let spinner = reporter.spinner("Querying documents...");
    let responses = dispatcher
        .dispatch(&handles, &options.questions, |progress: DispatchProgress<'_>| {
            spinner.set_message(format!(
                "Sending question {}/{}: {}",
                progress.index, progress.total, progress.item.question
            ));
        })
        .await;
    let responses = finish_spinner(spinner, responses)?;

    if reporter.interactive() {
        for record in &responses {
            ui::print_message(&format!("Q: {}", record.question));
            ui::print_bordered_content(&record.raw_text);
        }
    }

    if let Some(path) = &options.save_responses {
        dispatch::save_responses(path, &responses)?;
        reporter.info(&format!("Responses saved to {}", path.display()));
    }

    let summary = complete(
        &mut template,
        responses,
        &options.output,
        options.render_pdf.then_some(&renderer),
        &reporter,
    )
    .await?;

    trace_info!(
        "Run finished in {:?}: {} answer(s), {} table(s) inserted",
        started.elapsed(),
        summary.responses.len(),
        summary.report.tables_inserted()
    );
    Ok(summary)
}

/// Fill a template from previously saved answers, without any service calls
pub async fn apply_responses(
    config: &Config,
    template_path: &Path,
    responses: Vec<ResponseRecord>,
    output: &Path,
    render_pdf: bool,
    ui_mode: UiMode,
) -> Result<RunSummary, RunError> {
    let reporter = Reporter { mode: ui_mode };
    let mut template = DocxTemplate::open(template_path)?;
    let renderer = PdfRenderer::from_config(&config.render);

    complete(
        &mut template,
        responses,
        output,
        render_pdf.then_some(&renderer),
        &reporter,
    )
    .await
}

/// Fill, save and optionally render
async fn complete(
    template: &mut DocxTemplate,
    responses: Vec<ResponseRecord>,
    output: &Path,
    renderer: Option<&PdfRenderer>,
    reporter: &Reporter,
) -> Result<RunSummary, RunError> {
    let answers: Vec<Answer> = responses.iter().map(Answer::from_record).collect();
    let report = fill_in_place(template, &answers);

    for tag in report.missing_tags() {
        reporter.warning(&format!("Tag {tag} was not found in the template"));
    }
    for tag in report.residual_tags() {
        reporter.warning(&format!("Tag {tag} is still present in the output"));
    }

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    template.save(output)?;
    log_info!("Template filled and saved to {}", output.display());

    let pdf = match renderer {
        Some(renderer) => {
            let spinner = reporter.spinner("Rendering PDF...");
            let out_dir = output
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let rendered = renderer.convert_to_pdf(output, out_dir).await;
            Some(finish_spinner(spinner, rendered)?)
        }
        None => None,
    };

    Ok(RunSummary {
        responses,
        report,
        document: output.to_path_buf(),
        pdf,
    })
}

/// Warn about questions whose tag the template never mentions
fn check_coverage<S: TemplateSurface>(template: &S, questions: &[QueryItem], reporter: &Reporter) {
    for item in questions {
        if !template.contains_text(&item.tag) {
            log_warn!("Template has no placeholder for {}", item.tag);
            reporter.warning(&format!(
                "Template has no placeholder for {}, its answer will not appear",
                item.tag
            ));
        }
    }
}

fn finish_spinner<T>(spinner: ProgressBar, result: Result<T, RunError>) -> Result<T, RunError> {
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("/docs/Proposal_Template.docx")),
            PathBuf::from("/docs/Proposal_Template_filled.docx")
        );
    }

    #[test]
    fn test_modes_parse_lowercase() {
        assert_eq!(UiMode::from_str("none", true).ok(), Some(UiMode::None));
        assert_eq!(FileMode::from_str("single", true).ok(), Some(FileMode::Single));
        assert_eq!(FileMode::default().to_string(), "multi");
    }
}
