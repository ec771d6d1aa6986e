use crate::common::CommonParams;
use crate::config::{API_KEY_ENV, Config};
use crate::dispatch;
use crate::error::RunError;
use crate::llm::CompletionService;
use crate::llm_providers::GeminiClient;
use crate::pipeline::{self, FileMode, RunOptions, RunSummary, UiMode};
use crate::segment::{ContentBlock, segment};
use crate::template::{DocxTemplate, scan_tags};
use crate::ui::{self, Tone, paint};
use crate::log_debug;

use anyhow::{Context, Result};
use colored::Colorize;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Arguments of the `run` command
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub inputs: Vec<PathBuf>,
    pub template: PathBuf,
    pub output: Option<PathBuf>,
    pub file_mode: Option<FileMode>,
    pub ui_mode: Option<UiMode>,
    pub no_pdf: bool,
    pub save_responses: Option<PathBuf>,
}

/// Handle the 'run' command
pub async fn handle_run_command(common: &CommonParams, args: RunArgs) -> Result<()> {
    log_debug!("Starting 'run' with common: {:?}, args: {:?}", common, args);

    let config = common.load_config()?;
    let questions = common.resolve_questions(&config)?;
    let ui_mode = resolve_ui_mode(args.ui_mode.unwrap_or(config.run.ui_mode));

    let client = GeminiClient::new(config.gemini.clone()).map_err(|e| {
        ui::print_info(&format!(
            "Set {API_KEY_ENV} or run 'rfp-autofill config --api-key <KEY>'."
        ));
        RunError::Config(e.to_string())
    })?;
    let client = Arc::new(client);
    let completion: Arc<dyn CompletionService> = client.clone();

    let options = RunOptions {
        output: args
            .output
            .unwrap_or_else(|| pipeline::default_output_path(&args.template)),
        inputs: args.inputs,
        template: args.template,
        ui_mode,
        file_mode: args.file_mode.unwrap_or(config.run.file_mode),
        render_pdf: config.render.render_pdf && !args.no_pdf,
        save_responses: args.save_responses,
        questions,
    };

    let summary = pipeline::run(&config, &options, client.as_ref(), completion).await?;
    print_summary(&summary);
    Ok(())
}

/// Handle the 'apply' command: fill a template from saved responses
pub async fn handle_apply_command(
    common: &CommonParams,
    template: &Path,
    responses: &Path,
    output: Option<PathBuf>,
    no_pdf: bool,
) -> Result<()> {
    let config = common.load_config()?;
    let records = dispatch::load_responses(responses)?;
    let output = output.unwrap_or_else(|| pipeline::default_output_path(template));

    let summary = pipeline::apply_responses(
        &config,
        template,
        records,
        &output,
        config.render.render_pdf && !no_pdf,
        resolve_ui_mode(config.run.ui_mode),
    )
    .await?;
    print_summary(&summary);
    Ok(())
}

/// Handle the 'segment' command: show how an answer would be split
pub fn handle_segment_command(file: Option<&Path>, json: bool) -> Result<()> {
    let text = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read answer from stdin")?;
            buffer
        }
    };

    let segmented = segment(&text);
    if json {
        println!("{}", serde_json::to_string_pretty(&segmented)?);
        return Ok(());
    }

    let blocks = segmented.blocks();
    if blocks.is_empty() {
        ui::print_warning("The answer is empty.");
        return Ok(());
    }

    for block in blocks {
        match block {
            ContentBlock::Text(text) => {
                print_section_header("TEXT");
                println!("{}", text.content);
            }
            ContentBlock::Table(table) => {
                let label = format!(
                    "TABLE {}x{}{}",
                    table.column_count(),
                    table.data_rows.len(),
                    if table.is_empty() { " (skipped)" } else { "" }
                );
                print_section_header(&label);
                println!("{}", table.to_markdown());
            }
        }
        println!();
    }
    Ok(())
}

/// Handle the 'tags' command: list placeholders and question coverage
pub fn handle_tags_command(common: &CommonParams, template: &Path) -> Result<()> {
    let config = common.load_config()?;
    let questions = common.resolve_questions(&config)?;
    let document = DocxTemplate::open(template)?;
    let tags = scan_tags(&document);

    print_section_header("TEMPLATE PLACEHOLDERS");
    if tags.is_empty() {
        ui::print_warning("No <<...>> placeholders found.");
    }
    for tag in &tags {
        let asked = questions.iter().any(|item| &item.tag == tag);
        println!("  {} {}", ui::status_mark(asked), tag);
    }

    let unplaced: Vec<_> = questions
        .iter()
        .filter(|item| !tags.contains(&item.tag))
        .collect();
    if !unplaced.is_empty() {
        println!();
        print_section_header("QUESTIONS WITHOUT PLACEHOLDER");
        for item in unplaced {
            println!("  {} {}", ui::status_mark(false), item.tag);
        }
    }
    Ok(())
}

/// Handle the 'questions' command
pub fn handle_questions_command(common: &CommonParams) -> Result<()> {
    let config = common.load_config()?;
    let questions = common.resolve_questions(&config)?;

    let source = match &common.questions {
        Some(path) => path.display().to_string(),
        None if !config.questions.is_empty() => "configuration".to_string(),
        None => format!("{} set", config.question_set),
    };
    print_section_header(&format!("QUESTIONS ({source})"));

    for (index, item) in questions.iter().enumerate() {
        println!(
            "{:>3}. {}\n     {}",
            index + 1,
            paint(&item.tag, Tone::Tag),
            paint(&item.question, Tone::Muted)
        );
    }
    Ok(())
}

/// Values the 'config' command may change
#[derive(Debug, Clone, Default)]
pub struct ConfigChanges {
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub converter: Option<String>,
    pub ui_mode: Option<UiMode>,
    pub file_mode: Option<FileMode>,
}

impl ConfigChanges {
    fn is_empty(&self) -> bool {
        self.api_key.is_none()
            && self.temperature.is_none()
            && self.max_output_tokens.is_none()
            && self.converter.is_none()
            && self.ui_mode.is_none()
            && self.file_mode.is_none()
    }
}

/// Handle the 'config' command
pub fn handle_config_command(common: &CommonParams, changes: ConfigChanges) -> Result<()> {
    log_debug!("Starting 'config' command with common: {:?}", common);

    let path = match &common.config_path {
        Some(path) => path.clone(),
        None => Config::get_config_path()?,
    };
    let mut config = if path.exists() {
        Config::load_from(&path)?
    } else {
        Config::default()
    };

    let mut changes_made = common.apply_to_config(&mut config);
    if !changes.is_empty() {
        config.update(
            changes.api_key,
            changes.temperature,
            changes.max_output_tokens,
            changes.converter,
            changes.ui_mode,
            changes.file_mode,
        );
        changes_made = true;
    }

    if changes_made {
        config.save_to(&path)?;
        ui::print_success("Configuration updated successfully.");
        ui::print_newline();
    }

    print_configuration(&config, &path);
    Ok(())
}

fn resolve_ui_mode(mode: UiMode) -> UiMode {
    if ui::is_quiet_mode() {
        UiMode::None
    } else {
        mode
    }
}

fn print_summary(summary: &RunSummary) {
    ui::print_newline();
    ui::print_success(&format!("Filled document: {}", summary.document.display()));
    if let Some(pdf) = &summary.pdf {
        ui::print_success(&format!("PDF rendering:   {}", pdf.display()));
    }
    ui::print_info(&format!(
        "{} answer(s) applied, {} table(s) inserted",
        summary.responses.len(),
        summary.report.tables_inserted()
    ));
    if !summary.report.is_complete() {
        ui::print_warning("Some placeholders were not filled; check the warnings above.");
    }
}

fn print_configuration(config: &Config, path: &Path) {
    println!();
    println!("{}", paint("RFP-AUTOFILL CONFIGURATION", Tone::Heading));
    println!();

    print_section_header("GEMINI");
    let key_state = if std::env::var(API_KEY_ENV).is_ok() {
        format!("from {API_KEY_ENV}")
    } else if config.gemini.api_key.is_empty() {
        "not set".to_string()
    } else {
        "stored".to_string()
    };
    print_config_row("API Key", &key_state, Tone::Secret, false);
    print_config_row("Model", &config.gemini.model, Tone::Value, true);
    print_config_row(
        "Temperature",
        &config.gemini.temperature.to_string(),
        Tone::Value,
        false,
    );
    print_config_row(
        "Max Tokens",
        &config.gemini.max_output_tokens.to_string(),
        Tone::Value,
        false,
    );

    println!();
    print_section_header("RUN");
    print_config_row("UI Mode", &config.run.ui_mode.to_string(), Tone::Tag, false);
    print_config_row("File Mode", &config.run.file_mode.to_string(), Tone::Tag, false);
    let questions = if config.questions.is_empty() {
        format!("{} set", config.question_set)
    } else {
        format!("{} custom", config.questions.len())
    };
    print_config_row("Questions", &questions, Tone::Tag, false);
    print_config_row(
        "Poll",
        &format!(
            "every {}s, up to {}s",
            config.ingestion.poll_interval_seconds, config.ingestion.max_wait_seconds
        ),
        Tone::Muted,
        false,
    );

    println!();
    print_section_header("RENDER");
    print_config_row("Converter", &config.render.converter, Tone::Value, false);
    let (pdf, color) = if config.render.render_pdf {
        ("enabled", Tone::Good)
    } else {
        ("disabled", Tone::Muted)
    };
    print_config_row("PDF", pdf, color, false);

    println!();
    println!("{}", paint(&path.display().to_string(), Tone::Muted));
    println!();
}

fn print_section_header(name: &str) {
    println!("{}", ui::section_header(name));
}

fn print_config_row(label: &str, value: &str, tone: Tone, highlight: bool) {
    let value = paint(value, tone);
    let value = if highlight { value.bold() } else { value };
    println!("{}  {value}", paint(&format!("{label:>12}"), Tone::Muted));
}
