use crate::commands::{self, ConfigChanges, RunArgs};
use crate::common::CommonParams;
use crate::log_debug;
use crate::pipeline::{FileMode, UiMode};
use crate::ui;
use clap::builder::{Styles, styling::AnsiColor};
use clap::{Parser, Subcommand, crate_version};
use std::path::PathBuf;

const LOG_FILE: &str = "rfp-autofill-debug.log";

/// CLI structure defining the available commands and global arguments
#[derive(Parser)]
#[command(
    author,
    version = crate_version!(),
    about = "rfp-autofill: fill proposal templates from tender documents with Gemini",
    long_about = "rfp-autofill uploads tender/RFP documents to Gemini, asks a fixed set of questions about them, \
and writes the answers (including tables) into a Word proposal template at <<Tag>> placeholders.",
    disable_version_flag = true,
    styles = get_styles(),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log debug messages to a file
    #[arg(
        short = 'l',
        long = "log",
        global = true,
        help = "Log debug messages to a file"
    )]
    pub log: bool,

    /// Specify a custom log file path
    #[arg(
        long = "log-file",
        global = true,
        help = "Specify a custom log file path"
    )]
    pub log_file: Option<String>,

    /// Suppress non-essential output (spinners, answers, etc.)
    #[arg(
        short = 'q',
        long = "quiet",
        global = true,
        help = "Suppress non-essential output"
    )]
    pub quiet: bool,

    /// Display the version
    #[arg(
        short = 'v',
        long = "version",
        global = true,
        help = "Display the version"
    )]
    pub version: bool,
}

/// Enumeration of available subcommands
#[derive(Subcommand)]
#[command(subcommand_negates_reqs = true)]
#[command(subcommand_precedence_over_arg = true)]
pub enum Commands {
    /// Query tender documents and fill the proposal template
    #[command(
        about = "Query tender documents and fill the proposal template",
        long_about = "Upload the tender documents (.pdf or .docx), ask every configured question, \
fill the template with the answers and render a PDF next to the filled document."
    )]
    Run {
        #[command(flatten)]
        common: CommonParams,

        /// Tender documents to query
        #[arg(required = true, help = "Tender documents (.pdf or .docx)")]
        inputs: Vec<PathBuf>,

        #[arg(short, long, help = "Word template containing <<Tag>> placeholders")]
        template: PathBuf,

        #[arg(
            short,
            long,
            help = "Where to write the filled document (defaults to <template>_filled.docx)"
        )]
        output: Option<PathBuf>,

        #[arg(long, value_enum, help = "Accept one document or several")]
        file_mode: Option<FileMode>,

        #[arg(long = "ui", value_enum, help = "Terminal interaction mode")]
        ui_mode: Option<UiMode>,

        #[arg(long, help = "Skip the PDF rendering")]
        no_pdf: bool,

        #[arg(long, help = "Also save the collected answers as JSON")]
        save_responses: Option<PathBuf>,
    },

    /// Fill a template from saved answers without calling Gemini
    #[command(about = "Fill a template from answers saved by 'run --save-responses'")]
    Apply {
        #[command(flatten)]
        common: CommonParams,

        #[arg(short, long, help = "Word template containing <<Tag>> placeholders")]
        template: PathBuf,

        #[arg(short, long, help = "Responses JSON file")]
        responses: PathBuf,

        #[arg(short, long, help = "Where to write the filled document")]
        output: Option<PathBuf>,

        #[arg(long, help = "Skip the PDF rendering")]
        no_pdf: bool,
    },

    /// Show how an answer is split into text and tables
    #[command(about = "Show how an answer is split into text and tables")]
    Segment {
        #[arg(help = "File holding the answer text (reads stdin when omitted)")]
        file: Option<PathBuf>,

        #[arg(long, help = "Print the segmented answer as JSON")]
        json: bool,
    },

    /// List the placeholders of a template
    #[command(about = "List template placeholders and the questions that fill them")]
    Tags {
        #[command(flatten)]
        common: CommonParams,

        #[arg(help = "Word template to inspect")]
        template: PathBuf,
    },

    /// List the active questions
    #[command(about = "List the questions that will be asked")]
    Questions {
        #[command(flatten)]
        common: CommonParams,
    },

    /// Configure rfp-autofill
    #[command(about = "Show or update the rfp-autofill configuration")]
    Config {
        #[command(flatten)]
        common: CommonParams,

        #[arg(long, help = "Store the Gemini API key")]
        api_key: Option<String>,

        #[arg(long, help = "Sampling temperature")]
        temperature: Option<f32>,

        #[arg(long, help = "Maximum output tokens per answer")]
        max_output_tokens: Option<u32>,

        #[arg(long, help = "Office binary used for PDF conversion")]
        converter: Option<String>,

        #[arg(long = "ui", value_enum, help = "Default terminal interaction mode")]
        ui_mode: Option<UiMode>,

        #[arg(long, value_enum, help = "Default file mode")]
        file_mode: Option<FileMode>,
    },
}

/// Define custom styles for Clap
fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Magenta.on_default().bold())
        .usage(AnsiColor::Cyan.on_default().bold())
        .literal(AnsiColor::Green.on_default().bold())
        .placeholder(AnsiColor::Yellow.on_default())
        .valid(AnsiColor::Blue.on_default().bold())
        .invalid(AnsiColor::Red.on_default().bold())
        .error(AnsiColor::Red.on_default().bold())
}

/// Parse the command-line arguments
pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Main function to parse arguments and handle the command
pub async fn main() -> anyhow::Result<()> {
    let cli = parse_args();

    if cli.version {
        ui::print_version(crate_version!());
        return Ok(());
    }

    if let Err(e) = crate::logger::init() {
        eprintln!("Warning: {e}");
    }
    if cli.log {
        crate::logger::enable_logging();
        let log_file = cli.log_file.as_deref().unwrap_or(LOG_FILE);
        crate::logger::set_log_file(log_file)?;
        log_debug!("Logging to {}", log_file);
    } else {
        crate::logger::disable_logging();
    }

    if cli.quiet {
        ui::set_quiet_mode(true);
    }

    if let Some(command) = cli.command {
        handle_command(command).await
    } else {
        let _ = Cli::parse_from(["rfp-autofill", "--help"]);
        Ok(())
    }
}

/// Route a parsed subcommand to its handler
pub async fn handle_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run {
            common,
            inputs,
            template,
            output,
            file_mode,
            ui_mode,
            no_pdf,
            save_responses,
        } => {
            commands::handle_run_command(
                &common,
                RunArgs {
                    inputs,
                    template,
                    output,
                    file_mode,
                    ui_mode,
                    no_pdf,
                    save_responses,
                },
            )
            .await
        }
        Commands::Apply {
            common,
            template,
            responses,
            output,
            no_pdf,
        } => commands::handle_apply_command(&common, &template, &responses, output, no_pdf).await,
        Commands::Segment { file, json } => commands::handle_segment_command(file.as_deref(), json),
        Commands::Tags { common, template } => commands::handle_tags_command(&common, &template),
        Commands::Questions { common } => commands::handle_questions_command(&common),
        Commands::Config {
            common,
            api_key,
            temperature,
            max_output_tokens,
            converter,
            ui_mode,
            file_mode,
        } => commands::handle_config_command(
            &common,
            ConfigChanges {
                api_key,
                temperature,
                max_output_tokens,
                converter,
                ui_mode,
                file_mode,
            },
        ),
    }
}
