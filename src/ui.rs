//! Terminal output for the interactive UI mode.

use colored::{ColoredString, Colorize};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static QUIET: AtomicBool = AtomicBool::new(false);

const RULE_WIDTH: usize = 60;

/// Colour roles used across the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Heading,
    Tag,
    Value,
    Secret,
    Muted,
    Good,
    Bad,
}

/// Style `text` for its role
pub fn paint(text: &str, tone: Tone) -> ColoredString {
    match tone {
        Tone::Heading => text.bright_magenta().bold(),
        Tone::Tag => text.yellow().bold(),
        Tone::Value => text.bright_cyan(),
        Tone::Secret => text.bright_red(),
        Tone::Muted => text.dimmed(),
        Tone::Good => text.green(),
        Tone::Bad => text.red(),
    }
}

pub fn set_quiet_mode(enabled: bool) {
    QUIET.store(enabled, Ordering::Relaxed);
}

pub fn is_quiet_mode() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Spinner shown while waiting on uploads and answers; hidden when quiet
pub fn create_spinner(message: &str) -> ProgressBar {
    if is_quiet_mode() {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_strings(&["[    ]", "[=   ]", "[==  ]", "[=== ]", "[ ===]", "[  ==]", "[   =]", "[====]"])
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

fn emit(line: ColoredString) {
    if !is_quiet_mode() {
        println!("{line}");
    }
}

pub fn print_info(message: &str) {
    emit(message.cyan());
}

pub fn print_warning(message: &str) {
    emit(message.yellow().bold());
}

pub fn print_success(message: &str) {
    emit(message.green().bold());
}

/// Errors ignore quiet mode
pub fn print_error(message: &str) {
    eprintln!("{}", message.red().bold());
}

pub fn print_message(message: &str) {
    if !is_quiet_mode() {
        println!("{message}");
    }
}

pub fn print_newline() {
    if !is_quiet_mode() {
        println!();
    }
}

pub fn print_version(version: &str) {
    print_message(&format!("{} {version}", paint("rfp-autofill", Tone::Heading)));
}

/// Answer text framed by rules, as shown after each question
pub fn print_bordered_content(content: &str) {
    if is_quiet_mode() {
        return;
    }
    let rule = paint(&"─".repeat(RULE_WIDTH), Tone::Muted);
    println!("{rule}");
    for line in content.lines() {
        println!("{} {line}", paint("│", Tone::Muted));
    }
    println!("{rule}");
}

/// `── NAME ─────` heading line
pub fn section_header(name: &str) -> String {
    let tail = RULE_WIDTH.saturating_sub(name.chars().count() + 4).max(2);
    format!(
        "{} {} {}",
        paint("──", Tone::Muted),
        paint(name, Tone::Heading),
        paint(&"─".repeat(tail), Tone::Muted)
    )
}

/// Check mark for a satisfied condition, cross otherwise
pub fn status_mark(ok: bool) -> ColoredString {
    if ok {
        paint("✓", Tone::Good).bold()
    } else {
        paint("✗", Tone::Bad).bold()
    }
}
