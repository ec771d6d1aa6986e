//! Response segmentation.
//!
//! Splits a free-form LLM answer into the text that precedes its tables, the
//! pipe-delimited tables themselves, and the text that follows them. The
//! parser is forgiving: wrapped rows are buffered with the table
//! and rows whose width disagrees with the header are dropped.

use crate::log_debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::sync::LazyLock;

/// Section break emitted by Gemini between logical parts of an answer
static SECTION_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<br\s*/?>").expect("section break pattern is valid"));

/// A run of prose
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
}

impl TextBlock {
    /// Wraps trimmed text, returning `None` when nothing is left
    fn from_accumulated(text: &str) -> Option<Self> {
        let content = text.trim();
        if content.is_empty() {
            None
        } else {
            Some(Self {
                content: content.to_string(),
            })
        }
    }
}

/// A parsed pipe table. Every data row has exactly `header_row.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableBlock {
    pub header_row: Vec<String>,
    pub data_rows: Vec<Vec<String>>,
}

impl TableBlock {
    pub fn column_count(&self) -> usize {
        self.header_row.len()
    }

    /// Tables without data rows are never written into a document
    pub fn is_empty(&self) -> bool {
        self.data_rows.is_empty()
    }

    /// Parses the buffered lines of one table candidate.
    ///
    /// The first line is the header. Exactly one line after it is skipped as the
    /// markdown separator row; a header followed by no separator (or by several)
    /// will misparse.
    fn from_lines(lines: &[&str]) -> Self {
        let Some((header_line, rest)) = lines.split_first() else {
            return Self::default();
        };

        let header_row = split_row(header_line);
        let mut data_rows = Vec::new();

        for line in rest.iter().skip(1) {
            let cells = split_row(line);
            if cells.len() == header_row.len() {
                data_rows.push(cells);
            } else {
                log_debug!(
                    "Dropping table row with {} cells (header has {}): {}",
                    cells.len(),
                    header_row.len(),
                    line
                );
            }
        }

        Self {
            header_row,
            data_rows,
        }
    }

    /// Renders the table back to a pipe table with a separator row
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "| {} |", self.header_row.join(" | "));
        let separator = vec!["---"; self.header_row.len()];
        let _ = writeln!(out, "| {} |", separator.join(" | "));
        for row in &self.data_rows {
            let _ = writeln!(out, "| {} |", row.join(" | "));
        }
        out.trim_end().to_string()
    }
}

/// One element of a segmented answer, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text(TextBlock),
    Table(TableBlock),
}

/// The decomposition of one answer into leading text, tables and trailing text
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SegmentedResponse {
    pub before_text: Option<TextBlock>,
    pub tables: Vec<TableBlock>,
    pub after_text: Option<TextBlock>,
}

impl SegmentedResponse {
    /// Blocks in the order they appear in the answer
    pub fn blocks(&self) -> Vec<ContentBlock> {
        let mut blocks = Vec::with_capacity(self.tables.len() + 2);
        if let Some(before) = &self.before_text {
            blocks.push(ContentBlock::Text(before.clone()));
        }
        blocks.extend(self.tables.iter().cloned().map(ContentBlock::Table));
        if let Some(after) = &self.after_text {
            blocks.push(ContentBlock::Text(after.clone()));
        }
        blocks
    }

    /// Tables that carry at least one data row
    pub fn insertable_tables(&self) -> impl Iterator<Item = &TableBlock> {
        self.tables.iter().filter(|table| !table.is_empty())
    }

    /// Reserializes the answer; tables are separated by section breaks so each
    /// one lands in its own section when segmented again.
    pub fn to_markdown(&self) -> String {
        let mut parts = Vec::new();
        if let Some(before) = &self.before_text {
            parts.push(before.content.clone());
        }
        parts.extend(self.tables.iter().map(TableBlock::to_markdown));
        if let Some(after) = &self.after_text {
            parts.push(after.content.clone());
        }
        parts.join("\n<br>\n")
    }
}

/// Splits a raw answer into a [`SegmentedResponse`].
pub fn segment(raw_text: &str) -> SegmentedResponse {
    let mut before = String::new();
    let mut after = String::new();
    let mut tables = Vec::new();
    let mut table_found = false;

    for section in SECTION_BREAK.split(raw_text) {
        let mut table_lines: Vec<&str> = Vec::new();
        let mut inside_table = false;

        for line in section.trim().split('\n') {
            let blank = line.trim().is_empty();
            if line.contains('|') {
                table_lines.push(line);
                inside_table = true;
            } else if inside_table && !blank {
                // wrapped row
                table_lines.push(line);
            } else if inside_table {
                inside_table = false;
            } else if table_found {
                after.push_str(line);
                after.push('\n');
            } else {
                before.push_str(line);
                before.push('\n');
            }
        }

        if !table_lines.is_empty() {
            tables.push(TableBlock::from_lines(&table_lines));
            table_found = true;
        }
    }

    log_debug!(
        "Segmented response: {} chars before, {} tables, {} chars after",
        before.trim().len(),
        tables.len(),
        after.trim().len()
    );

    SegmentedResponse {
        before_text: TextBlock::from_accumulated(&before),
        tables,
        after_text: TextBlock::from_accumulated(&after),
    }
}

/// Splits a pipe-delimited row into trimmed cells, discarding the empty
/// artifacts produced by leading and trailing border pipes.
fn split_row(line: &str) -> Vec<String> {
    let mut cells: Vec<String> = line.split('|').map(|cell| cell.trim().to_string()).collect();
    if cells.first().is_some_and(String::is_empty) {
        cells.remove(0);
    }
    if cells.last().is_some_and(String::is_empty) {
        cells.pop();
    }
    cells
}
