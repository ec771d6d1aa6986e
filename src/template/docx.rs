//! `.docx` templates backed by the `docx-rs` object model.

use super::model::{self, BodyNode, TemplateDocument};
use super::surface::{CellRef, NewBlock, NodeRef, TemplateSurface};
use crate::error::RunError;
use crate::log_debug;
use crate::segment::TableBlock;
use docx_rs::{
    BreakType, Docx, DocumentChild, FooterChild, HeaderChild, InsertChild, Paragraph,
    ParagraphChild, Run, RunChild, Table, TableCell, TableCellContent, TableChild, TableRow,
    TableRowChild,
};
use html_escape::{decode_html_entities, encode_text};
use std::io::Cursor;
use std::path::Path;

/// A Word template loaded into memory. Edits never touch the source file.
#[derive(Clone)]
pub struct DocxTemplate {
    docx: Docx,
}

impl DocxTemplate {
    /// Load a template from disk
    pub fn open(path: &Path) -> Result<Self, RunError> {
        let bytes = std::fs::read(path).map_err(|e| RunError::TemplateLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(&bytes).map_err(|e| match e {
            RunError::TemplateLoad { reason, .. } => RunError::TemplateLoad {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse `.docx` bytes.
    ///
    /// The reader hands back decoded text while the writer emits text nodes
    /// verbatim, so every loaded text node is re-escaped here. After loading,
    /// all text nodes hold the escaped form, as builder-made runs do.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RunError> {
        let mut docx = docx_rs::read_docx(bytes).map_err(|e| RunError::TemplateLoad {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })?;
        escape_loaded_text(&mut docx);
        log_debug!(
            "Loaded template with {} body nodes",
            docx.document.children.len()
        );
        Ok(Self { docx })
    }

    pub fn from_docx(docx: Docx) -> Self {
        Self { docx }
    }

    /// Serialize the document as `.docx` bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, RunError> {
        let mut buffer = Cursor::new(Vec::new());
        self.docx
            .clone()
            .build()
            .pack(&mut buffer)
            .map_err(|e| RunError::Render(format!("Failed to serialize document: {e}")))?;
        Ok(buffer.into_inner())
    }

    /// Write the document to `path`
    pub fn save(&self, path: &Path) -> Result<(), RunError> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes).map_err(|e| {
            RunError::Render(format!("Failed to write {}: {e}", path.display()))
        })?;
        log_debug!("Saved document to {}", path.display());
        Ok(())
    }

    /// Paragraph/table outline of the body. Body-level nodes other than
    /// paragraphs and tables are represented as empty paragraphs so body
    /// indices line up with this document.
    pub fn outline(&self) -> TemplateDocument {
        let body = self
            .docx
            .document
            .children
            .iter()
            .map(|child| match child {
                DocumentChild::Table(table) => BodyNode::Table(outline_table(table)),
                DocumentChild::Paragraph(paragraph) => BodyNode::Paragraph(model::Paragraph {
                    runs: run_texts(paragraph),
                }),
                _ => BodyNode::Paragraph(model::Paragraph::default()),
            })
            .collect();
        TemplateDocument { body }
    }

    fn cell_mut(&mut self, cell_ref: CellRef) -> Option<&mut TableCell> {
        let DocumentChild::Table(table) = self.docx.document.children.get_mut(cell_ref.table)?
        else {
            return None;
        };
        let row = table_rows_mut(table).into_iter().nth(cell_ref.row)?;
        row_cells_mut(row).into_iter().nth(cell_ref.cell)
    }
}

impl TemplateSurface for DocxTemplate {
    fn paragraphs(&self) -> Vec<(usize, String)> {
        self.docx
            .document
            .children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| match child {
                DocumentChild::Paragraph(paragraph) => Some((index, paragraph_text(paragraph))),
                _ => None,
            })
            .collect()
    }

    fn cells(&self) -> Vec<(CellRef, String)> {
        let mut cells = Vec::new();
        for (table_index, child) in self.docx.document.children.iter().enumerate() {
            let DocumentChild::Table(table) = child else {
                continue;
            };
            for (row_index, row) in table_rows(table).into_iter().enumerate() {
                for (cell_index, cell) in row_cells(row).into_iter().enumerate() {
                    let cell_ref = CellRef {
                        table: table_index,
                        row: row_index,
                        cell: cell_index,
                    };
                    cells.push((cell_ref, cell_text(cell)));
                }
            }
        }
        cells
    }

    fn replace_text(&mut self, node: NodeRef, old: &str, new: &str) -> bool {
        match node {
            NodeRef::Paragraph(index) => match self.docx.document.children.get_mut(index) {
                Some(DocumentChild::Paragraph(paragraph)) => {
                    replace_in_paragraph(paragraph, old, new)
                }
                _ => false,
            },
            NodeRef::Cell(cell_ref) => self.cell_mut(cell_ref).is_some_and(|cell| {
                let mut replaced = false;
                for content in &mut cell.children {
                    if let TableCellContent::Paragraph(paragraph) = content {
                        replaced |= replace_in_paragraph(paragraph, old, new);
                    }
                }
                replaced
            }),
        }
    }

    fn append_text(&mut self, paragraph: usize, text: &str) {
        let Some(DocumentChild::Paragraph(target)) =
            self.docx.document.children.get_mut(paragraph)
        else {
            return;
        };

        let mut run = text_run(text);
        if let Some(property) = target.children.iter().rev().find_map(|child| match child {
            ParagraphChild::Run(run) => Some(run.run_property.clone()),
            _ => None,
        }) {
            run.run_property = property;
        }
        target.children.push(ParagraphChild::Run(Box::new(run)));
    }

    fn insert_block_after(&mut self, anchor: usize, block: &NewBlock) -> usize {
        let children = &mut self.docx.document.children;
        let position = (anchor + 1).min(children.len());
        let child = match block {
            NewBlock::Paragraph(text) => {
                DocumentChild::Paragraph(Box::new(Paragraph::new().add_run(text_run(text))))
            }
            NewBlock::Table(table) => DocumentChild::Table(Box::new(build_table(table))),
        };
        children.insert(position, child);
        position
    }

    fn table_count(&self) -> usize {
        self.docx
            .document
            .children
            .iter()
            .filter(|child| matches!(child, DocumentChild::Table(_)))
            .count()
    }
}

/// Builds a bordered table: header row first, then the data rows
fn build_table(block: &TableBlock) -> Table {
    let row = |cells: &[String]| {
        TableRow::new(
            cells
                .iter()
                .map(|text| TableCell::new().add_paragraph(Paragraph::new().add_run(text_run(text))))
                .collect(),
        )
    };

    let mut rows = vec![row(block.header_row.as_slice())];
    rows.extend(block.data_rows.iter().map(|cells| row(cells.as_slice())));
    Table::new(rows)
}

/// A run holding `text`, with line breaks and tabs for embedded `\n` and `\t`
fn text_run(text: &str) -> Run {
    let mut run = Run::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (j, piece) in line.split('\t').enumerate() {
            if j > 0 {
                run = run.add_tab();
            }
            if !piece.is_empty() {
                run = run.add_text(piece);
            }
        }
    }
    run
}

fn run_text(run: &Run) -> String {
    let mut text = String::new();
    for child in &run.children {
        match child {
            RunChild::Text(t) => text.push_str(&decode_html_entities(&t.text)),
            RunChild::Break(_) => text.push('\n'),
            RunChild::Tab(_) => text.push('\t'),
            _ => {}
        }
    }
    text
}

fn run_texts(paragraph: &Paragraph) -> Vec<String> {
    paragraph
        .children
        .iter()
        .filter_map(|child| match child {
            ParagraphChild::Run(run) => Some(run_text(run)),
            _ => None,
        })
        .collect()
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    run_texts(paragraph).concat()
}

fn cell_text(cell: &TableCell) -> String {
    cell.children
        .iter()
        .filter_map(|content| match content {
            TableCellContent::Paragraph(paragraph) => Some(paragraph_text(paragraph)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn outline_table(table: &Table) -> model::Table {
    let rows = table_rows(table)
        .into_iter()
        .map(|row| {
            row_cells(row)
                .into_iter()
                .map(|cell| model::Cell {
                    paragraphs: cell
                        .children
                        .iter()
                        .filter_map(|content| match content {
                            TableCellContent::Paragraph(paragraph) => Some(model::Paragraph {
                                runs: run_texts(paragraph),
                            }),
                            _ => None,
                        })
                        .collect(),
                })
                .collect()
        })
        .collect();
    model::Table { rows }
}

#[allow(irrefutable_let_patterns)]
fn table_rows(table: &Table) -> Vec<&TableRow> {
    table
        .rows
        .iter()
        .filter_map(|child| {
            if let TableChild::TableRow(row) = child {
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

#[allow(irrefutable_let_patterns)]
fn table_rows_mut(table: &mut Table) -> Vec<&mut TableRow> {
    table
        .rows
        .iter_mut()
        .filter_map(|child| {
            if let TableChild::TableRow(row) = child {
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

#[allow(irrefutable_let_patterns)]
fn row_cells(row: &TableRow) -> Vec<&TableCell> {
    row.cells
        .iter()
        .filter_map(|child| {
            if let TableRowChild::TableCell(cell) = child {
                Some(cell)
            } else {
                None
            }
        })
        .collect()
}

#[allow(irrefutable_let_patterns)]
fn row_cells_mut(row: &mut TableRow) -> Vec<&mut TableCell> {
    row.cells
        .iter_mut()
        .filter_map(|child| {
            if let TableRowChild::TableCell(cell) = child {
                Some(cell)
            } else {
                None
            }
        })
        .collect()
}

/// Replaces `old` in the paragraph's runs.
///
/// Matches inside a single text node are replaced in place so run formatting
/// survives. A match split across runs (Word often splits a typed tag) is
/// resolved by moving the paragraph's whole text into its first text node.
fn replace_in_paragraph(paragraph: &mut Paragraph, old: &str, new: &str) -> bool {
    let current = paragraph_text(paragraph);
    if old.is_empty() || !current.contains(old) {
        return false;
    }

    // Line breaks and tabs need their own run children, which only the rebuilt run has
    if new.contains(['\n', '\t']) {
        collapse_text(paragraph, &current.replace(old, new));
        return true;
    }

    for child in &mut paragraph.children {
        if let ParagraphChild::Run(run) = child {
            for run_child in &mut run.children {
                if let RunChild::Text(t) = run_child {
                    let decoded = decode_html_entities(&t.text);
                    if decoded.contains(old) {
                        t.text = encode_text(&decoded.replace(old, new)).into_owned();
                    }
                }
            }
        }
    }

    let remaining = paragraph_text(paragraph);
    if remaining.contains(old) {
        log_debug!("Tag '{}' spans several runs, collapsing paragraph text", old);
        collapse_text(paragraph, &remaining.replace(old, new));
    }
    true
}

/// Puts `text` into the first text node of the paragraph and clears the rest.
/// Existing breaks and tabs are dropped; `text_run` rebuilds them from `text`.
fn collapse_text(paragraph: &mut Paragraph, text: &str) {
    let mut first_run = true;
    for child in &mut paragraph.children {
        let ParagraphChild::Run(run) = child else {
            continue;
        };
        run.children
            .retain(|run_child| matches!(run_child, RunChild::Text(_)) || !is_textual(run_child));
        if first_run && run.children.iter().any(|c| matches!(c, RunChild::Text(_))) {
            let replacement = text_run(text);
            let other: Vec<RunChild> = run
                .children
                .drain(..)
                .filter(|c| !matches!(c, RunChild::Text(_)))
                .collect();
            run.children = replacement.children;
            run.children.extend(other);
            first_run = false;
        } else {
            run.children.retain(|c| !matches!(c, RunChild::Text(_)));
        }
    }
}

fn is_textual(child: &RunChild) -> bool {
    matches!(child, RunChild::Text(_) | RunChild::Break(_) | RunChild::Tab(_))
}

fn escape_loaded_text(docx: &mut Docx) {
    for child in &mut docx.document.children {
        match child {
            DocumentChild::Paragraph(paragraph) => escape_paragraph(paragraph),
            DocumentChild::Table(table) => escape_table(table),
            _ => {}
        }
    }

    let section = &mut docx.document.section_property;
    for (_, header) in [
        &mut section.header,
        &mut section.first_header,
        &mut section.even_header,
    ]
    .into_iter()
    .flatten()
    {
        for child in &mut header.children {
            match child {
                HeaderChild::Paragraph(paragraph) => escape_paragraph(paragraph),
                HeaderChild::Table(table) => escape_table(table),
                HeaderChild::StructuredDataTag(_) => {}
            }
        }
    }
    for (_, footer) in [
        &mut section.footer,
        &mut section.first_footer,
        &mut section.even_footer,
    ]
    .into_iter()
    .flatten()
    {
        for child in &mut footer.children {
            match child {
                FooterChild::Paragraph(paragraph) => escape_paragraph(paragraph),
                FooterChild::Table(table) => escape_table(table),
                FooterChild::StructuredDataTag(_) => {}
            }
        }
    }
}

fn escape_table(table: &mut Table) {
    for row in table_rows_mut(table) {
        for cell in row_cells_mut(row) {
            for content in &mut cell.children {
                match content {
                    TableCellContent::Paragraph(paragraph) => escape_paragraph(paragraph),
                    TableCellContent::Table(nested) => escape_table(nested),
                    _ => {}
                }
            }
        }
    }
}

fn escape_paragraph(paragraph: &mut Paragraph) {
    for child in &mut paragraph.children {
        escape_paragraph_child(child);
    }
}

fn escape_paragraph_child(child: &mut ParagraphChild) {
    match child {
        ParagraphChild::Run(run) => escape_run(run),
        ParagraphChild::Hyperlink(link) => {
            for nested in &mut link.children {
                escape_paragraph_child(nested);
            }
        }
        ParagraphChild::Insert(insert) => {
            for nested in &mut insert.children {
                if let InsertChild::Run(run) = nested {
                    escape_run(run);
                }
            }
        }
        _ => {}
    }
}

fn escape_run(run: &mut Run) {
    for child in &mut run.children {
        if let RunChild::Text(t) = child {
            t.text = encode_text(&t.text).into_owned();
        }
    }
}
