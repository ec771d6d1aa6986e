//! In-memory template document.
//!
//! A minimal ordered tree of paragraphs and tables. It is the outline view of
//! a `.docx` template (see [`super::docx::DocxTemplate::outline`]) and a
//! library-independent [`TemplateSurface`] the filler can run against.

use super::surface::{CellRef, NewBlock, NodeRef, TemplateSurface};
use crate::segment::TableBlock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Paragraph {
    pub runs: Vec<String>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            runs: vec![text.into()],
        }
    }

    pub fn text(&self) -> String {
        self.runs.concat()
    }

    /// Replaces across run boundaries. A match inside a single run keeps the run
    /// layout; a match spanning runs collapses the text into the first run.
    fn replace(&mut self, old: &str, new: &str) -> bool {
        if old.is_empty() || !self.text().contains(old) {
            return false;
        }

        let mut replaced = false;
        for run in &mut self.runs {
            if run.contains(old) {
                *run = run.replace(old, new);
                replaced = true;
            }
        }

        let remaining = self.text();
        if remaining.contains(old) {
            self.runs = vec![remaining.replace(old, new)];
            replaced = true;
        }
        replaced
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Cell {
    pub paragraphs: Vec<Paragraph>,
}

impl Cell {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            paragraphs: vec![Paragraph::new(text)],
        }
    }

    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Builds a header row followed by the data rows
    pub fn from_block(block: &TableBlock) -> Self {
        let header = block.header_row.iter().map(Cell::new).collect();
        let mut rows = vec![header];
        rows.extend(
            block
                .data_rows
                .iter()
                .map(|row| row.iter().map(Cell::new).collect()),
        );
        Self { rows }
    }

    /// Cell texts, row by row
    pub fn texts(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(Cell::text).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyNode {
    Paragraph(Paragraph),
    Table(Table),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateDocument {
    pub body: Vec<BodyNode>,
}

impl TemplateDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_paragraph(mut self, text: impl Into<String>) -> Self {
        self.body.push(BodyNode::Paragraph(Paragraph::new(text)));
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.body.push(BodyNode::Table(table));
        self
    }

    /// Body-level tables in order
    pub fn tables(&self) -> Vec<&Table> {
        self.body
            .iter()
            .filter_map(|node| match node {
                BodyNode::Table(table) => Some(table),
                BodyNode::Paragraph(_) => None,
            })
            .collect()
    }

    fn cell_mut(&mut self, cell: CellRef) -> Option<&mut Cell> {
        match self.body.get_mut(cell.table)? {
            BodyNode::Table(table) => table.rows.get_mut(cell.row)?.get_mut(cell.cell),
            BodyNode::Paragraph(_) => None,
        }
    }
}

impl TemplateSurface for TemplateDocument {
    fn paragraphs(&self) -> Vec<(usize, String)> {
        self.body
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                BodyNode::Paragraph(paragraph) => Some((index, paragraph.text())),
                BodyNode::Table(_) => None,
            })
            .collect()
    }

    fn cells(&self) -> Vec<(CellRef, String)> {
        let mut cells = Vec::new();
        for (table_index, node) in self.body.iter().enumerate() {
            let BodyNode::Table(table) = node else {
                continue;
            };
            for (row_index, row) in table.rows.iter().enumerate() {
                for (cell_index, cell) in row.iter().enumerate() {
                    let cell_ref = CellRef {
                        table: table_index,
                        row: row_index,
                        cell: cell_index,
                    };
                    cells.push((cell_ref, cell.text()));
                }
            }
        }
        cells
    }

    fn replace_text(&mut self, node: NodeRef, old: &str, new: &str) -> bool {
        match node {
            NodeRef::Paragraph(index) => match self.body.get_mut(index) {
                Some(BodyNode::Paragraph(paragraph)) => paragraph.replace(old, new),
                _ => false,
            },
            NodeRef::Cell(cell_ref) => self.cell_mut(cell_ref).is_some_and(|cell| {
                let mut replaced = false;
                for paragraph in &mut cell.paragraphs {
                    replaced |= paragraph.replace(old, new);
                }
                replaced
            }),
        }
    }

    fn append_text(&mut self, paragraph: usize, text: &str) {
        if let Some(BodyNode::Paragraph(target)) = self.body.get_mut(paragraph) {
            target.runs.push(text.to_string());
        }
    }

    fn insert_block_after(&mut self, anchor: usize, block: &NewBlock) -> usize {
        let node = match block {
            NewBlock::Paragraph(text) => BodyNode::Paragraph(Paragraph::new(text.clone())),
            NewBlock::Table(table) => BodyNode::Table(Table::from_block(table)),
        };
        let position = (anchor + 1).min(self.body.len());
        self.body.insert(position, node);
        position
    }

    fn table_count(&self) -> usize {
        self.tables().len()
    }
}
