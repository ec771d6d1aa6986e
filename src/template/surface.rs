use crate::segment::TableBlock;

/// Position of a table cell among the body-level tables of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRef {
    /// Index of the table within the document body
    pub table: usize,
    pub row: usize,
    pub cell: usize,
}

/// A node whose text can be rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeRef {
    /// Body-level paragraph, addressed by its index in the body
    Paragraph(usize),
    Cell(CellRef),
}

/// A block the filler splices into the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewBlock {
    Paragraph(String),
    Table(TableBlock),
}

/// Editing capabilities the template filler needs from a document library.
///
/// Body indices are positions in the document body; inserting a block after
/// index `i` shifts every later index by one.
pub trait TemplateSurface {
    /// Body-level paragraphs as `(body index, text)`
    fn paragraphs(&self) -> Vec<(usize, String)>;

    /// Cells of body-level tables with their text (cell paragraphs joined by `\n`)
    fn cells(&self) -> Vec<(CellRef, String)>;

    /// Replaces every occurrence of `old` in the node's text. Returns whether
    /// anything was replaced.
    fn replace_text(&mut self, node: NodeRef, old: &str, new: &str) -> bool;

    /// Appends `text` as a new run at the end of a body paragraph
    fn append_text(&mut self, paragraph: usize, text: &str);

    /// Inserts `block` directly after the body node at `anchor` and returns the
    /// body index of the inserted block.
    fn insert_block_after(&mut self, anchor: usize, block: &NewBlock) -> usize;

    /// Number of body-level tables
    fn table_count(&self) -> usize;

    /// Whether `needle` occurs anywhere on either surface
    fn contains_text(&self, needle: &str) -> bool {
        self.paragraphs().iter().any(|(_, text)| text.contains(needle))
            || self.cells().iter().any(|(_, text)| text.contains(needle))
    }
}
