//! Template filling.
//!
//! The filler works against the [`TemplateSurface`] trait; `.docx` files are
//! handled by [`DocxTemplate`], and [`TemplateDocument`] is the in-memory tree
//! used for outlines.

pub mod docx;
pub mod filler;
pub mod model;
pub mod surface;

pub use docx::DocxTemplate;
pub use filler::{Answer, FillReport, TagOutcome, fill, fill_in_place};
pub use model::{BodyNode, Cell, Paragraph, Table, TemplateDocument};
pub use surface::{CellRef, NewBlock, NodeRef, TemplateSurface};

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TAG_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<<[^<>\n]+>>").expect("tag pattern is valid"));

/// Every `<<...>>` placeholder found in paragraphs or table cells, sorted
pub fn scan_tags<S: TemplateSurface>(document: &S) -> Vec<String> {
    let texts = document
        .paragraphs()
        .into_iter()
        .map(|(_, text)| text)
        .chain(document.cells().into_iter().map(|(_, text)| text));

    let mut tags = BTreeSet::new();
    for text in texts {
        for found in TAG_PATTERN.find_iter(&text) {
            tags.insert(found.as_str().to_string());
        }
    }
    tags.into_iter().collect()
}
