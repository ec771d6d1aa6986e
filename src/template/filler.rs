use super::surface::{NewBlock, NodeRef, TemplateSurface};
use crate::dispatch::ResponseRecord;
use crate::segment::{SegmentedResponse, segment};
use crate::{log_debug, log_warn};
use serde::Serialize;
use std::collections::BTreeSet;

/// One answer ready to be written into a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Answer {
    pub tag: String,
    /// Unsegmented answer text, used for table-cell anchors
    pub raw_text: String,
    pub segmented: SegmentedResponse,
}

impl Answer {
    pub fn new(tag: impl Into<String>, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into().trim().to_string();
        let segmented = segment(&raw_text);
        Self {
            tag: tag.into(),
            raw_text,
            segmented,
        }
    }

    pub fn from_record(record: &ResponseRecord) -> Self {
        Self::new(record.tag.clone(), record.raw_text.clone())
    }
}

/// What happened to a single tag during a fill
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TagOutcome {
    pub tag: String,
    pub paragraph_hits: usize,
    pub cell_hits: usize,
    pub tables_inserted: usize,
}

impl TagOutcome {
    pub fn found(&self) -> bool {
        self.paragraph_hits + self.cell_hits > 0
    }
}

/// Summary of a fill: per-tag outcomes plus any tag that survived it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub outcomes: Vec<TagOutcome>,
    pub residual: Vec<String>,
}

impl FillReport {
    /// Tags that matched nothing in the document
    pub fn missing_tags(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|outcome| !outcome.found())
            .map(|outcome| outcome.tag.as_str())
            .collect()
    }

    /// Tags still present after filling
    pub fn residual_tags(&self) -> &[String] {
        &self.residual
    }

    pub fn is_complete(&self) -> bool {
        self.residual.is_empty() && self.missing_tags().is_empty()
    }

    pub fn tables_inserted(&self) -> usize {
        self.outcomes.iter().map(|o| o.tables_inserted).sum()
    }
}

/// Fills a copy of `template`, leaving the original untouched
pub fn fill<S>(template: &S, answers: &[Answer]) -> (S, FillReport)
where
    S: TemplateSurface + Clone,
{
    let mut document = template.clone();
    let report = fill_in_place(&mut document, answers);
    (document, report)
}

/// Writes every answer into `document`, in order
pub fn fill_in_place<S: TemplateSurface>(document: &mut S, answers: &[Answer]) -> FillReport {
    let mut report = FillReport::default();

    for answer in answers {
        let mut outcome = TagOutcome {
            tag: answer.tag.clone(),
            ..TagOutcome::default()
        };

        fill_paragraphs(document, answer, &mut outcome);
        fill_cells(document, answer, &mut outcome);

        if outcome.found() {
            log_debug!(
                "Filled {}: {} paragraph(s), {} cell(s), {} table(s)",
                outcome.tag,
                outcome.paragraph_hits,
                outcome.cell_hits,
                outcome.tables_inserted
            );
        } else {
            log_warn!("Tag {} not found in template", answer.tag);
        }
        report.outcomes.push(outcome);
    }

    let residual: BTreeSet<&str> = answers
        .iter()
        .map(|answer| answer.tag.as_str())
        .filter(|tag| !tag.is_empty() && document.contains_text(tag))
        .collect();
    report.residual = residual.into_iter().map(str::to_string).collect();
    for tag in &report.residual {
        log_warn!("Tag {} is still present after filling", tag);
    }

    report
}

fn fill_paragraphs<S: TemplateSurface>(document: &mut S, answer: &Answer, outcome: &mut TagOutcome) {
    if answer.tag.is_empty() {
        return;
    }

    let anchors: Vec<usize> = document
        .paragraphs()
        .into_iter()
        .filter(|(_, text)| text.contains(&answer.tag))
        .map(|(index, _)| index)
        .collect();

    // Back to front, so inserting after one anchor leaves earlier indices valid
    for &anchor in anchors.iter().rev() {
        document.replace_text(NodeRef::Paragraph(anchor), &answer.tag, "");

        let segmented = &answer.segmented;
        if let Some(before) = &segmented.before_text {
            document.append_text(anchor, &before.content);
        }

        let mut cursor = anchor;
        for table in segmented.insertable_tables() {
            cursor = document.insert_block_after(cursor, &NewBlock::Table(table.clone()));
            outcome.tables_inserted += 1;
        }

        if let Some(after) = &segmented.after_text {
            document.insert_block_after(cursor, &NewBlock::Paragraph(after.content.clone()));
        }

        outcome.paragraph_hits += 1;
    }
}

fn fill_cells<S: TemplateSurface>(document: &mut S, answer: &Answer, outcome: &mut TagOutcome) {
    if answer.tag.is_empty() {
        return;
    }

    let targets: Vec<_> = document
        .cells()
        .into_iter()
        .filter(|(_, text)| text.contains(&answer.tag))
        .map(|(cell, _)| cell)
        .collect();

    for cell in targets {
        if document.replace_text(NodeRef::Cell(cell), &answer.tag, &answer.raw_text) {
            outcome.cell_hits += 1;
        }
    }
}
