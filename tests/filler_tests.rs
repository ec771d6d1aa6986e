use rfp_autofill::dispatch::ResponseRecord;
use rfp_autofill::template::{
    Answer, BodyNode, Cell, Table, TemplateDocument, TemplateSurface, fill, fill_in_place,
    scan_tags,
};

fn proposal() -> TemplateDocument {
    TemplateDocument::new()
        .with_paragraph("1. Scope of Supply")
        .with_paragraph("<<Scope of Assets>>")
        .with_paragraph("2. Commercial")
        .with_table(Table {
            rows: vec![
                vec![Cell::new("Training"), Cell::new("<<Training Days>> days")],
                vec![Cell::new("Redundancy"), Cell::new("<<Dual Redundant>>")],
            ],
        })
        .with_paragraph("End")
}

fn paragraph_texts(document: &TemplateDocument) -> Vec<String> {
    document
        .paragraphs()
        .into_iter()
        .map(|(_, text)| text)
        .collect()
}

#[test]
fn test_fill_without_answers_is_noop() {
    let template = proposal();
    let (filled, report) = fill(&template, &[]);

    assert_eq!(filled, template);
    assert!(report.outcomes.is_empty());
}

#[test]
fn test_paragraph_tag_becomes_table_after_anchor() {
    let template = proposal();
    let answers = [Answer::new(
        "<<Scope of Assets>>",
        "Pipe A | Pipe B\n---|---\n12in | 8in<br>Note: verify diameters",
    )];
    let (filled, report) = fill(&template, &answers);

    // Original untouched
    assert!(template.contains_text("<<Scope of Assets>>"));
    assert!(!filled.contains_text("<<Scope of Assets>>"));

    match &filled.body[1] {
        BodyNode::Paragraph(paragraph) => assert_eq!(paragraph.text(), ""),
        BodyNode::Table(_) => panic!("anchor paragraph should stay in place"),
    }
    match &filled.body[2] {
        BodyNode::Table(table) => assert_eq!(
            table.texts(),
            vec![vec!["Pipe A", "Pipe B"], vec!["12in", "8in"]]
        ),
        BodyNode::Paragraph(_) => panic!("expected the inserted table right after the anchor"),
    }
    match &filled.body[3] {
        BodyNode::Paragraph(paragraph) => {
            assert_eq!(paragraph.text(), "Note: verify diameters");
        }
        BodyNode::Table(_) => panic!("expected the trailing note after the table"),
    }
    match &filled.body[4] {
        BodyNode::Paragraph(paragraph) => assert_eq!(paragraph.text(), "2. Commercial"),
        BodyNode::Table(_) => panic!("following content should shift down"),
    }

    assert_eq!(report.tables_inserted(), 1);
    assert_eq!(report.outcomes[0].paragraph_hits, 1);
    assert!(report.is_complete());
}

#[test]
fn test_before_text_is_appended_to_anchor() {
    let template = TemplateDocument::new().with_paragraph("Modules: <<Modules>>");
    let answers = [Answer::new(
        "<<Modules>>",
        "The following modules are required:\n| Module |\n|---|\n| Leak Detection |",
    )];
    let (filled, _) = fill(&template, &answers);

    assert_eq!(
        paragraph_texts(&filled)[0],
        "Modules: The following modules are required:"
    );
    assert_eq!(filled.tables().len(), 1);
}

#[test]
fn test_cell_tag_gets_raw_answer() {
    let template = proposal();
    let raw = "| Days |\n|---|\n| 5 |";
    let answers = [Answer::new("<<Training Days>>", raw)];
    let (filled, report) = fill(&template, &answers);

    assert_eq!(filled.table_count(), template.table_count());
    let table = filled.tables()[0];
    assert_eq!(table.rows[0][1].text(), format!("{raw} days"));
    assert_eq!(report.outcomes[0].cell_hits, 1);
    assert_eq!(report.outcomes[0].tables_inserted, 0);
}

#[test]
fn test_every_matching_paragraph_is_filled() {
    let template = TemplateDocument::new()
        .with_paragraph("Summary: <<Product Type>>")
        .with_paragraph("Details")
        .with_paragraph("Again: <<Product Type>>");
    let answers = [Answer::new(
        "<<Product Type>>",
        "| Product |\n|---|\n| Crude |\n| HSD |",
    )];
    let (filled, report) = fill(&template, &answers);

    assert_eq!(report.outcomes[0].paragraph_hits, 2);
    assert_eq!(report.tables_inserted(), 2);
    assert!(matches!(filled.body[1], BodyNode::Table(_)));
    assert!(matches!(filled.body[2], BodyNode::Paragraph(_)));
    assert!(matches!(filled.body[4], BodyNode::Table(_)));
    assert_eq!(filled.body.len(), 5);
}

#[test]
fn test_multiple_tables_keep_answer_order() {
    let template = TemplateDocument::new()
        .with_paragraph("<<Deliverables>>")
        .with_paragraph("Next section");
    let raw = "| Hardware |\n|---|\n| Servers |\n<br>\n| Software |\n|---|\n| Licences |\n<br>All items per annex B";
    let (filled, _) = fill(&template, &[Answer::new("<<Deliverables>>", raw)]);

    let tables = filled.tables();
    assert_eq!(tables.len(), 2);
    assert_eq!(tables[0].rows[0][0].text(), "Hardware");
    assert_eq!(tables[1].rows[0][0].text(), "Software");
    match &filled.body[3] {
        BodyNode::Paragraph(paragraph) => assert_eq!(paragraph.text(), "All items per annex B"),
        BodyNode::Table(_) => panic!("trailing text should follow both tables"),
    }
    assert_eq!(paragraph_texts(&filled).last().map(String::as_str), Some("Next section"));
}

#[test]
fn test_table_without_valid_rows_is_not_inserted() {
    let template = TemplateDocument::new().with_paragraph("<<Scope of Assets>>");
    let raw = "| Name | Length | Diameter |\n|---|---|---|\n| Line 1 | 42 km |";
    let (filled, report) = fill(&template, &[Answer::new("<<Scope of Assets>>", raw)]);

    assert_eq!(filled.table_count(), 0);
    assert_eq!(report.tables_inserted(), 0);
    assert!(!filled.contains_text("<<Scope of Assets>>"));
}

#[test]
fn test_missing_tag_is_reported_not_fatal() {
    let template = proposal();
    let answers = [
        Answer::new("<<Hardware requirement>>", "Two servers"),
        Answer::new("<<Dual Redundant>>", "Dual Redundant"),
    ];
    let (filled, report) = fill(&template, &answers);

    assert_eq!(report.missing_tags(), vec!["<<Hardware requirement>>"]);
    assert!(report.residual_tags().is_empty());
    assert!(!report.is_complete());
    assert!(filled.contains_text("Dual Redundant"));
}

#[test]
fn test_unanswered_tags_remain_visible() {
    let mut document = proposal();
    let report = fill_in_place(&mut document, &[Answer::new("<<Dual Redundant>>", "")]);

    assert!(report.missing_tags().is_empty());
    assert_eq!(
        scan_tags(&document),
        vec!["<<Scope of Assets>>", "<<Training Days>>"]
    );
}

#[test]
fn test_answer_from_record_trims_raw_text() {
    let record = ResponseRecord {
        question: "Just give how many training days are required.".to_string(),
        tag: "<<Training Days>>".to_string(),
        raw_text: "  5 days \n".to_string(),
    };
    let answer = Answer::from_record(&record);
    assert_eq!(answer.raw_text, "5 days");
    assert_eq!(
        answer.segmented.before_text.map(|t| t.content),
        Some("5 days".to_string())
    );
}

#[test]
fn test_scan_tags_covers_both_surfaces() {
    assert_eq!(
        scan_tags(&proposal()),
        vec!["<<Dual Redundant>>", "<<Scope of Assets>>", "<<Training Days>>"]
    );
}

#[test]
fn test_residual_tags_are_reported_once() {
    let mut document = proposal();
    let answers = [
        Answer::new("<<Training Days>>", "see <<Training Days>>"),
        Answer::new("<<Dual Redundant>>", "<<Dual Redundant>> (to confirm)"),
        Answer::new("<<Training Days>>", "see <<Training Days>>"),
    ];

    let report = fill_in_place(&mut document, &answers);

    assert_eq!(
        report.residual_tags(),
        ["<<Dual Redundant>>", "<<Training Days>>"]
    );
}
