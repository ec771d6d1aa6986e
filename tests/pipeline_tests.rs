use rfp_autofill::dispatch::{self, ResponseRecord};
use rfp_autofill::pipeline::{self, RunOptions};
use rfp_autofill::questions::QueryItem;
use rfp_autofill::template::{DocxTemplate, TemplateSurface, scan_tags};
use rfp_autofill::{Config, FileMode, RunError, ServiceError, UiMode};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

#[path = "test_utils.rs"]
mod test_utils;
use test_utils::{ScriptedCompletion, ScriptedIngestion, write_proposal};

fn questions() -> Vec<QueryItem> {
    vec![
        QueryItem::new(
            "List out all details of all the pipelines required to be configured in a table.",
            "<<Scope of Assets>>",
        ),
        QueryItem::new(
            "List out all the application software modules to be provided.",
            "<<Modules>>",
        ),
        QueryItem::new(
            "Just give how many training days are required.",
            "<<Training Days>>",
        ),
    ]
}

fn answers() -> [&'static str; 3] {
    [
        "Pipe A | Pipe B\n---|---\n12in | 8in<br>Note: verify diameters",
        "Leak Detection, Batch Tracking",
        "5",
    ]
}

fn write_input(dir: &Path) -> PathBuf {
    let path = dir.join("tender.pdf");
    std::fs::write(&path, b"%PDF-1.4").expect("Failed to write input");
    path
}

fn options(dir: &Path, template: PathBuf) -> RunOptions {
    RunOptions {
        inputs: vec![write_input(dir)],
        output: dir.join("out").join("proposal_filled.docx"),
        template,
        ui_mode: UiMode::None,
        file_mode: FileMode::Single,
        render_pdf: false,
        save_responses: None,
        questions: questions(),
    }
}

#[tokio::test]
async fn test_run_fills_template() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let options = options(temp_dir.path(), template.clone());
    let ingestion = ScriptedIngestion::ready();
    let completion = Arc::new(ScriptedCompletion::answering(&answers()));

    let summary = pipeline::run(&Config::default(), &options, &ingestion, completion.clone())
        .await
        .expect("run should succeed");

    assert_eq!(summary.document, options.output);
    assert!(summary.pdf.is_none());
    assert_eq!(summary.responses.len(), 3);
    assert!(summary.report.is_complete());
    assert_eq!(summary.report.tables_inserted(), 1);
    assert_eq!(completion.call_count(), 3);
    assert_eq!(ingestion.uploaded.lock().len(), 1);

    let filled = DocxTemplate::open(&options.output).expect("Failed to open output");
    assert!(scan_tags(&filled).is_empty());
    assert!(filled.contains_text("Modules offered: Leak Detection, Batch Tracking"));
    assert!(filled.contains_text("5 days"));
    assert!(filled.contains_text("Note: verify diameters"));
    assert_eq!(filled.table_count(), 2);

    // The template itself is never modified
    let original = DocxTemplate::open(&template).expect("Failed to open template");
    assert_eq!(scan_tags(&original).len(), 3);
}

#[tokio::test]
async fn test_run_saves_responses() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let responses_path = temp_dir.path().join("responses.json");
    let options = RunOptions {
        save_responses: Some(responses_path.clone()),
        ..options(temp_dir.path(), template)
    };
    let completion = Arc::new(ScriptedCompletion::answering(&answers()));

    pipeline::run(&Config::default(), &options, &ScriptedIngestion::ready(), completion)
        .await
        .expect("run should succeed");

    let saved = dispatch::load_responses(&responses_path).expect("Failed to load responses");
    assert_eq!(saved.len(), 3);
    assert_eq!(saved[2].tag, "<<Training Days>>");
    assert_eq!(saved[2].raw_text, "5");
}

#[tokio::test]
async fn test_broken_template_fails_before_upload() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = temp_dir.path().join("broken.docx");
    std::fs::write(&template, b"not a word document").expect("Failed to write template");
    let options = options(temp_dir.path(), template);
    let ingestion = ScriptedIngestion::ready();
    let completion = Arc::new(ScriptedCompletion::answering(&answers()));

    let result = pipeline::run(&Config::default(), &options, &ingestion, completion.clone()).await;

    assert!(matches!(result, Err(RunError::TemplateLoad { .. })));
    assert!(ingestion.uploaded.lock().is_empty());
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn test_failed_question_writes_no_output() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let options = options(temp_dir.path(), template);
    let completion = Arc::new(ScriptedCompletion::new(vec![
        Ok("first".to_string()),
        Err(ServiceError::Blocked("SAFETY".to_string())),
    ]));

    let result =
        pipeline::run(&Config::default(), &options, &ScriptedIngestion::ready(), completion).await;

    assert!(matches!(result, Err(RunError::ServiceCall(_))));
    assert!(!options.output.exists());
}

#[tokio::test]
async fn test_failed_upload_stops_the_run() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let options = options(temp_dir.path(), template);
    let completion = Arc::new(ScriptedCompletion::answering(&answers()));

    let result = pipeline::run(
        &Config::default(),
        &options,
        &ScriptedIngestion::failing_upload(),
        completion.clone(),
    )
    .await;

    assert!(matches!(result, Err(RunError::Ingestion { .. })));
    assert_eq!(completion.call_count(), 0);
}

#[tokio::test]
async fn test_single_mode_rejects_two_inputs() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let mut options = options(temp_dir.path(), template);
    options.inputs.push(options.inputs[0].clone());
    let ingestion = ScriptedIngestion::ready();

    let result = pipeline::run(
        &Config::default(),
        &options,
        &ingestion,
        Arc::new(ScriptedCompletion::answering(&[])),
    )
    .await;

    assert!(matches!(result, Err(RunError::FileMode(2))));
    assert!(ingestion.uploaded.lock().is_empty());
}

#[tokio::test]
async fn test_apply_saved_responses() {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let template = write_proposal(temp_dir.path());
    let output = temp_dir.path().join("applied.docx");
    let records = vec![
        ResponseRecord {
            question: "How many training days?".to_string(),
            tag: "<<Training Days>>".to_string(),
            raw_text: "10".to_string(),
        },
        ResponseRecord {
            question: "Customer?".to_string(),
            tag: "<<Customer Name>>".to_string(),
            raw_text: "GAIL".to_string(),
        },
    ];

    let summary = pipeline::apply_responses(
        &Config::default(),
        &template,
        records,
        &output,
        false,
        UiMode::None,
    )
    .await
    .expect("apply should succeed");

    assert_eq!(summary.report.missing_tags(), vec!["<<Customer Name>>"]);
    let filled = DocxTemplate::open(&output).expect("Failed to open output");
    assert!(filled.contains_text("10 days"));
    assert_eq!(
        scan_tags(&filled),
        vec!["<<Modules>>", "<<Scope of Assets>>"]
    );
}
