use rfp_autofill::ingest::{self, PDF_MIME_TYPE, PollSettings};
use rfp_autofill::llm::AssetState;
use rfp_autofill::render::PdfRenderer;
use rfp_autofill::{FileMode, RunError};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[path = "test_utils.rs"]
mod test_utils;
use test_utils::{ScriptedIngestion, handle};

fn fast_polling() -> PollSettings {
    PollSettings {
        interval: Duration::from_millis(1),
        max_wait: Duration::from_secs(5),
    }
}

fn renderer() -> PdfRenderer {
    PdfRenderer::new("rfp-autofill-missing-converter", Duration::from_secs(5))
}

fn touch(dir: &TempDir, name: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, b"%PDF-1.4").expect("Failed to write input");
    path
}

#[tokio::test]
async fn test_polls_until_active() {
    let service = ScriptedIngestion::with_states(&[
        AssetState::Processing,
        AssetState::Processing,
        AssetState::Active,
    ]);

    ingest::wait_for_active(&service, &[handle(1)], fast_polling())
        .await
        .expect("file should become active");

    assert_eq!(service.poll_count(), 3);
}

#[tokio::test]
async fn test_every_handle_is_polled() {
    let service = ScriptedIngestion::ready();

    ingest::wait_for_active(&service, &[handle(1), handle(2)], fast_polling())
        .await
        .expect("files should be active");

    assert_eq!(service.poll_count(), 2);
}

#[tokio::test]
async fn test_failed_state_aborts() {
    let service = ScriptedIngestion::with_states(&[AssetState::Processing, AssetState::Failed]);

    let result = ingest::wait_for_active(&service, &[handle(1)], fast_polling()).await;

    match result {
        Err(RunError::Ingestion { asset, reason }) => {
            assert_eq!(asset, "tender1.pdf");
            assert!(reason.contains("FAILED"));
        }
        other => panic!("expected an ingestion error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_state_aborts() {
    let service = ScriptedIngestion::with_states(&[AssetState::StateUnspecified]);

    let result = ingest::wait_for_active(&service, &[handle(1)], fast_polling()).await;

    assert!(matches!(result, Err(RunError::Ingestion { .. })));
    assert_eq!(service.poll_count(), 1);
}

#[tokio::test]
async fn test_processing_past_max_wait_times_out() {
    let service = ScriptedIngestion::with_states(&[AssetState::Processing; 100]);
    let settings = PollSettings {
        interval: Duration::from_millis(5),
        max_wait: Duration::from_millis(12),
    };

    let result = ingest::wait_for_active(&service, &[handle(1)], settings).await;

    match result {
        Err(RunError::Ingestion { reason, .. }) => assert!(reason.contains("still processing")),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert!(service.poll_count() < 100);
}

#[tokio::test]
async fn test_upload_sends_pdf_mime_type() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let paths = vec![touch(&dir, "a.pdf"), touch(&dir, "b.pdf")];
    let service = ScriptedIngestion::ready();

    let handles = ingest::upload_all(&service, &paths)
        .await
        .expect("uploads should succeed");

    assert_eq!(handles, vec![handle(1), handle(2)]);
    let uploaded = service.uploaded.lock();
    assert_eq!(uploaded[0], (paths[0].clone(), PDF_MIME_TYPE.to_string()));
    assert_eq!(uploaded[1].0, paths[1]);
}

#[tokio::test]
async fn test_upload_failure_is_an_ingestion_error() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let path = touch(&dir, "tender.pdf");

    let result = ingest::upload_all(&ScriptedIngestion::failing_upload(), &[path]).await;

    match result {
        Err(RunError::Ingestion { asset, reason }) => {
            assert!(asset.ends_with("tender.pdf"));
            assert!(reason.contains("400"));
        }
        other => panic!("expected an ingestion error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_single_mode_rejects_several_inputs() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let inputs = vec![touch(&dir, "a.pdf"), touch(&dir, "b.pdf")];

    let result = ingest::prepare_inputs(&inputs, FileMode::Single, &renderer(), dir.path()).await;

    assert!(matches!(result, Err(RunError::FileMode(2))));
}

#[tokio::test]
async fn test_no_inputs_is_rejected() {
    let dir = TempDir::new().expect("Failed to create temporary directory");

    for mode in [FileMode::Multi, FileMode::Single] {
        let result = ingest::prepare_inputs(&[], mode, &renderer(), dir.path()).await;

        match result {
            Err(err @ RunError::NoInputs) => {
                assert!(err.to_string().starts_with("No input documents given"));
                assert!(!err.to_string().contains("Single-file mode"));
            }
            other => panic!("expected a missing-input error, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_pdf_inputs_pass_through() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let inputs = vec![touch(&dir, "a.pdf"), touch(&dir, "b.PDF")];

    let prepared = ingest::prepare_inputs(&inputs, FileMode::Multi, &renderer(), dir.path())
        .await
        .expect("PDF inputs need no conversion");

    assert_eq!(prepared, inputs);
}

#[tokio::test]
async fn test_unsupported_extension_rejects_batch() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let inputs = vec![touch(&dir, "a.pdf"), touch(&dir, "notes.txt")];

    let result = ingest::prepare_inputs(&inputs, FileMode::Multi, &renderer(), dir.path()).await;

    assert!(matches!(result, Err(RunError::UnsupportedInput(path)) if path.ends_with("notes.txt")));
}

#[tokio::test]
async fn test_missing_input_is_reported() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let inputs = vec![dir.path().join("absent.pdf")];

    let result = ingest::prepare_inputs(&inputs, FileMode::Single, &renderer(), dir.path()).await;

    match result {
        Err(RunError::Ingestion { reason, .. }) => assert_eq!(reason, "file does not exist"),
        other => panic!("expected an ingestion error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_docx_conversion_failure_names_the_input() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let inputs = vec![touch(&dir, "annex.docx")];

    let result = ingest::prepare_inputs(&inputs, FileMode::Single, &renderer(), dir.path()).await;

    match result {
        Err(RunError::Ingestion { asset, .. }) => assert!(asset.ends_with("annex.docx")),
        other => panic!("expected an ingestion error, got {other:?}"),
    }
}
