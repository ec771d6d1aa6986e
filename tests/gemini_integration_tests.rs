#![cfg(feature = "integration")]

use anyhow::Result;
use rfp_autofill::config::{API_KEY_ENV, GeminiConfig};
use rfp_autofill::dispatch::QueryDispatcher;
use rfp_autofill::ingest::{self, PollSettings};
use rfp_autofill::llm::CompletionService;
use rfp_autofill::llm_providers::GeminiClient;
use rfp_autofill::questions::QueryItem;
use std::env;
use std::sync::Arc;
use std::time::Duration;

// Uploads a real PDF and asks one question against the live API
#[tokio::test]
async fn test_live_upload_and_question() -> Result<()> {
    if env::var(API_KEY_ENV).is_err() || env::var("SKIP_REMOTE_TESTS").is_ok() {
        return Ok(());
    }
    let Ok(pdf) = env::var("RFP_AUTOFILL_TEST_PDF") else {
        return Ok(());
    };

    let client = Arc::new(GeminiClient::new(GeminiConfig::default())?);
    let handles = ingest::upload_all(client.as_ref(), &[pdf.into()]).await?;
    ingest::wait_for_active(
        client.as_ref(),
        &handles,
        PollSettings {
            interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
        },
    )
    .await?;

    let completion: Arc<dyn CompletionService> = client;
    let dispatcher = QueryDispatcher::new(completion, None);
    let records = dispatcher
        .dispatch(
            &handles,
            &[QueryItem::new("Summarize this document in one sentence.", "<<Summary>>")],
            |_| {},
        )
        .await?;

    assert_eq!(records.len(), 1);
    assert!(!records[0].raw_text.is_empty());
    Ok(())
}
