//! Preparing source documents and registering them with the file service.

use crate::error::{RunError, ServiceError};
use crate::llm::{AssetHandle, AssetState, IngestionService};
use crate::pipeline::FileMode;
use crate::render::PdfRenderer;
use crate::{log_debug, log_info};

use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Accepted input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Pdf,
    /// Converted to PDF before upload
    Docx,
}

impl InputKind {
    pub fn detect(path: &Path) -> Result<Self, RunError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("pdf") => Ok(Self::Pdf),
            Some("docx") => Ok(Self::Docx),
            _ => Err(RunError::UnsupportedInput(path.to_path_buf())),
        }
    }
}

/// Polling cadence and ceiling for asset readiness
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_wait: Duration::from_secs(900),
        }
    }
}

/// Validate the inputs against the file mode and convert `.docx` files to PDF.
///
/// Converted files are written to `scratch_dir`; PDF inputs are passed through.
pub async fn prepare_inputs(
    inputs: &[PathBuf],
    file_mode: FileMode,
    renderer: &PdfRenderer,
    scratch_dir: &Path,
) -> Result<Vec<PathBuf>, RunError> {
    if inputs.is_empty() {
        return Err(RunError::NoInputs);
    }
    if file_mode == FileMode::Single && inputs.len() != 1 {
        return Err(RunError::FileMode(inputs.len()));
    }

    // Reject the whole batch before doing any conversion work
    let kinds = inputs
        .iter()
        .map(|path| InputKind::detect(path))
        .collect::<Result<Vec<_>, _>>()?;

    let mut prepared = Vec::with_capacity(inputs.len());
    for (path, kind) in inputs.iter().zip(kinds) {
        if !path.is_file() {
            return Err(RunError::Ingestion {
                asset: path.display().to_string(),
                reason: "file does not exist".to_string(),
            });
        }
        match kind {
            InputKind::Pdf => prepared.push(path.clone()),
            InputKind::Docx => {
                log_info!("Converting {} to PDF", path.display());
                let pdf = renderer
                    .convert_to_pdf(path, scratch_dir)
                    .await
                    .map_err(|e| RunError::Ingestion {
                        asset: path.display().to_string(),
                        reason: e.to_string(),
                    })?;
                prepared.push(pdf);
            }
        }
    }
    Ok(prepared)
}

/// Upload every prepared file, in order
pub async fn upload_all(
    service: &dyn IngestionService,
    paths: &[PathBuf],
) -> Result<Vec<AssetHandle>, RunError> {
    let mut handles = Vec::with_capacity(paths.len());
    for path in paths {
        let handle = service
            .upload(path, PDF_MIME_TYPE)
            .await
            .map_err(|e| ingestion_error(path.display().to_string(), &e))?;
        log_info!("Uploaded file '{}' as: {}", handle.display_name, handle.uri);
        handles.push(handle);
    }
    Ok(handles)
}

/// Wait until every asset is active.
///
/// A failed or unknown state aborts immediately; an asset still processing
/// after `max_wait` is reported as an ingestion failure.
pub async fn wait_for_active(
    service: &dyn IngestionService,
    handles: &[AssetHandle],
    settings: PollSettings,
) -> Result<(), RunError> {
    for handle in handles {
        let started = Instant::now();
        loop {
            let state = service
                .poll_status(handle)
                .await
                .map_err(|e| ingestion_error(handle.display_name.clone(), &e))?;
            log_debug!("{} is {}", handle.name, state);

            match state {
                AssetState::Active => break,
                AssetState::Processing => {
                    if started.elapsed() + settings.interval > settings.max_wait {
                        return Err(RunError::Ingestion {
                            asset: handle.display_name.clone(),
                            reason: format!(
                                "still processing after {}s",
                                settings.max_wait.as_secs()
                            ),
                        });
                    }
                    tokio::time::sleep(settings.interval).await;
                }
                AssetState::Failed | AssetState::StateUnspecified => {
                    return Err(RunError::Ingestion {
                        asset: handle.display_name.clone(),
                        reason: format!("file entered state {state}"),
                    });
                }
            }
        }
    }
    log_info!("All {} file(s) ready", handles.len());
    Ok(())
}

fn ingestion_error(asset: String, error: &ServiceError) -> RunError {
    RunError::Ingestion {
        asset,
        reason: error.to_string(),
    }
}
