//! PDF rendering through a headless office converter.

use crate::config::RenderConfig;
use crate::error::RunError;
use crate::log_debug;

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Runs `<converter> --headless --convert-to pdf --outdir <dir> <input>`
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    converter: String,
    timeout: Duration,
}

impl PdfRenderer {
    pub fn new(converter: impl Into<String>, timeout: Duration) -> Self {
        Self {
            converter: converter.into(),
            timeout,
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(
            config.converter.clone(),
            Duration::from_secs(config.converter_timeout_seconds),
        )
    }

    /// Where the converter will place the PDF for `input`
    pub fn output_path(input: &Path, out_dir: &Path) -> PathBuf {
        let mut name = input
            .file_stem()
            .map_or_else(|| "document".into(), |stem| stem.to_os_string());
        name.push(".pdf");
        out_dir.join(name)
    }

    /// Convert `input` to PDF inside `out_dir`, returning the PDF path
    pub async fn convert_to_pdf(&self, input: &Path, out_dir: &Path) -> Result<PathBuf, RunError> {
        let expected = Self::output_path(input, out_dir);

        let mut command = Command::new(&self.converter);
        command
            .arg("--headless")
            .args(["--convert-to", "pdf", "--outdir"])
            .arg(out_dir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        log_debug!("Executing converter: {:?}", command);

        let child = command.spawn().map_err(|e| {
            RunError::Render(format!("Could not start '{}': {e}", self.converter))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                RunError::Render(format!(
                    "'{}' did not finish within {}s converting {}",
                    self.converter,
                    self.timeout.as_secs(),
                    input.display()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::Render(format!(
                "'{}' failed with exit code {:?}: {}",
                self.converter,
                output.status.code(),
                stderr.trim()
            )));
        }

        if !expected.exists() {
            return Err(RunError::Render(format!(
                "Converter reported success but {} was not created",
                expected.display()
            )));
        }

        log_debug!("Rendered {} to {}", input.display(), expected.display());
        Ok(expected)
    }
}
