use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use glimpse_config::OcrProviderKind;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::provider::{OcrError, OcrProvider};

const DEFAULT_LANGUAGE: &str = "eng";

/// Local OCR by piping the image through the `tesseract` executable
pub struct LocalOcrProvider {
    command: PathBuf,
}

impl LocalOcrProvider {
    pub fn new(command: PathBuf) -> Self {
        Self { command }
    }

    fn args(language: &str) -> [&str; 4] {
        ["stdin", "stdout", "-l", language]
    }
}

#[async_trait::async_trait]
impl OcrProvider for LocalOcrProvider {
    async fn recognize(&self, image: &[u8], language_hint: &str) -> Result<String, OcrError> {
        let language = if language_hint.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            language_hint
        };

        tracing::debug!(
            "Running {} (Lang: {language})...",
            self.command.display()
        );

        let mut child = Command::new(&self.command)
            .args(Self::args(language))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => OcrError::NotConfigured(format!(
                    "Tesseract not found at '{}'. Install it or set the Tesseract path.",
                    self.command.display()
                )),
                _ => OcrError::Local(format!("Failed to start tesseract: {e}")),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(image)
                .await
                .map_err(|e| OcrError::Local(format!("Failed to send image to tesseract: {e}")))?;
            // Dropping stdin closes the pipe so tesseract starts reading
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrError::Local(format!("tesseract did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(OcrError::Local(format!(
                "tesseract exited with {}: {first_line}",
                output.status
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!("Tesseract OCR result received (Length: {}).", text.len());
        Ok(text)
    }

    fn name(&self) -> &str {
        OcrProviderKind::Local.display_name()
    }
}
