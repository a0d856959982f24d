use async_trait::async_trait;
use ocr_models::{EngineConfig, OcrError};
use std::io::ErrorKind;
use std::process::{Output, Stdio};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

use crate::{parse_tsv, EngineOptions, OcrEngine, RecognizedWord};

const STDERR_TAIL_LINES: usize = 5;

/// Drives the `tesseract` command-line binary, one child process per call.
#[derive(Clone, Debug)]
pub struct TesseractEngine {
    binary: String,
    tessdata_dir: Option<String>,
    engine_mode: Option<u8>,
    thread_limit: u32,
}

impl TesseractEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            tessdata_dir: config.tessdata_dir.clone(),
            engine_mode: config.engine_mode,
            thread_limit: config.thread_limit,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.env("OMP_THREAD_LIMIT", self.thread_limit.max(1).to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> OcrError {
        let reason = match e.kind() {
            ErrorKind::NotFound => format!("'{}' not found on PATH", self.binary),
            ErrorKind::PermissionDenied => format!("'{}' is not executable", self.binary),
            _ => format!("failed to start '{}': {}", self.binary, e),
        };
        OcrError::EngineUnavailable { reason }
    }

    async fn run(&self, mut cmd: Command) -> Result<Output, OcrError> {
        cmd.output().await.map_err(|e| self.spawn_error(e))
    }

    /// First line of `tesseract --version`, e.g. `tesseract 5.3.0`.
    #[instrument(skip(self))]
    pub async fn version(&self) -> Result<String, OcrError> {
        let mut cmd = self.command();
        cmd.arg("--version");
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(failure(&output.stderr, "--version"));
        }
        // Older releases print the banner on stderr.
        let text = if output.stdout.is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            String::from_utf8_lossy(&output.stdout).into_owned()
        };
        text.lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string)
            .ok_or_else(|| OcrError::EngineFailure {
                reason: "empty version output".to_string(),
            })
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("; ")
}

fn failure(stderr: &[u8], context: &str) -> OcrError {
    let tail = stderr_tail(stderr);
    OcrError::EngineFailure {
        reason: if tail.is_empty() {
            format!("tesseract {context} exited with an error")
        } else {
            tail
        },
    }
}

fn is_missing_language(stderr: &str) -> bool {
    stderr.contains("Failed loading language") || stderr.contains("Error opening data file")
}

/// Language codes from `tesseract --list-langs` output.
pub fn parse_language_list(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("List of available languages"))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    fn name(&self) -> &str {
        "tesseract"
    }

    #[instrument(skip(self, png), fields(bytes = png.len()))]
    async fn recognize(
        &self,
        png: &[u8],
        options: &EngineOptions,
    ) -> Result<Vec<RecognizedWord>, OcrError> {
        let mut cmd = self.command();
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(&options.language)
            .arg("--psm")
            .arg(options.page_segmentation_mode.to_string());
        if let Some(oem) = self.engine_mode {
            cmd.arg("--oem").arg(oem.to_string());
        }
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        cmd.arg("tsv").stdin(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| self.spawn_error(e))?;
        let mut stdin = child.stdin.take().ok_or_else(|| OcrError::InternalError {
            reason: "tesseract stdin was not captured".to_string(),
        })?;

        // Feed stdin while draining stdout/stderr so neither pipe can fill up.
        let input = png.to_vec();
        let feed = async move {
            let result = stdin.write_all(&input).await;
            drop(stdin);
            result
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| OcrError::EngineFailure {
            reason: format!("failed to collect tesseract output: {e}"),
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            if is_missing_language(&stderr) {
                return Err(OcrError::MissingLanguage {
                    language: options.language.clone(),
                });
            }
            warn!(status = %output.status, "tesseract exited with an error");
            return Err(failure(&output.stderr, "recognition"));
        }
        if let Err(e) = fed {
            return Err(OcrError::EngineFailure {
                reason: format!("failed to send image to tesseract: {e}"),
            });
        }
        if !stderr.trim().is_empty() {
            debug!(stderr = %stderr.trim(), "tesseract diagnostics");
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_tsv(&stdout)
    }

    #[instrument(skip(self))]
    async fn languages(&self) -> Result<Vec<String>, OcrError> {
        let mut cmd = self.command();
        cmd.arg("--list-langs");
        if let Some(dir) = &self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }
        let output = self.run(cmd).await?;
        if !output.status.success() {
            return Err(failure(&output.stderr, "--list-langs"));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = if stdout.trim().is_empty() {
            String::from_utf8_lossy(&output.stderr).into_owned()
        } else {
            stdout.into_owned()
        };
        Ok(parse_language_list(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_language_list() {
        let out = "List of available languages in \"/usr/share/tesseract-ocr/5/tessdata/\" (3):\neng\nosd\nchi_sim\n";
        assert_eq!(parse_language_list(out), vec!["eng", "osd", "chi_sim"]);
    }

    #[test]
    fn detects_missing_language_packs() {
        let stderr = "Error opening data file /usr/share/tessdata/xyz.traineddata\nFailed loading language 'xyz'\nTesseract couldn't load any languages!";
        assert!(is_missing_language(stderr));
        assert!(!is_missing_language("Warning: Invalid resolution 0 dpi."));
    }

    #[test]
    fn stderr_tail_keeps_last_lines() {
        let stderr = b"1\n2\n\n3\n4\n5\n6\n7\n";
        assert_eq!(stderr_tail(stderr), "3; 4; 5; 6; 7");
        assert_eq!(stderr_tail(b""), "");
    }
}
