//! services/gateway/src/adapters/extractor.rs
//!
//! This module contains the adapter for the external OCR program. It implements
//! the `ExtractionService` port by running the configured command with the
//! uploaded file's path as its last argument and parsing the JSON report it
//! prints on standard output.

use async_trait::async_trait;
use conceptify_core::extraction::{Extraction, ExtractorReport};
use conceptify_core::ports::{ExtractionService, PortError, PortResult};
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::ExtractorConfig;

/// Environment variable carrying the uploader's id to the child process.
pub const USER_ID_ENV: &str = "OCR_USER_ID";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ExtractionService` port by spawning a child process.
#[derive(Clone)]
pub struct ProcessExtractor {
    config: ExtractorConfig,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
}

impl ProcessExtractor {
    /// Creates a new `ProcessExtractor`. Cancelling `shutdown` kills every
    /// running extraction.
    pub fn new(config: ExtractorConfig, shutdown: CancellationToken) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent));
        Self {
            config,
            permits,
            shutdown,
        }
    }

    fn command(&self, file: &Path, user_id: Option<&str>) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .arg(file)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        if let Some(user_id) = user_id {
            cmd.env(USER_ID_ENV, user_id);
        }
        cmd
    }
}

//=========================================================================================
// `ExtractionService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ExtractionService for ProcessExtractor {
    async fn extract(&self, file: &Path, user_id: Option<&str>) -> PortResult<Extraction> {
        // Reject rather than queue when every slot is taken.
        let _permit = self.permits.try_acquire().map_err(|_| PortError::Busy)?;

        let started = Instant::now();
        info!("Running extractor on {}", file.display());
        let child = self.command(file, user_id).spawn().map_err(|e| {
            error!("Failed to start extractor '{}': {}", self.config.program, e);
            PortError::Extraction {
                message: "OCR processing failed".to_string(),
                details: format!("Could not start {}: {}", self.config.program, e),
            }
        })?;

        // Dropping the child on timeout or shutdown kills it.
        let output = tokio::select! {
            _ = self.shutdown.cancelled() => {
                return Err(PortError::Unexpected(
                    "Extraction cancelled: server is shutting down".to_string(),
                ));
            }
            waited = tokio::time::timeout(self.config.timeout, child.wait_with_output()) => {
                match waited {
                    Err(_) => {
                        error!(
                            "Extractor exceeded {:?} on {}",
                            self.config.timeout,
                            file.display()
                        );
                        return Err(PortError::Timeout(self.config.timeout.as_secs()));
                    }
                    Ok(output) => output.map_err(|e| PortError::Unexpected(e.to_string()))?,
                }
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        info!(
            "Extractor exited with {} after {:.2?}",
            output.status,
            started.elapsed()
        );

        if !output.status.success() {
            error!("Extractor error output: {}", stderr);
            return Err(PortError::Extraction {
                message: "OCR processing failed".to_string(),
                details: stderr,
            });
        }
        if !stderr.trim().is_empty() {
            debug!("Extractor diagnostics: {}", stderr.trim());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        ExtractorReport::parse(&stdout)?.into_extraction()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn shell(script: &str, timeout: Duration, max_concurrent: usize) -> ExtractorConfig {
        ExtractorConfig {
            program: "sh".to_string(),
            // `sh -c script name file`: the file path lands in $1.
            args: vec!["-c".to_string(), script.to_string(), "extractor".to_string()],
            working_dir: None,
            timeout,
            max_concurrent,
        }
    }

    fn extractor(script: &str) -> ProcessExtractor {
        ProcessExtractor::new(
            shell(script, Duration::from_secs(10), 2),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn parses_a_successful_report() {
        let ex = extractor(
            r#"printf '{"finalExtractedText":"from %s","keyTopics":["a","b"],"wordCount":2}' "$1""#,
        );
        let extraction = ex.extract(Path::new("/tmp/scan.png"), None).await.unwrap();
        assert_eq!(extraction.final_text, "from /tmp/scan.png");
        assert_eq!(extraction.key_topics, vec!["a", "b"]);
        assert_eq!(extraction.word_count, 2);
    }

    #[tokio::test]
    async fn forwards_user_id_through_the_environment() {
        let ex = extractor(r#"printf '{"finalExtractedText":"%s"}' "$OCR_USER_ID""#);
        let extraction = ex
            .extract(Path::new("scan.png"), Some("user-7"))
            .await
            .unwrap();
        assert_eq!(extraction.final_text, "user-7");
    }

    #[tokio::test]
    async fn non_zero_exit_carries_stderr() {
        let ex = extractor("echo 'tesseract missing' >&2; exit 3");
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        match err {
            PortError::Extraction { message, details } => {
                assert_eq!(message, "OCR processing failed");
                assert!(details.contains("tesseract missing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn logical_failure_on_zero_exit() {
        let ex = extractor(r#"echo '{"success": false, "error": "unreadable image"}'"#);
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        assert_eq!(
            err,
            PortError::Extraction {
                message: "OCR processing failed".to_string(),
                details: "unreadable image".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn unparseable_output_is_malformed() {
        let ex = extractor("echo 'Loading model...'");
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        assert!(matches!(err, PortError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn missing_program_is_an_extraction_error() {
        let mut config = shell("true", Duration::from_secs(1), 1);
        config.program = "/nonexistent/ocr-binary".to_string();
        let ex = ProcessExtractor::new(config, CancellationToken::new());
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        assert!(matches!(err, PortError::Extraction { .. }));
    }

    #[tokio::test]
    async fn slow_extractor_times_out() {
        let ex = ProcessExtractor::new(
            shell("sleep 5", Duration::from_millis(200), 1),
            CancellationToken::new(),
        );
        let started = Instant::now();
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        assert_eq!(err, PortError::Timeout(0));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn saturated_extractor_reports_busy() {
        let ex = Arc::new(ProcessExtractor::new(
            shell("sleep 2; echo '{}'", Duration::from_secs(10), 1),
            CancellationToken::new(),
        ));
        let running = {
            let ex = ex.clone();
            tokio::spawn(async move { ex.extract(Path::new("a.png"), None).await })
        };
        tokio::time::sleep(Duration::from_millis(200)).await;

        let err = ex.extract(Path::new("b.png"), None).await.unwrap_err();
        assert_eq!(err, PortError::Busy);
        assert!(running.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn shutdown_cancels_running_extractions() {
        let token = CancellationToken::new();
        let ex = ProcessExtractor::new(shell("sleep 5", Duration::from_secs(10), 1), token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            token.cancel();
        });

        let started = Instant::now();
        let err = ex.extract(Path::new("scan.png"), None).await.unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));
        assert!(started.elapsed() < Duration::from_secs(4));
        canceller.await.unwrap();
    }
}
