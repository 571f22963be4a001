//! Runs `predict.py` as a child process.

use super::capture::{drain, CappedBuffer};
use super::{parse_verdict, PredictionPayload, PredictionResult, Predictor};
use crate::config::PredictorSettings;
use crate::constants::MAX_CAPTURE_BYTES;
use crate::error::{PredictError, PredictResult};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// How long to wait for output pipes after the child has been killed. A grandchild that
/// inherited the pipes can keep them open past the kill.
const DRAIN_GRACE: Duration = Duration::from_millis(250);

/// [`Predictor`] backed by one short-lived interpreter process per request.
///
/// Each call spawns its own child, so concurrent predictions share nothing. The configured
/// timeout covers the whole call, from spawn to parsed verdict; when it expires the child is
/// killed without a grace period and reaped before the call returns.
#[derive(Clone, Debug)]
pub struct SubprocessPredictor {
    settings: PredictorSettings,
}

impl SubprocessPredictor {
    pub fn new(settings: PredictorSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &PredictorSettings {
        &self.settings
    }

    async fn run(&self, input: Vec<u8>) -> PredictResult<PredictionResult> {
        let interpreter = self.settings.resolve_interpreter()?;
        let script = self.settings.resolve_script()?;
        let timeout = self.settings.timeout();
        let deadline = Instant::now() + timeout;

        tracing::debug!(
            "spawning predictor: {} {}",
            interpreter.display(),
            script.display()
        );

        let mut child = Command::new(&interpreter)
            .arg(&script)
            .current_dir(self.settings.predictor_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| PredictError::Spawn {
                program: interpreter.display().to_string(),
                source,
            })?;

        let mut stdout_task = child
            .stdout
            .take()
            .map(|out| tokio::spawn(drain(out, MAX_CAPTURE_BYTES)));
        let mut stderr_task = child
            .stderr
            .take()
            .map(|err| tokio::spawn(drain(err, MAX_CAPTURE_BYTES)));

        // The child may exit without reading stdin; a broken pipe here is not a failure.
        let stdin_task = child.stdin.take().map(|mut stdin| {
            tokio::spawn(async move {
                if let Err(e) = stdin.write_all(&input).await {
                    tracing::debug!("predictor stdin write failed: {}", e);
                    return;
                }
                if let Err(e) = stdin.shutdown().await {
                    tracing::debug!("predictor stdin close failed: {}", e);
                }
            })
        });

        let status = match tokio::time::timeout_at(deadline, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                if let Err(e) = child.start_kill() {
                    tracing::warn!("failed to kill predictor: {}", e);
                }
                if let Err(e) = child.wait().await {
                    tracing::warn!("failed to reap predictor: {}", e);
                }
                abort(stdin_task);

                let grace = Instant::now() + DRAIN_GRACE;
                let stdout = collect(&mut stdout_task, grace).await;
                let stderr = collect(&mut stderr_task, grace).await;

                tracing::warn!("predictor timed out after {} ms", timeout.as_millis());
                return Err(PredictError::Timeout {
                    timeout,
                    stdout: stdout.to_string_lossy(),
                    stderr: stderr.to_string_lossy(),
                });
            }
        };

        abort(stdin_task);
        let status = status.map_err(PredictError::Wait)?;

        let stdout = collect(&mut stdout_task, deadline).await;
        let stderr = collect(&mut stderr_task, deadline).await;
        if Instant::now() >= deadline {
            return Err(PredictError::Timeout {
                timeout,
                stdout: stdout.to_string_lossy(),
                stderr: stderr.to_string_lossy(),
            });
        }

        if stdout.truncated() || stderr.truncated() {
            tracing::debug!(
                "predictor output truncated: stdout {} bytes, stderr {} bytes",
                stdout.seen(),
                stderr.seen()
            );
        }

        let stdout = stdout.to_string_lossy();
        let stderr = stderr.to_string_lossy();

        if !status.success() {
            tracing::warn!("predictor exited with status {}", status);
            return Err(PredictError::ProcessExit {
                code: status.code(),
                stderr,
            });
        }

        parse_verdict(&stdout, &stderr)
    }
}

#[async_trait::async_trait]
impl Predictor for SubprocessPredictor {
    async fn predict(&self, payload: &PredictionPayload) -> PredictResult<PredictionResult> {
        let input = payload.to_bytes()?;
        self.run(input).await
    }
}

fn abort(task: Option<JoinHandle<()>>) {
    if let Some(task) = task {
        task.abort();
    }
}

/// Waits for a drain task until `until`, aborting it if it is still running then.
async fn collect(task: &mut Option<JoinHandle<CappedBuffer>>, until: Instant) -> CappedBuffer {
    let Some(handle) = task.as_mut() else {
        return CappedBuffer::new(0);
    };

    match tokio::time::timeout_at(until, &mut *handle).await {
        Ok(Ok(buffer)) => buffer,
        Ok(Err(e)) => {
            tracing::debug!("predictor drain task failed: {}", e);
            CappedBuffer::new(0)
        }
        Err(_) => {
            handle.abort();
            CappedBuffer::new(0)
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::predictor::Disease;
    use serde_json::json;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Writes `body` as `predict.py` and runs it with `/bin/sh`.
    fn sh_predictor(dir: &Path, body: &str, timeout: Duration) -> SubprocessPredictor {
        std::fs::write(dir.join("predict.py"), body).expect("Failed to write script");
        SubprocessPredictor::new(PredictorSettings::new(
            dir.to_path_buf(),
            Some(PathBuf::from("/bin/sh")),
            timeout,
        ))
    }

    fn payload() -> PredictionPayload {
        PredictionPayload::from_value(json!({"age": 52, "sex": "male", "hasDiabetes": false}))
    }

    #[tokio::test]
    async fn test_successful_prediction_returns_object() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            r#"echo '{"diabetes":true,"diabetes_proba":81}'"#,
            Duration::from_secs(5),
        );

        let result = predictor.predict(&payload()).await.expect("prediction");

        assert_eq!(
            serde_json::Value::Object(result.clone().into_map()),
            json!({"diabetes": true, "diabetes_proba": 81})
        );
        assert_eq!(result.at_risk(Disease::Diabetes), Some(true));
    }

    #[tokio::test]
    async fn test_payload_is_written_to_stdin() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(temp_dir.path(), "cat", Duration::from_secs(5));

        let result = predictor.predict(&payload()).await.expect("prediction");

        assert_eq!(
            serde_json::Value::Object(result.into_map()),
            json!({"age": 52, "sex": "male", "hasDiabetes": false})
        );
    }

    #[tokio::test]
    async fn test_runs_in_predictor_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("model.json"), r#"{"cancer":false}"#).unwrap();
        let predictor = sh_predictor(temp_dir.path(), "cat model.json", Duration::from_secs(5));

        let result = predictor.predict(&payload()).await.expect("prediction");
        assert_eq!(result.at_risk(Disease::Cancer), Some(false));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            "echo 'model missing' >&2\nexit 2\n",
            Duration::from_secs(5),
        );

        let err = predictor.predict(&payload()).await.unwrap_err();
        match err {
            PredictError::ProcessExit { code, stderr } => {
                assert_eq!(code, Some(2));
                assert!(stderr.contains("model missing"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_json_stdout_is_invalid_output() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            "echo 'loading model...'\necho 'warning' >&2\n",
            Duration::from_secs(5),
        );

        let err = predictor.predict(&payload()).await.unwrap_err();
        assert_eq!(err.stdout().map(str::trim), Some("loading model..."));
        assert_eq!(err.stderr().map(str::trim), Some("warning"));
        assert!(matches!(err, PredictError::InvalidOutput { .. }));
    }

    #[tokio::test]
    async fn test_reported_error_field_fails_despite_exit_zero() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            r#"echo '{"error": true, "detail": "feature mismatch"}'"#,
            Duration::from_secs(5),
        );

        let err = predictor.predict(&payload()).await.unwrap_err();
        assert!(matches!(err, PredictError::PredictorReported(ref m) if m == "feature mismatch"));
    }

    #[tokio::test]
    async fn test_exit_without_reading_stdin_is_not_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            r#"echo '{"heartDisease":false}'"#,
            Duration::from_secs(5),
        );
        let big = PredictionPayload::from_value(json!({ "fullName": "x".repeat(512 * 1024) }));

        let result = predictor.predict(&big).await.expect("prediction");
        assert_eq!(result.at_risk(Disease::HeartDisease), Some(false));
    }

    #[tokio::test]
    async fn test_timeout_kills_child() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            "sleep 1\ntouch marker\necho '{}'\n",
            Duration::from_millis(100),
        );

        let started = std::time::Instant::now();
        let err = predictor.predict(&payload()).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(err, PredictError::Timeout { .. }));
        assert!(elapsed < Duration::from_millis(900), "took {:?}", elapsed);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(
            !temp_dir.path().join("marker").exists(),
            "killed predictor must not finish its work"
        );
    }

    #[tokio::test]
    async fn test_output_capture_is_capped() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            r"head -c 300000 /dev/zero | tr '\0' a",
            Duration::from_secs(5),
        );

        let err = predictor.predict(&payload()).await.unwrap_err();
        let stdout = err.stdout().expect("stdout attached");
        assert_eq!(stdout.len(), MAX_CAPTURE_BYTES);
        assert!(stdout.bytes().all(|b| b == b'a'));
    }

    #[tokio::test]
    async fn test_stderr_capture_is_capped_on_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = sh_predictor(
            temp_dir.path(),
            "head -c 300000 /dev/zero | tr '\\0' e >&2\nexit 3\n",
            Duration::from_secs(5),
        );

        let err = predictor.predict(&payload()).await.unwrap_err();
        match err {
            PredictError::ProcessExit { code, stderr } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr.len(), MAX_CAPTURE_BYTES);
                assert!(stderr.bytes().all(|b| b == b'e'));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_spawn_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::write(temp_dir.path().join("predict.py"), "").unwrap();
        let predictor = SubprocessPredictor::new(PredictorSettings::new(
            temp_dir.path().to_path_buf(),
            Some(PathBuf::from("/nonexistent/guardian-python")),
            Duration::from_secs(5),
        ));

        let err = predictor.predict(&payload()).await.unwrap_err();
        assert!(matches!(err, PredictError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_missing_script_fails_before_spawn() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let predictor = SubprocessPredictor::new(PredictorSettings::new(
            temp_dir.path().to_path_buf(),
            Some(PathBuf::from("/bin/sh")),
            Duration::from_secs(5),
        ));

        let err = predictor.predict(&payload()).await.unwrap_err();
        assert!(matches!(err, PredictError::Configuration(_)));
    }
}
