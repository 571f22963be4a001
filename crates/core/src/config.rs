//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services. The
//! binaries read environment variables and hand the raw values to the `*_from_env_value(s)`
//! functions here, so nothing in request handling touches process-wide state.

use crate::constants::{
    ACCOUNTS_DIR_NAME, CSV_EXPORT_FILENAME, DEFAULT_CHAT_MODEL, DEFAULT_OPENAI_BASE_URL,
    DEFAULT_PREDICT_TIMEOUT, DEFAULT_UPSTREAM_TIMEOUT, HEALTH_FORMS_DIR_NAME, PREDICT_SCRIPT_NAME,
};
use crate::error::{GuardianError, GuardianResult, PredictError, PredictResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Storage configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    csv_path: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `csv_path` defaults to `<data_dir>/user_data.csv`.
    pub fn new(data_dir: PathBuf, csv_path: Option<PathBuf>) -> GuardianResult<Self> {
        if data_dir.as_os_str().is_empty() {
            return Err(GuardianError::InvalidInput(
                "data directory cannot be empty".into(),
            ));
        }

        let csv_path = csv_path.unwrap_or_else(|| data_dir.join(CSV_EXPORT_FILENAME));
        Ok(Self { data_dir, csv_path })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn health_forms_dir(&self) -> PathBuf {
        self.data_dir.join(HEALTH_FORMS_DIR_NAME)
    }

    pub fn accounts_dir(&self) -> PathBuf {
        self.data_dir.join(ACCOUNTS_DIR_NAME)
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }

    /// Creates the data directory tree if it does not exist yet.
    pub fn ensure_dirs(&self) -> GuardianResult<()> {
        for dir in [self.health_forms_dir(), self.accounts_dir()] {
            std::fs::create_dir_all(&dir).map_err(GuardianError::StorageDirCreation)?;
        }
        if let Some(parent) = self.csv_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(GuardianError::StorageDirCreation)?;
            }
        }
        Ok(())
    }
}

/// How to locate and run the external predictor.
///
/// Resolution happens per request (see [`PredictorSettings::resolve_interpreter`]) so that a
/// missing interpreter or script fails the affected prediction without stopping the server.
#[derive(Clone, Debug)]
pub struct PredictorSettings {
    predictor_dir: PathBuf,
    interpreter_override: Option<PathBuf>,
    timeout: Duration,
}

impl PredictorSettings {
    pub fn new(
        predictor_dir: PathBuf,
        interpreter_override: Option<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            predictor_dir,
            interpreter_override,
            timeout,
        }
    }

    /// Working directory of the predictor; also where `predict.py` and `venv/` are looked up.
    pub fn predictor_dir(&self) -> &Path {
        &self.predictor_dir
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Picks the interpreter to run the predictor with.
    ///
    /// Order: explicit override, `venv/Scripts/python.exe`, `venv/bin/python`, then `python`
    /// (Windows) or `python3` found on `PATH`. The override is used verbatim, without an
    /// existence check, so a bare command name is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`PredictError::Configuration`] if no interpreter can be found.
    pub fn resolve_interpreter(&self) -> PredictResult<PathBuf> {
        if let Some(path) = &self.interpreter_override {
            return Ok(path.clone());
        }

        let venv_windows = self
            .predictor_dir
            .join("venv")
            .join("Scripts")
            .join("python.exe");
        if venv_windows.is_file() {
            return Ok(venv_windows);
        }

        let venv_unix = self.predictor_dir.join("venv").join("bin").join("python");
        if venv_unix.is_file() {
            return Ok(venv_unix);
        }

        let fallback = if cfg!(windows) { "python" } else { "python3" };
        which::which(fallback).map_err(|e| {
            PredictError::Configuration(format!(
                "no python interpreter found (set PYTHON_PATH): {}: {}",
                fallback, e
            ))
        })
    }

    /// Returns the path of `predict.py`, which must exist.
    pub fn resolve_script(&self) -> PredictResult<PathBuf> {
        let script = self.predictor_dir.join(PREDICT_SCRIPT_NAME);
        if script.is_file() {
            Ok(script)
        } else {
            Err(PredictError::Configuration(format!(
                "{} not found on server",
                PREDICT_SCRIPT_NAME
            )))
        }
    }
}

/// Connection settings for the conversational-AI service.
#[derive(Clone)]
pub struct AssistantConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout: Duration,
}

impl fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the predictor timeout (milliseconds) from an optional string value.
///
/// If `value` is `None` or blank, returns the 15 s default.
pub fn predict_timeout_from_env_value(value: Option<String>) -> GuardianResult<Duration> {
    match non_blank(value) {
        None => Ok(DEFAULT_PREDICT_TIMEOUT),
        Some(v) => {
            let ms: u64 = v.parse().map_err(|_| {
                GuardianError::InvalidInput(format!("predict timeout must be milliseconds: {}", v))
            })?;
            if ms == 0 {
                return Err(GuardianError::InvalidInput(
                    "predict timeout must be greater than zero".into(),
                ));
            }
            Ok(Duration::from_millis(ms))
        }
    }
}

/// Build the AI service configuration from optional string values.
///
/// Returns `Ok(None)` when no API key is set; the chat route then reports the missing
/// configuration per request.
pub fn assistant_config_from_env_values(
    api_key: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<String>,
) -> GuardianResult<Option<AssistantConfig>> {
    let Some(api_key) = non_blank(api_key) else {
        return Ok(None);
    };

    let request_timeout = match non_blank(timeout_secs) {
        None => DEFAULT_UPSTREAM_TIMEOUT,
        Some(v) => {
            let secs: u64 = v.parse().map_err(|_| {
                GuardianError::InvalidInput(format!("upstream timeout must be seconds: {}", v))
            })?;
            if secs == 0 {
                return Err(GuardianError::InvalidInput(
                    "upstream timeout must be greater than zero".into(),
                ));
            }
            Duration::from_secs(secs)
        }
    };

    Ok(Some(AssistantConfig {
        api_key,
        model: non_blank(model).unwrap_or_else(|| DEFAULT_CHAT_MODEL.into()),
        base_url: non_blank(base_url)
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.into())
            .trim_end_matches('/')
            .to_string(),
        request_timeout,
    }))
}

/// Resolve the REST listen address: an explicit address wins, else `0.0.0.0:<port>` with
/// port 5000 by default.
pub fn rest_addr_from_env_values(addr: Option<String>, port: Option<String>) -> String {
    non_blank(addr).unwrap_or_else(|| {
        format!(
            "0.0.0.0:{}",
            non_blank(port).unwrap_or_else(|| "5000".into())
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_core_config_defaults_csv_into_data_dir() {
        let cfg = CoreConfig::new(PathBuf::from("/srv/guardian"), None).unwrap();
        assert_eq!(cfg.csv_path(), Path::new("/srv/guardian/user_data.csv"));
        assert_eq!(cfg.health_forms_dir(), PathBuf::from("/srv/guardian/health_forms"));
        assert_eq!(cfg.accounts_dir(), PathBuf::from("/srv/guardian/accounts"));
    }

    #[test]
    fn test_core_config_rejects_empty_data_dir() {
        let err = CoreConfig::new(PathBuf::new(), None).expect_err("empty dir should fail");
        assert!(matches!(err, GuardianError::InvalidInput(_)));
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let data_dir = temp_dir.path().join("data");
        let cfg = CoreConfig::new(data_dir.clone(), Some(temp_dir.path().join("export/out.csv")))
            .unwrap();

        cfg.ensure_dirs().expect("ensure_dirs should succeed");

        assert!(data_dir.join("health_forms").is_dir());
        assert!(data_dir.join("accounts").is_dir());
        assert!(temp_dir.path().join("export").is_dir());
    }

    #[test]
    fn test_interpreter_override_wins() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let venv_bin = temp_dir.path().join("venv").join("bin");
        std::fs::create_dir_all(&venv_bin).unwrap();
        std::fs::write(venv_bin.join("python"), "").unwrap();

        let settings = PredictorSettings::new(
            temp_dir.path().to_path_buf(),
            Some(PathBuf::from("/opt/custom/python")),
            DEFAULT_PREDICT_TIMEOUT,
        );

        assert_eq!(
            settings.resolve_interpreter().unwrap(),
            PathBuf::from("/opt/custom/python")
        );
    }

    #[test]
    fn test_interpreter_prefers_venv() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let venv_bin = temp_dir.path().join("venv").join("bin");
        std::fs::create_dir_all(&venv_bin).unwrap();
        std::fs::write(venv_bin.join("python"), "").unwrap();

        let settings =
            PredictorSettings::new(temp_dir.path().to_path_buf(), None, DEFAULT_PREDICT_TIMEOUT);

        assert_eq!(settings.resolve_interpreter().unwrap(), venv_bin.join("python"));
    }

    #[test]
    fn test_missing_script_is_configuration_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let settings =
            PredictorSettings::new(temp_dir.path().to_path_buf(), None, DEFAULT_PREDICT_TIMEOUT);

        let err = settings.resolve_script().expect_err("script is missing");
        assert!(matches!(err, PredictError::Configuration(msg) if msg.contains("predict.py")));
    }

    #[test]
    fn test_predict_timeout_parsing() {
        assert_eq!(
            predict_timeout_from_env_value(None).unwrap(),
            DEFAULT_PREDICT_TIMEOUT
        );
        assert_eq!(
            predict_timeout_from_env_value(Some("  ".into())).unwrap(),
            DEFAULT_PREDICT_TIMEOUT
        );
        assert_eq!(
            predict_timeout_from_env_value(Some("2500".into())).unwrap(),
            Duration::from_millis(2500)
        );
        assert!(predict_timeout_from_env_value(Some("0".into())).is_err());
        assert!(predict_timeout_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn test_assistant_config_absent_without_key() {
        let cfg = assistant_config_from_env_values(None, Some("x".into()), None, None).unwrap();
        assert!(cfg.is_none());

        let cfg = assistant_config_from_env_values(Some("".into()), None, None, None).unwrap();
        assert!(cfg.is_none());
    }

    #[test]
    fn test_assistant_config_defaults() {
        let cfg = assistant_config_from_env_values(Some("sk-test".into()), None, None, None)
            .unwrap()
            .expect("config should be present");

        assert_eq!(cfg.model, DEFAULT_CHAT_MODEL);
        assert_eq!(cfg.base_url, DEFAULT_OPENAI_BASE_URL);
        assert_eq!(cfg.request_timeout, DEFAULT_UPSTREAM_TIMEOUT);
        assert!(!format!("{:?}", cfg).contains("sk-test"));
    }

    #[test]
    fn test_assistant_config_trims_base_url_and_parses_timeout() {
        let cfg = assistant_config_from_env_values(
            Some("sk-test".into()),
            Some("gpt-test".into()),
            Some("http://localhost:9999/v1/".into()),
            Some("5".into()),
        )
        .unwrap()
        .unwrap();

        assert_eq!(cfg.model, "gpt-test");
        assert_eq!(cfg.base_url, "http://localhost:9999/v1");
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_rest_addr_resolution() {
        assert_eq!(rest_addr_from_env_values(None, None), "0.0.0.0:5000");
        assert_eq!(
            rest_addr_from_env_values(None, Some("8080".into())),
            "0.0.0.0:8080"
        );
        assert_eq!(
            rest_addr_from_env_values(Some("127.0.0.1:3000".into()), Some("8080".into())),
            "127.0.0.1:3000"
        );
    }
}
