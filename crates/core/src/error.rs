use std::time::Duration;

/// Errors from record storage, accounts, export and configuration.
#[derive(Debug, thiserror::Error)]
pub enum GuardianError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("account already exists: {0}")]
    AccountExists(String),
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write CSV export: {0}")]
    CsvWrite(std::io::Error),
    #[error("failed to serialize record: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("record id error: {0}")]
    Uuid(#[from] guardian_uuid::UuidError),
}

pub type GuardianResult<T> = std::result::Result<T, GuardianError>;

/// Failure of a single prediction request. None of these are retried.
#[derive(Debug, thiserror::Error)]
pub enum PredictError {
    /// Nothing to run: interpreter or script could not be resolved.
    #[error("predictor not configured: {0}")]
    Configuration(String),
    #[error("failed to spawn predictor '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for predictor: {0}")]
    Wait(std::io::Error),
    #[error("predictor timed out after {} ms", .timeout.as_millis())]
    Timeout {
        timeout: Duration,
        stdout: String,
        stderr: String,
    },
    #[error("predictor exited with code {}", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    ProcessExit { code: Option<i32>, stderr: String },
    #[error("invalid JSON returned by predictor: {reason}")]
    InvalidOutput {
        reason: String,
        stdout: String,
        stderr: String,
    },
    #[error("{0}")]
    PredictorReported(String),
}

impl PredictError {
    /// Captured standard output, when the failure carries it.
    pub fn stdout(&self) -> Option<&str> {
        match self {
            PredictError::Timeout { stdout, .. } | PredictError::InvalidOutput { stdout, .. } => {
                Some(stdout)
            }
            _ => None,
        }
    }

    /// Captured standard error, when the failure carries it.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            PredictError::Timeout { stderr, .. }
            | PredictError::ProcessExit { stderr, .. }
            | PredictError::InvalidOutput { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}

pub type PredictResult<T> = std::result::Result<T, PredictError>;

/// Failure of a chat exchange.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Content flagged by moderation")]
    ModerationFlagged,
    #[error("upstream AI service error: {0}")]
    Upstream(String),
    #[error("No reply from AI")]
    EmptyReply,
}

impl From<reqwest::Error> for AssistantError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AssistantError::Upstream(format!("request timed out: {}", err))
        } else {
            AssistantError::Upstream(err.to_string())
        }
    }
}

pub type AssistantResult<T> = std::result::Result<T, AssistantError>;
