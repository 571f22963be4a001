//! Constants used throughout the Guardian core crate.
//!
//! Paths, filenames, limits and fixed texts live here so the HTTP layer, the CLI and the
//! tests agree on them.

use std::time::Duration;

/// Default directory for persisted records when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "guardian_data";

/// Directory name (under the data dir) for submitted health forms.
pub const HEALTH_FORMS_DIR_NAME: &str = "health_forms";

/// Directory name (under the data dir) for user accounts.
pub const ACCOUNTS_DIR_NAME: &str = "accounts";

/// Filename of a stored health form inside its sharded record directory.
pub const HEALTH_FORM_FILENAME: &str = "form.json";

/// Filename of a stored account inside its account directory.
pub const ACCOUNT_FILENAME: &str = "account.yaml";

/// Filename of the CSV export.
pub const CSV_EXPORT_FILENAME: &str = "user_data.csv";

/// Filename of the external prediction script, relative to the predictor directory.
pub const PREDICT_SCRIPT_NAME: &str = "predict.py";

/// Maximum number of bytes retained per captured predictor stream (stdout and stderr each).
pub const MAX_CAPTURE_BYTES: usize = 200 * 1024;

/// Default wall-clock budget for one predictor run.
pub const DEFAULT_PREDICT_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Default request timeout for calls to the conversational-AI service.
pub const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Default chat completion model.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

/// Default base URL of the conversational-AI service.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Moderation model used for the content-safety pre-check.
pub const MODERATION_MODEL: &str = "omni-moderation-latest";

/// Maximum number of characters of conversation sent to moderation.
pub const MODERATION_INPUT_LIMIT: usize = 3000;

/// Completion parameters.
pub const CHAT_MAX_TOKENS: u32 = 700;
pub const CHAT_TEMPERATURE: f32 = 0.2;

/// Soft refusal returned when a chat message is not health related.
pub const OFF_TOPIC_REPLY: &str =
    "I only provide general health information — please ask a health-related question.";

/// System prompt placed in front of every completion request.
pub const GUARDIAN_SYSTEM_PROMPT: &str = r#"You are a concise, careful, evidence-informed medical-information assistant called "Guardian".
- Only answer QUESTIONS DIRECTLY RELATED TO HEALTH, SYMPTOMS, PREVENTION, OR NEXT STEPS.
- If the user asks anything NOT ABOUT HEALTH, refuse in one short sentence: "I only provide general health information — please ask a health-related question."
- Do NOT provide definitive diagnoses or prescribe medications.
- For urgent or red-flag symptoms (difficulty breathing, chest pain, fainting, severe bleeding), clearly advise to seek immediate emergency care.
- Keep replies concise and end with: "This is educational information only.""#;
