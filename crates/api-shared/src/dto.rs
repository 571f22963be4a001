//! Wire types exchanged with the frontend and passed on to the predictor.
//!
//! Field names follow the frontend's camelCase JSON. Every health attribute is optional on the
//! wire; absent attributes are omitted when re-serialised so the predictor sees exactly what
//! the user supplied.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================================
// HEALTH ATTRIBUTES
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    #[default]
    Male,
    Female,
    Other,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SmokingStatus {
    #[default]
    Never,
    Former,
    Current,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlcoholUse {
    #[default]
    None,
    Occasional,
    Regular,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActivityLevel {
    #[default]
    Sedentary,
    Light,
    Moderate,
    Active,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
            Sex::Other => "other",
        }
    }
}

impl SmokingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmokingStatus::Never => "never",
            SmokingStatus::Former => "former",
            SmokingStatus::Current => "current",
        }
    }
}

impl AlcoholUse {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholUse::None => "none",
            AlcoholUse::Occasional => "occasional",
            AlcoholUse::Regular => "regular",
        }
    }
}

impl ActivityLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "sedentary",
            ActivityLevel::Light => "light",
            ActivityLevel::Moderate => "moderate",
            ActivityLevel::Active => "active",
        }
    }
}

/// A health self-assessment as submitted by the frontend.
///
/// This is both the body of the form/predict routes and the payload written to the predictor's
/// stdin. Derived values such as `bmi` are taken as given and never recomputed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name_for_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sex: Option<Sex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_feet: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_inches: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bmi: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smoking_status: Option<SmokingStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alcohol_use: Option<AlcoholUse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_diabetes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_hypertension: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_heart_disease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_asthma: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_kidney_disease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_obesity: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_diabetes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_hypertension: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_heart_disease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_cancer: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag_diabetes: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag_heart_disease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diag_cancer: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_to_use_data: Option<bool>,
}

/// A stored health form as returned by the list route.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HealthFormRecord {
    /// Canonical 32-hex record identifier.
    pub id: String,
    /// RFC 3339 creation time.
    pub created_at: String,
    /// RFC 3339 time of the last write.
    pub updated_at: String,
    #[serde(flatten)]
    pub form: HealthProfile,
}

// ============================================================================
// CHAT
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

/// One turn of the conversation history. A missing or `null` text is read as empty.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub text: Option<String>,
}

impl ChatMessage {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: Some(text.into()),
        }
    }

    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ChatReq {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ChatRes {
    pub reply: String,
}

// ============================================================================
// ACCOUNTS
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SignupReq {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginReq {
    pub username: String,
    pub password: String,
}

// ============================================================================
// GENERIC RESPONSES
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MessageRes {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SaveFormRes {
    pub message: String,
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PredictAndSaveRes {
    pub message: String,
    pub id: String,
    /// The predictor's verdict, passed through unchanged.
    #[schema(value_type = Object)]
    pub prediction: serde_json::Map<String, serde_json::Value>,
}

/// Error body used by every failing route.
///
/// `stdout`/`stderr` carry bounded predictor diagnostics; `id` is set when a record was
/// persisted before the failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ErrorRes {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}
