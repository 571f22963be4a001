//! Prediction Bridge.
//!
//! Risk scores come from an external model script. This module owns the contract with it:
//! the payload written to its stdin, the verdict read back from its stdout and the typed
//! failures in between. [`SubprocessPredictor`] is the real implementation; the HTTP layer and
//! tests only see the [`Predictor`] trait.

mod capture;
mod subprocess;

pub use capture::{drain, CappedBuffer};
pub use subprocess::SubprocessPredictor;

use crate::error::{PredictError, PredictResult};
use api_shared::HealthProfile;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Something that can turn a health payload into a risk verdict.
#[async_trait::async_trait]
pub trait Predictor: Send + Sync {
    async fn predict(&self, payload: &PredictionPayload) -> PredictResult<PredictionResult>;
}

/// JSON document written to the predictor's stdin.
///
/// Absent attributes are omitted rather than sent as `null`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PredictionPayload(Value);

impl PredictionPayload {
    pub fn from_profile(profile: &HealthProfile) -> PredictResult<Self> {
        serde_json::to_value(profile)
            .map(Self)
            .map_err(|e| PredictError::Configuration(format!("unserialisable payload: {}", e)))
    }

    /// Wraps an arbitrary JSON value; used by the CLI to forward files verbatim.
    pub fn from_value(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn to_bytes(&self) -> PredictResult<Vec<u8>> {
        serde_json::to_vec(&self.0)
            .map_err(|e| PredictError::Configuration(format!("unserialisable payload: {}", e)))
    }
}

/// Diseases the bundled model reports on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disease {
    Diabetes,
    HeartDisease,
    Cancer,
}

impl Disease {
    pub const ALL: [Disease; 3] = [Disease::Diabetes, Disease::HeartDisease, Disease::Cancer];

    /// Key of the at-risk flag in the predictor output.
    pub fn key(&self) -> &'static str {
        match self {
            Disease::Diabetes => "diabetes",
            Disease::HeartDisease => "heartDisease",
            Disease::Cancer => "cancer",
        }
    }

    /// Key of the confidence value in the predictor output.
    pub fn proba_key(&self) -> String {
        format!("{}_proba", self.key())
    }
}

/// The predictor's JSON object, kept verbatim.
///
/// Accessors interpret the well-known keys but the map itself is what goes back to clients, so
/// keys a newer model adds pass through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PredictionResult(Map<String, Value>);

impl PredictionResult {
    pub fn new(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// At-risk flag for `disease`, if the model reported one.
    pub fn at_risk(&self, disease: Disease) -> Option<bool> {
        self.0.get(disease.key()).and_then(Value::as_bool)
    }

    /// Confidence for `disease`. The scale is whatever the model emits.
    pub fn probability(&self, disease: Disease) -> Option<f64> {
        self.0.get(&disease.proba_key()).and_then(Value::as_f64)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` and `NaN` are falsy; everything else,
/// including empty arrays and objects, is truthy.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Interprets the predictor's stdout once the process has exited successfully.
pub(crate) fn parse_verdict(stdout: &str, stderr: &str) -> PredictResult<PredictionResult> {
    let value: Value =
        serde_json::from_str(stdout.trim()).map_err(|e| PredictError::InvalidOutput {
            reason: e.to_string(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        })?;

    let Value::Object(map) = value else {
        return Err(PredictError::InvalidOutput {
            reason: "expected a JSON object".into(),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        });
    };

    if map.get("error").is_some_and(is_truthy) {
        let message = map
            .get("error")
            .and_then(Value::as_str)
            .or_else(|| map.get("detail").and_then(Value::as_str))
            .unwrap_or("predictor reported an error");
        return Err(PredictError::PredictorReported(message.to_string()));
    }

    Ok(PredictionResult(map))
}
