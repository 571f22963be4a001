//! Error responses for the REST API.
//!
//! Every failing route answers with a JSON [`ErrorRes`] body. Domain errors are translated
//! here so handlers stay small and status codes are decided in one place.

use api_shared::ErrorRes;
use axum::{
    extract::rejection::JsonRejection,
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use guardian_core::{AssistantError, GuardianError, PredictError};

/// JSON body extractor whose rejections use the API's error body.
///
/// Deserialisation failures, including unknown enum values, become `400` with the offending
/// field path in `detail`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

/// An HTTP status paired with the JSON error body.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorRes,
}

impl ApiError {
    pub fn new(status: StatusCode, body: ErrorRes) -> Self {
        Self { status, body }
    }

    pub fn bad_request(error: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorRes::new(error))
    }

    pub fn internal(error: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, ErrorRes::new(error))
    }

    pub fn internal_with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorRes::new(error).with_detail(detail),
        )
    }

    pub fn not_found(error: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorRes::new(error))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorRes {
        &self.body
    }

    /// Prediction failure under the given headline, with bounded diagnostics attached.
    pub fn prediction(error: &str, err: &PredictError) -> Self {
        let non_empty = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
        let mut body = ErrorRes::new(error).with_detail(err.to_string());
        body.stdout = non_empty(err.stdout());
        body.stderr = non_empty(err.stderr());
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    /// Storage failure: validation problems are the caller's fault, the rest is ours.
    pub fn storage(err: GuardianError, internal_message: &str) -> Self {
        match err {
            GuardianError::InvalidInput(msg) => Self::bad_request(msg),
            GuardianError::NotFound(msg) => Self::not_found(msg),
            other => {
                tracing::error!("{}: {:?}", internal_message, other);
                Self::internal(internal_message)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let status = match rejection {
            JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                StatusCode::BAD_REQUEST
            }
            _ => rejection.status(),
        };
        Self::new(
            status,
            ErrorRes::new("Invalid request body").with_detail(rejection.body_text()),
        )
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::InvalidRequest(_) | AssistantError::ModerationFlagged => {
                Self::bad_request(err.to_string())
            }
            AssistantError::Configuration(_) | AssistantError::EmptyReply => {
                Self::internal(err.to_string())
            }
            AssistantError::Upstream(_) => {
                tracing::error!("Guardian chat error: {:?}", err);
                Self::internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_error_attaches_non_empty_streams() {
        let err = PredictError::InvalidOutput {
            reason: "expected value".into(),
            stdout: "oops".into(),
            stderr: String::new(),
        };

        let api = ApiError::prediction("Prediction failed", &err);

        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body().error, "Prediction failed");
        assert_eq!(api.body().stdout.as_deref(), Some("oops"));
        assert_eq!(api.body().stderr, None);
        assert!(api
            .body()
            .detail
            .as_deref()
            .is_some_and(|d| d.contains("invalid JSON")));
    }

    #[test]
    fn test_assistant_error_statuses() {
        let cases = [
            (AssistantError::ModerationFlagged, StatusCode::BAD_REQUEST),
            (
                AssistantError::InvalidRequest("messages array required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (AssistantError::EmptyReply, StatusCode::INTERNAL_SERVER_ERROR),
            (
                AssistantError::Configuration("missing key".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                AssistantError::Upstream("status 502".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_storage_error_mapping() {
        let api = ApiError::storage(
            GuardianError::InvalidInput("age, heightCm and weightKg are required".into()),
            "Could not save health form",
        );
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
        assert_eq!(api.body().error, "age, heightCm and weightKg are required");

        let api = ApiError::storage(
            GuardianError::FileWrite(std::io::Error::other("disk full")),
            "Could not save health form",
        );
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.body().error, "Could not save health form");
    }
}
