//! # API REST
//!
//! REST API implementation for Guardian.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON error bodies, status codes, CORS)
//!
//! Business logic lives in `guardian-core`; wire types come from `api-shared`.

#![warn(rust_2018_idioms)]

pub mod error;


use api_shared::{
    ChatReq, ChatRes, ErrorRes, HealthFormRecord, HealthProfile, HealthRes, HealthService,
    LoginReq, MessageRes, PredictAndSaveRes, SaveFormRes, SignupReq,
};
use axum::{
    extract::{Path as AxumPath, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use error::{ApiError, ApiJson};
use guardian_core::{
    repositories::forms::prepare_submission, AccountService, CoreConfig, CsvExporter,
    GuardianChat, GuardianError, HealthFormService, PredictionPayload, Predictor,
};
use guardian_uuid::RecordId;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub const ROOT_BANNER: &str = "GeneticGuardianAI backend is up";

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub forms: Arc<HealthFormService>,
    pub accounts: Arc<AccountService>,
    pub exporter: Arc<CsvExporter>,
    pub predictor: Arc<dyn Predictor>,
    pub chat: Arc<GuardianChat>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>, predictor: Arc<dyn Predictor>, chat: GuardianChat) -> Self {
        Self {
            forms: Arc::new(HealthFormService::new(cfg.clone())),
            accounts: Arc::new(AccountService::new(cfg.clone())),
            exporter: Arc::new(CsvExporter::new(cfg.csv_path().to_path_buf())),
            predictor,
            chat: Arc::new(chat),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        signup,
        login,
        save_health_form,
        list_health_forms,
        get_health_form,
        download_csv,
        predict,
        predict_and_save,
        guardian_chat,
    ),
    components(schemas(
        HealthRes,
        MessageRes,
        ErrorRes,
        SignupReq,
        LoginReq,
        HealthProfile,
        HealthFormRecord,
        SaveFormRes,
        PredictAndSaveRes,
        ChatReq,
        ChatRes,
        api_shared::ChatMessage,
        api_shared::ChatRole,
        api_shared::Sex,
        api_shared::SmokingStatus,
        api_shared::AlcoholUse,
        api_shared::ActivityLevel,
    ))
)]
pub struct ApiDoc;

/// Builds the full REST router, including Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/healthform/save", post(save_health_form))
        .route("/healthform/list/:username", get(list_health_forms))
        .route("/healthform/record/:id", get(get_health_form))
        .route("/download/user_data.csv", get(download_csv))
        .route("/predict", post(predict))
        .route("/predict-and-save", post(predict_and_save))
        .route("/api/guardian/chat", post(guardian_chat))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// CSV failures never fail the request that triggered them.
fn export_submission(state: &AppState, form: &HealthProfile) {
    match state.exporter.append(form) {
        Ok(()) => tracing::debug!("appended submission to CSV"),
        Err(e) => tracing::error!("CSV write error: {:?}", e),
    }
}

async fn root() -> &'static str {
    ROOT_BANNER
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for monitoring and load balancers.
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/signup",
    request_body = SignupReq,
    responses(
        (status = 200, description = "Account created", body = MessageRes),
        (status = 400, description = "Invalid username, email or password", body = ErrorRes),
        (status = 409, description = "Username already taken", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Register a new account.
#[axum::debug_handler]
async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupReq>,
) -> Result<Json<MessageRes>, ApiError> {
    match state
        .accounts
        .signup(&req.username, &req.email, &req.password)
    {
        Ok(_) => Ok(Json(MessageRes {
            message: "User registered successfully".into(),
        })),
        Err(GuardianError::AccountExists(_)) => Err(ApiError::new(
            StatusCode::CONFLICT,
            ErrorRes::new("User already exists"),
        )),
        Err(GuardianError::InvalidInput(msg)) => Err(ApiError::bad_request(msg)),
        Err(e) => {
            tracing::error!("Signup error: {:?}", e);
            Err(ApiError::internal("Error registering user"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/login",
    request_body = LoginReq,
    responses(
        (status = 200, description = "Credentials accepted", body = MessageRes),
        (status = 400, description = "Invalid credentials", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Check a username and password.
///
/// Unknown users and wrong passwords get the same answer.
#[axum::debug_handler]
async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginReq>,
) -> Result<Json<MessageRes>, ApiError> {
    match state.accounts.login(&req.username, &req.password) {
        Ok(_) => Ok(Json(MessageRes {
            message: "Login successful".into(),
        })),
        Err(GuardianError::InvalidCredentials) => Err(ApiError::bad_request("Invalid credentials")),
        Err(e) => {
            tracing::error!("Login error: {:?}", e);
            Err(ApiError::internal("Error logging in"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/healthform/save",
    request_body = HealthProfile,
    responses(
        (status = 200, description = "Health form stored", body = SaveFormRes),
        (status = 400, description = "Missing age, heightCm or weightKg", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Store a health form and append it to the CSV export.
#[axum::debug_handler]
async fn save_health_form(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<HealthProfile>,
) -> Result<Json<SaveFormRes>, ApiError> {
    const FAILED: &str = "Could not save health form";

    let prepared = prepare_submission(form).map_err(|e| ApiError::storage(e, FAILED))?;
    let record = state
        .forms
        .save(prepared.clone())
        .map_err(|e| ApiError::storage(e, FAILED))?;

    export_submission(&state, &prepared);

    Ok(Json(SaveFormRes {
        message: "Health form saved".into(),
        id: record.id,
    }))
}

#[utoipa::path(
    get,
    path = "/healthform/list/{username}",
    params(("username" = String, Path, description = "Value of userNameForLink")),
    responses(
        (status = 200, description = "Stored forms, newest first", body = [HealthFormRecord])
    )
)]
/// List the health forms linked to a user.
#[axum::debug_handler]
async fn list_health_forms(
    State(state): State<AppState>,
    AxumPath(username): AxumPath<String>,
) -> Json<Vec<HealthFormRecord>> {
    Json(state.forms.list_for_user(&username))
}

#[utoipa::path(
    get,
    path = "/healthform/record/{id}",
    params(("id" = String, Path, description = "Canonical 32-hex record id")),
    responses(
        (status = 200, description = "Stored form", body = HealthFormRecord),
        (status = 400, description = "Malformed id", body = ErrorRes),
        (status = 404, description = "No such record", body = ErrorRes),
        (status = 500, description = "Internal server error", body = ErrorRes)
    )
)]
/// Fetch one stored health form.
#[axum::debug_handler]
async fn get_health_form(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<HealthFormRecord>, ApiError> {
    let id = RecordId::parse(&id).map_err(|e| ApiError::bad_request(e.to_string()))?;
    state
        .forms
        .get(&id)
        .map(Json)
        .map_err(|e| ApiError::storage(e, "Could not fetch record"))
}

#[utoipa::path(
    get,
    path = "/download/user_data.csv",
    responses(
        (status = 200, description = "CSV export (text/csv attachment)"),
        (status = 404, description = "Nothing exported yet", body = ErrorRes)
    )
)]
/// Download the CSV export as an attachment.
#[axum::debug_handler]
async fn download_csv(State(state): State<AppState>) -> Result<Response, ApiError> {
    match state.exporter.read() {
        Ok(Some(bytes)) => Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"user_data.csv\"",
                ),
            ],
            bytes,
        )
            .into_response()),
        Ok(None) => Err(ApiError::not_found("CSV not found yet")),
        Err(e) => {
            tracing::error!("CSV read error: {:?}", e);
            Err(ApiError::internal("Could not read CSV"))
        }
    }
}

#[utoipa::path(
    post,
    path = "/predict",
    request_body = HealthProfile,
    responses(
        (status = 200, description = "Predictor verdict as a JSON object, passed through unchanged"),
        (status = 500, description = "Prediction failed", body = ErrorRes)
    )
)]
/// Run the risk predictor on a submission without storing it.
///
/// The body is read as a `HealthProfile`: keys outside the profile are dropped and never reach
/// the predictor.
#[axum::debug_handler]
async fn predict(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<HealthProfile>,
) -> Result<Json<serde_json::Map<String, serde_json::Value>>, ApiError> {
    const FAILED: &str = "Prediction failed";

    let payload =
        PredictionPayload::from_profile(&form).map_err(|e| ApiError::prediction(FAILED, &e))?;

    match state.predictor.predict(&payload).await {
        Ok(result) => Ok(Json(result.into_map())),
        Err(e) => {
            tracing::error!("Predict error: {:?}", e);
            Err(ApiError::prediction(FAILED, &e))
        }
    }
}

#[utoipa::path(
    post,
    path = "/predict-and-save",
    request_body = HealthProfile,
    responses(
        (status = 200, description = "Stored and predicted", body = PredictAndSaveRes),
        (status = 400, description = "Missing age, heightCm or weightKg", body = ErrorRes),
        (status = 500, description = "Storage or prediction failed; `id` is set if the form was stored", body = ErrorRes)
    )
)]
/// Store a health form, export it and run the predictor on it.
///
/// A prediction failure after a successful save reports the stored record's id.
#[axum::debug_handler]
async fn predict_and_save(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<HealthProfile>,
) -> Result<Json<PredictAndSaveRes>, ApiError> {
    let save_failed = |e: GuardianError| match e {
        GuardianError::InvalidInput(msg) => ApiError::bad_request(msg),
        other => {
            tracing::error!("predict-and-save error: {:?}", other);
            ApiError::internal_with_detail("Could not save and predict", other.to_string())
        }
    };

    let prepared = prepare_submission(form).map_err(save_failed)?;
    let record = state.forms.save(prepared.clone()).map_err(save_failed)?;

    export_submission(&state, &prepared);

    let prediction = match PredictionPayload::from_profile(&prepared) {
        Ok(payload) => state.predictor.predict(&payload).await,
        Err(e) => Err(e),
    };

    match prediction {
        Ok(result) => Ok(Json(PredictAndSaveRes {
            message: "Saved and predicted".into(),
            id: record.id,
            prediction: result.into_map(),
        })),
        Err(e) => {
            tracing::error!("Prediction after save failed: {:?}", e);
            let mut body = ErrorRes::new("Prediction failed after save").with_detail(e.to_string());
            body.id = Some(record.id);
            Err(ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, body))
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/guardian/chat",
    request_body = ChatReq,
    responses(
        (status = 200, description = "Assistant reply, or a one-line refusal for non-health questions", body = ChatRes),
        (status = 400, description = "Empty conversation or flagged content", body = ErrorRes),
        (status = 500, description = "AI service not configured, unavailable or silent", body = ErrorRes)
    )
)]
/// Ask the Guardian assistant.
#[axum::debug_handler]
async fn guardian_chat(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ChatReq>,
) -> Result<Json<ChatRes>, ApiError> {
    tracing::info!("guardian chat request with {} messages", req.messages.len());

    let reply = state.chat.reply(&req.messages).await?;
    Ok(Json(ChatRes { reply }))
}
