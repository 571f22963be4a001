//! # Guardian Core
//!
//! Core business logic for the Guardian health-risk backend.
//!
//! This crate contains the domain operations and their storage:
//! - Health-intent classification of chat messages ([`intent`])
//! - The bridge to the external risk predictor ([`predictor`])
//! - Health form and account storage under the data directory ([`repositories`])
//! - The CSV research export ([`export`])
//! - The Guardian chat flow over an OpenAI-compatible service ([`assistant`])
//!
//! **No API concerns**: HTTP servers, routing and status codes belong in `api-rest`; wire types
//! live in `api-shared`.

pub mod assistant;
pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod intent;
pub mod predictor;
pub mod repositories;
pub mod validation;

pub use assistant::{GuardianChat, LanguageModel, OpenAiClient};
pub use config::{AssistantConfig, CoreConfig, PredictorSettings};
pub use error::{
    AssistantError, AssistantResult, GuardianError, GuardianResult, PredictError, PredictResult,
};
pub use export::CsvExporter;
pub use predictor::{PredictionPayload, PredictionResult, Predictor, SubprocessPredictor};
pub use repositories::accounts::AccountService;
pub use repositories::forms::HealthFormService;
