use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{router, AppState};
use guardian_core::{
    config::{
        assistant_config_from_env_values, predict_timeout_from_env_value,
        rest_addr_from_env_values,
    },
    constants::DEFAULT_DATA_DIR,
    CoreConfig, GuardianChat, LanguageModel, OpenAiClient, PredictorSettings,
    SubprocessPredictor,
};

/// Main entry point for the Guardian backend.
///
/// Resolves configuration from the environment (and `.env`), prepares the data directory and
/// serves the REST API.
///
/// # Environment Variables
/// - `GUARDIAN_REST_ADDR`: listen address (default: `0.0.0.0:$PORT`)
/// - `PORT`: listen port when no address is given (default: 5000)
/// - `GUARDIAN_DATA_DIR`: record storage (default: `guardian_data`)
/// - `GUARDIAN_CSV_PATH`: CSV export file (default: `<data dir>/user_data.csv`)
/// - `GUARDIAN_PREDICTOR_DIR`: directory holding `predict.py` (default: `.`)
/// - `PYTHON_PATH`: interpreter override for the predictor
/// - `GUARDIAN_PREDICT_TIMEOUT_MS`: per-prediction budget (default: 15000)
/// - `OPENAI_API_KEY`, `OPENAI_MODEL`, `OPENAI_BASE_URL`, `GUARDIAN_UPSTREAM_TIMEOUT_SECS`:
///   AI service settings; without a key the chat route reports itself unconfigured
///
/// # Errors
/// Returns an error if configuration is invalid, the data directory cannot be created, the
/// address cannot be bound or the server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guardian=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let env = |key: &str| std::env::var(key).ok();

    let rest_addr = rest_addr_from_env_values(env("GUARDIAN_REST_ADDR"), env("PORT"));

    let data_dir = env("GUARDIAN_DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.into());
    let cfg = Arc::new(CoreConfig::new(
        PathBuf::from(data_dir),
        env("GUARDIAN_CSV_PATH").map(PathBuf::from),
    )?);
    cfg.ensure_dirs()?;

    let predictor = SubprocessPredictor::new(PredictorSettings::new(
        env("GUARDIAN_PREDICTOR_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(".")),
        env("PYTHON_PATH").filter(|p| !p.is_empty()).map(PathBuf::from),
        predict_timeout_from_env_value(env("GUARDIAN_PREDICT_TIMEOUT_MS"))?,
    ));
    if let Err(e) = predictor.settings().resolve_script() {
        tracing::warn!("{}; predictions will fail until it is installed", e);
    }

    let assistant = assistant_config_from_env_values(
        env("OPENAI_API_KEY"),
        env("OPENAI_MODEL"),
        env("OPENAI_BASE_URL"),
        env("GUARDIAN_UPSTREAM_TIMEOUT_SECS"),
    )?;
    let model: Option<Arc<dyn LanguageModel>> = match assistant {
        Some(config) => {
            let client = OpenAiClient::new(config)?;
            tracing::info!("AI service configured: model {}", client.model());
            Some(Arc::new(client))
        }
        None => None,
    };
    let chat = GuardianChat::new(model);
    if !chat.is_configured() {
        tracing::warn!("OPENAI_API_KEY not set; the chat route will report an error");
    }

    let state = AppState::new(cfg.clone(), Arc::new(predictor), chat);
    tracing::info!("++ Exporting submissions to {}", state.exporter.path().display());
    let app = router(state);

    tracing::info!("++ Starting Guardian REST on {}", rest_addr);
    tracing::info!("++ Storing records under {}", cfg.data_dir().display());

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
