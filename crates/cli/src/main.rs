use clap::{Parser, Subcommand};
use guardian_core::{
    config::predict_timeout_from_env_value,
    constants::DEFAULT_DATA_DIR,
    intent::{self, IntentVerdict},
    CoreConfig, HealthFormService, PredictError, PredictionPayload, Predictor, PredictorSettings,
    SubprocessPredictor,
};
use guardian_uuid::RecordId;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "guardian")]
#[command(about = "Guardian health-risk backend CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a question would pass the chat's health filter
    Classify {
        /// Question text (words are joined with spaces)
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Run the risk predictor on a JSON payload
    Predict {
        /// Payload file, or '-' for stdin
        input: String,
        /// Directory containing predict.py
        #[arg(long, default_value = ".")]
        predictor_dir: PathBuf,
        /// Python interpreter to use instead of the venv/PATH lookup
        #[arg(long)]
        python: Option<PathBuf>,
        /// Timeout in milliseconds (default 15000)
        #[arg(long)]
        timeout_ms: Option<String>,
    },
    /// List stored health forms for a user, newest first
    Forms {
        /// Username the forms are linked to
        username: String,
        /// Data directory
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
    /// Print one stored health form as JSON
    Show {
        /// Record id (32 lowercase hex characters)
        id: String,
        /// Data directory
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,
    },
}

fn describe(verdict: &IntentVerdict) -> String {
    match verdict {
        IntentVerdict::Health {
            term,
            overrode: Some(indicator),
        } => format!("health (matched '{}', overriding '{}')", term, indicator),
        IntentVerdict::Health {
            term,
            overrode: None,
        } => format!("health (matched '{}')", term),
        IntentVerdict::OffTopic { indicator } => format!("off-topic (matched '{}')", indicator),
        IntentVerdict::TooShort => "off-topic (too short, no health terms)".to_string(),
        IntentVerdict::NoEvidence => "off-topic (no health terms)".to_string(),
    }
}

fn read_input(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        Ok(buf)
    } else {
        std::fs::read_to_string(input)
    }
}

fn forms_service(data_dir: PathBuf) -> Result<HealthFormService, Box<dyn std::error::Error>> {
    let cfg = CoreConfig::new(data_dir, None)?;
    Ok(HealthFormService::new(Arc::new(cfg)))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Classify { text }) => {
            let verdict = intent::evaluate(&text.join(" "));
            println!("{}", describe(&verdict));
        }
        Some(Commands::Predict {
            input,
            predictor_dir,
            python,
            timeout_ms,
        }) => {
            let payload: serde_json::Value = serde_json::from_str(&read_input(&input)?)?;
            let settings = PredictorSettings::new(
                predictor_dir,
                python,
                predict_timeout_from_env_value(timeout_ms)?,
            );

            match SubprocessPredictor::new(settings)
                .predict(&PredictionPayload::from_value(payload))
                .await
            {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(result.as_map())?);
                }
                Err(e) => {
                    eprintln!("Prediction failed: {}", e);
                    print_diagnostics(&e);
                    return Err(e.into());
                }
            }
        }
        Some(Commands::Forms { username, data_dir }) => {
            let records = forms_service(data_dir)?.list_for_user(&username);
            if records.is_empty() {
                println!("No health forms found for {}.", username);
            } else {
                for record in records {
                    println!(
                        "ID: {}, Created: {}, Age: {}",
                        record.id,
                        record.created_at,
                        record
                            .form
                            .age
                            .map(|a| a.to_string())
                            .unwrap_or_default()
                    );
                }
            }
        }
        Some(Commands::Show { id, data_dir }) => {
            let id = RecordId::parse(&id)?;
            let record = forms_service(data_dir)?.get(&id)?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        None => {
            println!("Use 'guardian --help' for commands");
        }
    }

    Ok(())
}

fn print_diagnostics(err: &PredictError) {
    if let Some(stderr) = err.stderr().filter(|s| !s.is_empty()) {
        eprintln!("--- predictor stderr ---\n{}", stderr);
    }
    if let Some(stdout) = err.stdout().filter(|s| !s.is_empty()) {
        eprintln!("--- predictor stdout ---\n{}", stdout);
    }
}
