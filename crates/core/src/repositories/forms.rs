//! Health form store.
//!
//! Each submitted form is written as pretty JSON to
//! `<data_dir>/health_forms/<s1>/<s2>/<id>/form.json`. There is no index; listing walks the
//! sharded tree, which is fine at the volumes a single clinic deployment produces.

use crate::config::CoreConfig;
use crate::constants::HEALTH_FORM_FILENAME;
use crate::error::{GuardianError, GuardianResult};
use crate::repositories::shared::{create_record_dir, sharded_record_files};
use api_shared::{
    ActivityLevel, AlcoholUse, HealthFormRecord, HealthProfile, Sex, SmokingStatus,
};
use chrono::{DateTime, SecondsFormat, Utc};
use guardian_uuid::RecordId;
use std::fs;
use std::sync::Arc;

pub const REQUIRED_FIELDS_MESSAGE: &str = "age, heightCm and weightKg are required";

fn is_present(value: Option<f64>) -> bool {
    value.is_some_and(|v| v != 0.0 && !v.is_nan())
}

/// Validates a submission and fills in the diagnosis flags.
///
/// `age`, `heightCm` and `weightKg` must be present and non-zero. Each diagnosis flag that was
/// not supplied is copied from its related history flag (`hasDiabetes`, `hasHeartDisease`,
/// `familyCancer`), with a missing history flag read as `false`.
///
/// The result is what gets exported to CSV and sent to the predictor. Calling this twice is
/// harmless.
///
/// # Errors
///
/// Returns `GuardianError::InvalidInput` when a required measurement is missing.
pub fn prepare_submission(mut form: HealthProfile) -> GuardianResult<HealthProfile> {
    if !(is_present(form.age) && is_present(form.height_cm) && is_present(form.weight_kg)) {
        return Err(GuardianError::InvalidInput(REQUIRED_FIELDS_MESSAGE.into()));
    }

    form.diag_diabetes = Some(
        form.diag_diabetes
            .unwrap_or_else(|| form.has_diabetes.unwrap_or(false)),
    );
    form.diag_heart_disease = Some(
        form.diag_heart_disease
            .unwrap_or_else(|| form.has_heart_disease.unwrap_or(false)),
    );
    form.diag_cancer = Some(
        form.diag_cancer
            .unwrap_or_else(|| form.family_cancer.unwrap_or(false)),
    );

    Ok(form)
}

/// Fills the categorical fields a stored record always carries.
fn with_stored_defaults(mut form: HealthProfile) -> HealthProfile {
    form.sex.get_or_insert(Sex::default());
    form.smoking_status.get_or_insert(SmokingStatus::default());
    form.alcohol_use.get_or_insert(AlcoholUse::default());
    form.activity_level.get_or_insert(ActivityLevel::default());
    form.consent_to_use_data.get_or_insert(false);
    form
}

/// Service for saving and reading health forms.
#[derive(Clone, Debug)]
pub struct HealthFormService {
    cfg: Arc<CoreConfig>,
}

impl HealthFormService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    /// Validates and persists a submission, returning the stored record.
    ///
    /// # Errors
    ///
    /// Returns `GuardianError` if:
    /// - a required measurement is missing ([`GuardianError::InvalidInput`])
    /// - the record directory cannot be allocated
    /// - serialisation or the file write fails
    pub fn save(&self, submission: HealthProfile) -> GuardianResult<HealthFormRecord> {
        self.save_at(submission, Utc::now())
    }

    pub(crate) fn save_at(
        &self,
        submission: HealthProfile,
        now: DateTime<Utc>,
    ) -> GuardianResult<HealthFormRecord> {
        let form = with_stored_defaults(prepare_submission(submission)?);

        let (id, record_dir) = create_record_dir(&self.cfg.health_forms_dir(), RecordId::new)?;

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Micros, true);
        let record = HealthFormRecord {
            id: id.to_string(),
            created_at: timestamp.clone(),
            updated_at: timestamp,
            form,
        };

        let result = serde_json::to_string_pretty(&record)
            .map_err(GuardianError::Serialization)
            .and_then(|json| {
                fs::write(record_dir.join(HEALTH_FORM_FILENAME), json)
                    .map_err(GuardianError::FileWrite)
            });

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_dir_all(&record_dir) {
                tracing::error!(
                    "failed to clean up record dir {}: {}",
                    record_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::debug!("saved health form {}", id);
        Ok(record)
    }

    /// Reads one record by id.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::NotFound`] if no record exists for `id`, or a read or
    /// deserialisation error if the file is damaged.
    pub fn get(&self, id: &RecordId) -> GuardianResult<HealthFormRecord> {
        let path = id
            .sharded_dir(&self.cfg.health_forms_dir())
            .join(HEALTH_FORM_FILENAME);
        if !path.is_file() {
            return Err(GuardianError::NotFound(format!("health form {}", id)));
        }

        let contents = fs::read_to_string(&path).map_err(GuardianError::FileRead)?;
        serde_json::from_str(&contents).map_err(GuardianError::Deserialization)
    }

    /// All records linked to `username`, newest first.
    ///
    /// Files that cannot be read or parsed are logged as warnings and skipped.
    pub fn list_for_user(&self, username: &str) -> Vec<HealthFormRecord> {
        let mut records: Vec<HealthFormRecord> =
            sharded_record_files(&self.cfg.health_forms_dir(), HEALTH_FORM_FILENAME)
                .into_iter()
                .filter_map(|path| {
                    let parsed = fs::read_to_string(&path)
                        .map_err(|e| e.to_string())
                        .and_then(|s| {
                            serde_json::from_str::<HealthFormRecord>(&s).map_err(|e| e.to_string())
                        });
                    match parsed {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!(
                                "failed to read health form: {} - {}",
                                path.display(),
                                e
                            );
                            None
                        }
                    }
                })
                .filter(|record| record.form.user_name_for_link.as_deref() == Some(username))
                .collect();

        records.sort_by(|a, b| {
            created_at_key(b)
                .cmp(&created_at_key(a))
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }
}

fn created_at_key(record: &HealthFormRecord) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&record.created_at)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
