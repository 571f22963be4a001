//! Append-only CSV export of submitted forms.
//!
//! The file is a research extract: one row per submission, no identifiers, fixed columns.
//! Quoting follows the common spreadsheet convention: header names, text and empty cells are
//! double-quoted with embedded quotes doubled; numbers and booleans are written bare.

use crate::error::{GuardianError, GuardianResult};
use api_shared::HealthProfile;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Exported columns, in order.
pub const CSV_FIELDS: &[&str] = &[
    "age",
    "sex",
    "heightCm",
    "weightKg",
    "bmi",
    "smokingStatus",
    "alcoholUse",
    "activityLevel",
    "sleepHours",
    "hasDiabetes",
    "hasHypertension",
    "hasHeartDisease",
    "hasAsthma",
    "hasKidneyDisease",
    "hasObesity",
    "familyDiabetes",
    "familyHypertension",
    "familyHeartDisease",
    "familyCancer",
    "diagDiabetes",
    "diagHeartDisease",
    "diagCancer",
];

fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => quote(""),
        Some(Value::String(s)) => quote(s),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => quote(&other.to_string()),
    }
}

fn header_line() -> String {
    CSV_FIELDS
        .iter()
        .map(|f| quote(f))
        .collect::<Vec<_>>()
        .join(",")
}

/// Renders one data row for `form`, without the line terminator.
pub fn csv_row(form: &HealthProfile) -> GuardianResult<String> {
    let value = serde_json::to_value(form).map_err(GuardianError::Serialization)?;
    Ok(CSV_FIELDS
        .iter()
        .map(|field| cell(value.get(field)))
        .collect::<Vec<_>>()
        .join(","))
}

/// Appends rows to the export file, writing the header when the file is first created.
#[derive(Debug)]
pub struct CsvExporter {
    path: PathBuf,
    lock: Mutex<()>,
}

impl CsvExporter {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row for `form`.
    ///
    /// Appends from this process are serialised, so the header is written exactly once and
    /// rows never interleave.
    pub fn append(&self, form: &HealthProfile) -> GuardianResult<()> {
        let row = csv_row(form)?;

        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let header_needed = !self.path.exists();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(GuardianError::CsvWrite)?;

        let mut out = String::new();
        if header_needed {
            out.push_str(&header_line());
            out.push('\n');
        }
        out.push_str(&row);
        out.push('\n');

        file.write_all(out.as_bytes())
            .map_err(GuardianError::CsvWrite)
    }

    /// Returns the file contents, or `None` if nothing has been exported yet.
    pub fn read(&self) -> GuardianResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(GuardianError::FileRead(e)),
        }
    }
}
