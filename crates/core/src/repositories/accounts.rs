//! User accounts.
//!
//! One YAML file per account at `<data_dir>/accounts/<username>/account.yaml`. Passwords are
//! never stored: the file keeps a random 16-byte salt and `SHA-256(salt || password)`, both hex
//! encoded.

use crate::config::CoreConfig;
use crate::constants::ACCOUNT_FILENAME;
use crate::error::{GuardianError, GuardianResult};
use crate::validation::{validate_email, validate_password, validate_username};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;

const SALT_LEN: usize = 16;

/// On-disk form of an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub email: String,
    pub password_salt: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().to_vec()
}

/// Compares two byte strings without exiting early on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl Account {
    fn verify(&self, password: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (
            hex::decode(&self.password_salt),
            hex::decode(&self.password_hash),
        ) else {
            tracing::warn!("account {} has a malformed password digest", self.username);
            return false;
        };
        constant_time_eq(&digest(&salt, password), &expected)
    }
}

/// Service for registering and authenticating users.
#[derive(Clone, Debug)]
pub struct AccountService {
    cfg: Arc<CoreConfig>,
}

impl AccountService {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self { cfg }
    }

    fn account_dir(&self, username: &str) -> PathBuf {
        self.cfg.accounts_dir().join(username)
    }

    /// Registers a new account.
    ///
    /// The account directory is created with `fs::create_dir`, so of two concurrent signups
    /// for the same name exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `GuardianError` if:
    /// - any field fails validation ([`GuardianError::InvalidInput`])
    /// - the username is taken ([`GuardianError::AccountExists`])
    /// - the account file cannot be written
    pub fn signup(&self, username: &str, email: &str, password: &str) -> GuardianResult<Account> {
        validate_username(username)?;
        validate_email(email)?;
        validate_password(password)?;

        let accounts_dir = self.cfg.accounts_dir();
        fs::create_dir_all(&accounts_dir).map_err(GuardianError::StorageDirCreation)?;

        let dir = self.account_dir(username);
        match fs::create_dir(&dir) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(GuardianError::AccountExists(username.to_string()));
            }
            Err(e) => return Err(GuardianError::RecordDirCreation(e)),
        }

        let salt: [u8; SALT_LEN] = rand::random();
        let account = Account {
            username: username.to_string(),
            email: email.to_string(),
            password_salt: hex::encode(salt),
            password_hash: hex::encode(digest(&salt, password)),
            created_at: Utc::now(),
        };

        let result = serde_yaml::to_string(&account)
            .map_err(GuardianError::YamlSerialization)
            .and_then(|yaml| {
                fs::write(dir.join(ACCOUNT_FILENAME), yaml).map_err(GuardianError::FileWrite)
            });

        if let Err(e) = result {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                tracing::error!(
                    "failed to clean up account dir {}: {}",
                    dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!("registered account {}", username);
        Ok(account)
    }

    /// Checks a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`GuardianError::InvalidCredentials`] for an unknown user and for a wrong
    /// password alike; I/O and parse failures on an existing account are reported as such.
    pub fn login(&self, username: &str, password: &str) -> GuardianResult<Account> {
        // A name that could never have been registered cannot match.
        if validate_username(username).is_err() {
            return Err(GuardianError::InvalidCredentials);
        }

        let path = self.account_dir(username).join(ACCOUNT_FILENAME);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(GuardianError::InvalidCredentials)
            }
            Err(e) => return Err(GuardianError::FileRead(e)),
        };

        let account: Account =
            serde_yaml::from_str(&contents).map_err(GuardianError::YamlDeserialization)?;

        if account.verify(password) {
            Ok(account)
        } else {
            Err(GuardianError::InvalidCredentials)
        }
    }
}
