//! Shared repository utilities.
//!
//! Directory allocation and the walk over sharded record directories, used by the form store
//! and anything else that keeps one directory per record.

use crate::error::{GuardianError, GuardianResult};
use guardian_uuid::RecordId;
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within the base records directory.
///
/// Identifiers come from `id_source`. UUID collisions or pre-existing directories are retried
/// up to 5 times with fresh identifiers; the final `fs::create_dir` is what claims the
/// directory, so two concurrent writers can never end up sharing one.
///
/// # Errors
///
/// Returns `GuardianError::RecordDirCreation` if parent creation fails or no unique directory
/// could be allocated after 5 attempts.
pub(crate) fn create_record_dir(
    base_dir: &Path,
    mut id_source: impl FnMut() -> RecordId,
) -> GuardianResult<(RecordId, PathBuf)> {
    for _attempt in 0..5 {
        let id = id_source();
        let candidate = id.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(GuardianError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((id, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(GuardianError::RecordDirCreation(e)),
        }
    }

    Err(GuardianError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// Returns every `<base>/<s1>/<s2>/<id>/<file_name>` that exists as a file.
///
/// Unreadable directories are skipped; a missing base directory yields an empty list.
pub(crate) fn sharded_record_files(base_dir: &Path, file_name: &str) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let Ok(s1_iter) = fs::read_dir(base_dir) else {
        return files;
    };

    for s1 in s1_iter.flatten() {
        let Ok(s2_iter) = fs::read_dir(s1.path()) else {
            continue;
        };

        for s2 in s2_iter.flatten() {
            let Ok(id_iter) = fs::read_dir(s2.path()) else {
                continue;
            };

            for id_ent in id_iter.flatten() {
                let record_path = id_ent.path().join(file_name);
                if record_path.is_file() {
                    files.push(record_path);
                }
            }
        }
    }

    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_record_dir_uses_sharded_layout() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let id = RecordId::parse("550e8400e29b41d4a716446655440000").unwrap();

        let (allocated, dir) = create_record_dir(temp_dir.path(), || id).unwrap();

        assert_eq!(allocated, id);
        assert_eq!(
            dir,
            temp_dir
                .path()
                .join("55")
                .join("0e")
                .join("550e8400e29b41d4a716446655440000")
        );
        assert!(dir.is_dir());
    }

    #[test]
    fn test_create_record_dir_retries_on_collision() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let taken = RecordId::parse("11111111111111111111111111111111").unwrap();
        let free = RecordId::parse("22222222222222222222222222222222").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp_dir.path())).unwrap();

        let mut ids = vec![free, taken].into_iter().rev();
        let (allocated, _) =
            create_record_dir(temp_dir.path(), || ids.next().expect("id available")).unwrap();

        assert_eq!(allocated, free);
    }

    #[test]
    fn test_create_record_dir_gives_up_after_five_attempts() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let taken = RecordId::parse("33333333333333333333333333333333").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp_dir.path())).unwrap();

        let err = create_record_dir(temp_dir.path(), || taken).unwrap_err();
        assert!(matches!(err, GuardianError::RecordDirCreation(_)));
    }

    #[test]
    fn test_sharded_record_files_finds_only_complete_records() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let complete = RecordId::new().sharded_dir(temp_dir.path());
        let empty = RecordId::new().sharded_dir(temp_dir.path());
        fs::create_dir_all(&complete).unwrap();
        fs::create_dir_all(&empty).unwrap();
        fs::write(complete.join("form.json"), "{}").unwrap();

        let files = sharded_record_files(temp_dir.path(), "form.json");
        assert_eq!(files, vec![complete.join("form.json")]);

        assert!(sharded_record_files(&temp_dir.path().join("missing"), "form.json").is_empty());
    }
}
