use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use scene_core::{LevelId, MemorySaveState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::atomic_io;

pub(crate) const SAVE_VERSION: u32 = 1;

/// Object overrides for one level, pinned to the level file they were recorded against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SaveFile {
    pub save_version: u32,
    pub level_key: String,
    pub level_sha256: String,
    pub state: MemorySaveState,
}

#[derive(Debug, Error)]
pub enum SaveFileError {
    #[error("failed to read save {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse save {path} at {field}: {source}")]
    Parse {
        path: PathBuf,
        field: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode save: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write save {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("validation failed at {field}: expected {expected}, got {actual}")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },
}

impl SaveFile {
    pub fn new(level: &LevelId, level_sha256: &str, state: MemorySaveState) -> Self {
        Self {
            save_version: SAVE_VERSION,
            level_key: level.key(),
            level_sha256: level_sha256.to_string(),
            state,
        }
    }

    /// Rejects saves from another format version, another level, or an edited level file.
    pub fn validate(&self, level: &LevelId, level_sha256: &str) -> Result<(), SaveFileError> {
        if self.save_version != SAVE_VERSION {
            return Err(mismatch("save_version", SAVE_VERSION, self.save_version));
        }
        let level_key = level.key();
        if self.level_key != level_key {
            return Err(mismatch("level_key", level_key, &self.level_key));
        }
        if self.level_sha256 != level_sha256 {
            return Err(mismatch("level_sha256", level_sha256, &self.level_sha256));
        }
        Ok(())
    }
}

fn mismatch(
    field: &'static str,
    expected: impl ToString,
    actual: impl ToString,
) -> SaveFileError {
    SaveFileError::Mismatch {
        field,
        expected: expected.to_string(),
        actual: actual.to_string(),
    }
}

pub(crate) fn save_path_for(saves_dir: &Path, level: &LevelId) -> PathBuf {
    saves_dir.join(format!("level_{}_{}.json", level.city, level.scene))
}

/// `Ok(None)` when no save exists yet.
pub fn read_save_file(path: &Path) -> Result<Option<SaveFile>, SaveFileError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(SaveFileError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    serde_path_to_error::deserialize::<_, SaveFile>(&mut deserializer)
        .map(Some)
        .map_err(|error| {
            let field = error.path().to_string();
            SaveFileError::Parse {
                path: path.to_path_buf(),
                field: if field.is_empty() { ".".to_string() } else { field },
                source: error.into_inner(),
            }
        })
}

pub fn write_save_file(path: &Path, save: &SaveFile) -> Result<(), SaveFileError> {
    let json = serde_json::to_string_pretty(save).map_err(SaveFileError::Encode)?;
    atomic_io::replace_with_text(path, &json).map_err(|source| SaveFileError::Write {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_core::{ObjectId, PersistedField, SaveStateStore};
    use serde_json::json;

    fn sample_state(level: &LevelId) -> MemorySaveState {
        let mut state = MemorySaveState::default();
        state.persist(level, ObjectId(3), PersistedField::SwitchState(1));
        state.persist(level, ObjectId(3), PersistedField::Times(0));
        state.persist(level, ObjectId(9), PersistedField::Activated(true));
        state
    }

    #[test]
    fn written_save_reads_back_and_validates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let level = LevelId::new(1, 4);
        let path = save_path_for(dir.path(), &level);
        let save = SaveFile::new(&level, "abc123", sample_state(&level));

        write_save_file(&path, &save).expect("write");
        let loaded = read_save_file(&path).expect("read").expect("present");
        assert_eq!(loaded, save);
        loaded.validate(&level, "abc123").expect("valid");

        let restored = loaded
            .state
            .object_override(&level, ObjectId(3))
            .expect("override");
        assert_eq!(restored.switch_state, Some(1));
        assert_eq!(restored.times, Some(0));
        assert_eq!(restored.activated, None);
    }

    #[test]
    fn missing_save_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("none.json");
        assert!(read_save_file(&path).expect("read").is_none());
    }

    #[test]
    fn stale_or_foreign_saves_are_rejected() {
        let level = LevelId::new(1, 4);
        let save = SaveFile::new(&level, "abc123", MemorySaveState::default());

        let err = save.validate(&level, "def456").expect_err("stale");
        assert!(matches!(
            err,
            SaveFileError::Mismatch {
                field: "level_sha256",
                ..
            }
        ));
        let err = save
            .validate(&LevelId::new(1, 5), "abc123")
            .expect_err("other level");
        assert!(matches!(err, SaveFileError::Mismatch { field: "level_key", .. }));

        let mut future = save.clone();
        future.save_version = SAVE_VERSION + 1;
        assert!(future.validate(&level, "abc123").is_err());
    }

    #[test]
    fn malformed_save_reports_the_field_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("save.json");
        let raw = json!({
            "save_version": 1,
            "level_key": "1:4",
            "level_sha256": "abc",
            "state": { "levels": { "1:4": { "3": { "switch_state": "on" } } } }
        });
        fs::write(&path, serde_json::to_string(&raw).expect("json")).expect("write");

        let err = read_save_file(&path).expect_err("malformed");
        let field = match err {
            SaveFileError::Parse { field, .. } => field,
            other => panic!("expected parse error, got {other:?}"),
        };
        assert!(field.starts_with("state.levels"), "{field}");
        assert!(field.ends_with("switch_state"), "{field}");
    }
}
