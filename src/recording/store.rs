//! Read-back of recorded sessions.

use super::{RecordingError, EFFORT_SUFFIX, SAMPLES_SUFFIX, VALUE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Both streams of a recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedSession {
    pub samples: Vec<f64>,
    pub effort: Vec<f64>,
}

/// Browses the session directories under a save path.
#[derive(Debug, Clone)]
pub struct SessionStore {
    root: PathBuf,
}

impl SessionStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Recorded session ids, oldest first. A missing save path has none.
    pub fn list(&self) -> Result<Vec<String>, RecordingError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    ids.push(name.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Load both streams of a session.
    pub fn open(&self, session_id: &str) -> Result<RecordedSession, RecordingError> {
        let valid_id = !session_id.is_empty()
            && !session_id.contains(['/', '\\'])
            && session_id != "."
            && session_id != "..";
        let dir = self.root.join(session_id);
        if !valid_id || !dir.is_dir() {
            return Err(RecordingError::UnknownSession(session_id.to_string()));
        }

        Ok(RecordedSession {
            samples: read_values(&dir.join(format!("{session_id}{SAMPLES_SUFFIX}")))?,
            effort: read_values(&dir.join(format!("{session_id}{EFFORT_SUFFIX}")))?,
        })
    }
}

fn read_values(path: &Path) -> Result<Vec<f64>, RecordingError> {
    let bytes = std::fs::read(path)?;
    if bytes.len() % VALUE_SIZE != 0 {
        return Err(RecordingError::Corrupt {
            path: path.to_path_buf(),
            len: bytes.len() as u64,
        });
    }

    Ok(bytes
        .chunks_exact(VALUE_SIZE)
        .map(|raw| {
            let mut value = [0u8; VALUE_SIZE];
            value.copy_from_slice(raw);
            f64::from_le_bytes(value)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{EffortSink, SessionRecorder};

    #[test]
    fn test_list_and_open() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());

        let mut later = SessionRecorder::create(dir.path(), "2017-03-05-00-00-00-000").unwrap();
        later.write_chunk(&[9.0], &[0.9]).unwrap();
        let mut earlier = SessionRecorder::create(dir.path(), "2017-03-04-00-00-00-000").unwrap();
        earlier.write_chunk(&[1.0, 2.0], &[0.1, 0.2]).unwrap();
        std::fs::write(dir.path().join("stray.txt"), b"ignored").unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec!["2017-03-04-00-00-00-000", "2017-03-05-00-00-00-000"]
        );

        let session = store.open("2017-03-04-00-00-00-000").unwrap();
        assert_eq!(session.samples, vec![1.0, 2.0]);
        assert_eq!(session.effort, vec![0.1, 0.2]);
    }

    #[test]
    fn test_missing_root_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("nope"));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        for id in ["missing", "..", "../etc", ""] {
            assert!(matches!(store.open(id), Err(RecordingError::UnknownSession(_))));
        }
    }

    #[test]
    fn test_corrupt_recording() {
        let dir = tempfile::tempdir().unwrap();
        let session_dir = dir.path().join("broken");
        std::fs::create_dir_all(&session_dir).unwrap();
        std::fs::write(session_dir.join("broken-samples.bin"), [0u8; 12]).unwrap();
        std::fs::write(session_dir.join("broken-effort.bin"), [0u8; 8]).unwrap();

        let store = SessionStore::new(dir.path());
        assert!(matches!(
            store.open("broken"),
            Err(RecordingError::Corrupt { len: 12, .. })
        ));
    }
}
