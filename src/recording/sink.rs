//! Sinks receiving `(raw chunk, effort chunk)` pairs.

use super::{session_id_at, RecordingError, EFFORT_SUFFIX, SAMPLES_SUFFIX};
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Destination for the raw and effort streams of one session.
///
/// Each call receives one fed chunk and the effort values produced for it;
/// both slices always have the same length.
pub trait EffortSink: Send {
    fn write_chunk(&mut self, raw: &[f64], effort: &[f64]) -> Result<(), RecordingError>;

    fn flush(&mut self) -> Result<(), RecordingError>;
}

/// Writes a session to `<save_path>/<session_id>/`.
#[derive(Debug)]
pub struct SessionRecorder {
    session_id: String,
    dir: PathBuf,
    samples: BufWriter<File>,
    effort: BufWriter<File>,
    chunks_written: u64,
}

impl SessionRecorder {
    /// Start a new session opened at `opened` in a directory of its own.
    ///
    /// Sessions opened within the same millisecond get a numeric suffix.
    pub fn create_unique(save_path: &Path, opened: DateTime<Utc>) -> Result<Self, RecordingError> {
        std::fs::create_dir_all(save_path)?;
        let base = session_id_at(opened);

        let mut attempt = 0u32;
        loop {
            let session_id = match attempt {
                0 => base.clone(),
                n => format!("{base}-{n}"),
            };
            match std::fs::create_dir(save_path.join(&session_id)) {
                Ok(()) => return Self::create(save_path, &session_id),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Open (or create) the session directory and append to both files.
    pub fn create(save_path: &Path, session_id: &str) -> Result<Self, RecordingError> {
        let dir = save_path.join(session_id);
        std::fs::create_dir_all(&dir)?;

        let open = |suffix: &str| -> Result<BufWriter<File>, RecordingError> {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{session_id}{suffix}")))?;
            Ok(BufWriter::new(file))
        };

        let samples = open(SAMPLES_SUFFIX)?;
        let effort = open(EFFORT_SUFFIX)?;

        Ok(Self {
            session_id: session_id.to_string(),
            dir,
            samples,
            effort,
            chunks_written: 0,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn chunks_written(&self) -> u64 {
        self.chunks_written
    }
}

fn write_values(writer: &mut impl Write, values: &[f64]) -> std::io::Result<()> {
    for value in values {
        writer.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

impl EffortSink for SessionRecorder {
    fn write_chunk(&mut self, raw: &[f64], effort: &[f64]) -> Result<(), RecordingError> {
        write_values(&mut self.samples, raw)?;
        write_values(&mut self.effort, effort)?;
        // Keep both files consistent on disk after every chunk.
        self.flush()?;
        self.chunks_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecordingError> {
        self.samples.flush()?;
        self.effort.flush()?;
        Ok(())
    }
}

/// Keeps everything in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub raw: Vec<f64>,
    pub effort: Vec<f64>,
    pub writes: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EffortSink for MemorySink {
    fn write_chunk(&mut self, raw: &[f64], effort: &[f64]) -> Result<(), RecordingError> {
        self.raw.extend_from_slice(raw);
        self.effort.extend_from_slice(effort);
        self.writes += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), RecordingError> {
        Ok(())
    }
}
