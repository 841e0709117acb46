//! Session persistence.
//!
//! Every streaming session gets its own directory under the save path,
//! named by a timestamp-derived session id. Inside it two append-only files
//! hold the raw samples and the effort values as little-endian `f64`s, with
//! no header or length prefix.

pub mod sink;
pub mod store;

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use thiserror::Error;

pub use sink::{EffortSink, MemorySink, SessionRecorder};
pub use store::{RecordedSession, SessionStore};

/// Size in bytes of one persisted value.
pub const VALUE_SIZE: usize = std::mem::size_of::<f64>();

/// Suffix of the raw-sample file, after the session id.
pub const SAMPLES_SUFFIX: &str = "-samples.bin";

/// Suffix of the effort file, after the session id.
pub const EFFORT_SUFFIX: &str = "-effort.bin";

/// Session id for a connection opened at `opened`.
pub fn session_id_at(opened: DateTime<Utc>) -> String {
    opened.format("%Y-%m-%d-%H-%M-%S-%3f").to_string()
}

/// Recording errors.
#[derive(Debug, Error)]
pub enum RecordingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error("corrupt recording {path}: {len} bytes is not a whole number of samples")]
    Corrupt { path: PathBuf, len: u64 },
}
