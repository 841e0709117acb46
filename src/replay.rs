//! Replay of recorded BVP files against a running server.
//!
//! Recordings are single-column CSV exports: the first line is the start
//! timestamp, the second the sampling rate, then one sample per line. The
//! first five seconds (rate row included) are instrument calibration and
//! are skipped.

use crate::protocol::Command;
use futures_util::SinkExt;
use std::path::Path;
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// Seconds of calibration data dropped from the start of a recording.
pub const CALIBRATION_SECONDS: usize = 5;

/// File name looked up when a recording directory is given.
pub const BVP_FILE_NAME: &str = "BVP.csv";

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("chunk size must be positive")]
    InvalidChunkSize,

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// A BVP recording with calibration samples removed.
#[derive(Debug, Clone, PartialEq)]
pub struct BvpRecording {
    /// Unix timestamp of the first sample
    pub start_timestamp: f64,
    /// Sampling rate in Hz
    pub sample_rate: f64,
    /// Samples after calibration
    pub samples: Vec<f64>,
}

impl BvpRecording {
    /// Parse the CSV export.
    pub fn parse(text: &str) -> Result<Self, ReplayError> {
        let mut rows = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                let field = line.split(',').next().unwrap_or("").trim();
                field.parse::<f64>().map_err(|e| ReplayError::Parse {
                    line: index + 1,
                    message: format!("{field:?}: {e}"),
                })
            });

        let start_timestamp = rows.next().ok_or_else(|| ReplayError::Parse {
            line: 1,
            message: "missing start timestamp".to_string(),
        })??;

        let data: Vec<f64> = rows.collect::<Result<_, _>>()?;
        let sample_rate = *data.first().ok_or_else(|| ReplayError::Parse {
            line: 2,
            message: "missing sample rate".to_string(),
        })?;

        let skip = CALIBRATION_SECONDS * sample_rate.max(0.0) as usize;
        let samples = data.into_iter().skip(skip).collect();

        Ok(Self {
            start_timestamp,
            sample_rate,
            samples,
        })
    }

    /// Load a recording from a CSV file, or from `BVP.csv` inside a directory.
    pub fn load(path: &Path) -> Result<Self, ReplayError> {
        let path = if path.is_dir() {
            path.join(BVP_FILE_NAME)
        } else {
            path.to_path_buf()
        };
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Complete chunks of `size` samples; a trailing partial chunk is dropped.
    pub fn chunks(&self, size: usize) -> Result<std::slice::ChunksExact<'_, f64>, ReplayError> {
        if size == 0 {
            return Err(ReplayError::InvalidChunkSize);
        }
        Ok(self.samples.chunks_exact(size))
    }
}

/// Stream a recording to the server at `url`.
///
/// Issues `restart` and `change_mode` first, then sends every complete
/// chunk as a JSON array. Returns the number of chunks sent.
pub async fn replay(
    url: &str,
    recording: &BvpRecording,
    mode: &str,
    chunk_size: usize,
) -> Result<usize, ReplayError> {
    let chunks = recording.chunks(chunk_size)?;

    let (mut ws, _) = connect_async(url).await?;
    tracing::info!("Connected to {}", url);

    let setup = [
        Command::Restart,
        Command::ChangeMode {
            mode: mode.to_string(),
        },
    ];
    for command in &setup {
        ws.send(Message::Text(serde_json::to_string(&command.to_frame())?))
            .await?;
    }

    let mut sent = 0;
    for chunk in chunks {
        ws.send(Message::Text(serde_json::to_string(chunk)?)).await?;
        sent += 1;
    }

    ws.send(Message::Close(None)).await?;
    tracing::info!("Replayed {} chunks of {} samples", sent, chunk_size);
    Ok(sent)
}
