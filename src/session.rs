//! Per-connection streaming session.
//!
//! A session owns its own [`EffortQueue`] and sink, so concurrent
//! connections never share buffers. Frames are handled strictly in arrival
//! order: each data frame is fed, then persisted, before the next frame is
//! looked at.

use crate::core::{EffortQueue, ModeRegistry};
use crate::protocol::{Command, Frame, ProtocolError, Reply};
use crate::recording::{EffortSink, RecordingError};
use std::sync::Arc;
use thiserror::Error;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, nothing received yet.
    Open,
    /// At least one frame received.
    Streaming,
    /// Sinks flushed; no more frames accepted.
    Closed,
}

/// Failures that end a session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session is closed")]
    Closed,

    #[error("recording failed: {0}")]
    Recording(#[from] RecordingError),
}

/// Protocol handler for one connection.
pub struct StreamingSession<S: EffortSink> {
    id: String,
    queue: EffortQueue,
    registry: Arc<ModeRegistry>,
    sink: S,
    state: SessionState,
    chunks_fed: u64,
}

impl<S: EffortSink> StreamingSession<S> {
    pub fn new(
        id: impl Into<String>,
        queue: EffortQueue,
        registry: Arc<ModeRegistry>,
        sink: S,
    ) -> Self {
        let id = id.into();
        tracing::info!(
            session = %id,
            mode = %queue.calculator(),
            capacity = queue.capacity(),
            warmup = ?queue.warmup(),
            "session opened"
        );

        Self {
            id,
            queue,
            registry,
            sink,
            state: SessionState::Open,
            chunks_fed: 0,
        }
    }

    /// Handle one inbound text frame.
    ///
    /// Returns the reply to send back, if any. Decode failures and command
    /// errors are recovered here; only sink failures (and use after close)
    /// are returned as errors, and those end the session.
    pub fn handle_frame(&mut self, text: &str) -> Result<Option<Reply>, SessionError> {
        if self.state == SessionState::Closed {
            return Err(SessionError::Closed);
        }
        self.state = SessionState::Streaming;

        let frame = match Frame::decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(session = %self.id, error = %e, "dropping frame");
                return Ok(None);
            }
        };

        match frame {
            Frame::Command(raw) => {
                tracing::info!(
                    session = %self.id,
                    command = %raw.command,
                    args = %raw.args,
                    "running command"
                );
                let result = Command::parse(&raw).and_then(|command| self.run_command(command));
                match result {
                    Ok(reply) => Ok(reply),
                    Err(e) => {
                        tracing::warn!(session = %self.id, error = %e, "command failed");
                        Ok(Some(Reply::error(&e)))
                    }
                }
            }
            Frame::Data(chunk) => {
                self.feed(&chunk)?;
                Ok(None)
            }
        }
    }

    /// Execute a validated command.
    pub fn run_command(&mut self, command: Command) -> Result<Option<Reply>, ProtocolError> {
        match command {
            Command::Restart => {
                self.restart();
                Ok(None)
            }
            Command::ChangeMode { mode } => {
                self.change_mode(&mode)?;
                Ok(None)
            }
            Command::ListModes => Ok(Some(Reply::Modes {
                modes: self.list_modes(),
            })),
        }
    }

    /// Feed a chunk to the queue and persist it with its effort ramp.
    pub fn feed(&mut self, chunk: &[f64]) -> Result<f64, RecordingError> {
        let latest = self.queue.feed(chunk);
        self.sink.write_chunk(chunk, self.queue.last_ramp())?;
        self.chunks_fed += 1;

        tracing::debug!(
            session = %self.id,
            samples = chunk.len(),
            valid = self.queue.total_valid_samples(),
            warming_up = self.queue.is_warming_up(),
            effort = latest,
            "fed chunk"
        );
        Ok(latest)
    }

    /// Clear the queue, keeping the active calculator.
    pub fn restart(&mut self) {
        tracing::info!(session = %self.id, "restarting");
        self.queue.clear();
    }

    /// Switch to the calculator registered as `mode`, then restart.
    ///
    /// An unknown mode leaves the active calculator in place.
    pub fn change_mode(&mut self, mode: &str) -> Result<(), ProtocolError> {
        let calculator = self
            .registry
            .create(mode)
            .ok_or_else(|| ProtocolError::UnknownMode(mode.to_string()))?;

        self.queue.set_calculator(calculator);
        tracing::info!(session = %self.id, mode = %calculator, "changed effort calculation mode");
        self.restart();
        Ok(())
    }

    pub fn list_modes(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Flush the sink and stop accepting frames.
    pub fn close(&mut self) -> Result<(), SessionError> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.sink.flush()?;
        tracing::info!(session = %self.id, chunks = self.chunks_fed, "session closed");
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn queue(&self) -> &EffortQueue {
        &self.queue
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn chunks_fed(&self) -> u64 {
        self.chunks_fed
    }
}
