//! Breathing Effort Server - streaming respiratory-effort estimation from
//! blood-volume-pulse (BVP) samples.
//!
//! Clients stream raw BVP chunks over a websocket. Each connection owns a
//! sliding window of samples; every chunk re-evaluates the selected effort
//! calculator over the window and extends a smoothly interpolated effort
//! trace. Both streams are recorded to disk per session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Breathing Effort Server                    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌──────────────────┐    │
//! │  │  Protocol   │──▶│ EffortQueue │──▶│ EffortCalculator │    │
//! │  │ (ws frames) │   │ (15s window)│   │ (envelope / PSD) │    │
//! │  └─────────────┘   └─────────────┘   └──────────────────┘    │
//! │         │                 │                                   │
//! │         ▼                 ▼                                   │
//! │  ┌─────────────┐   ┌─────────────┐                           │
//! │  │ModeRegistry │   │  Recording  │                           │
//! │  │  (by name)  │   │(per session)│                           │
//! │  └─────────────┘   └─────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use breathing_effort_server::core::{EffortCalculator, EffortQueue};
//!
//! let mut queue = EffortQueue::new(960, EffortCalculator::AmplitudeModulation);
//! let chunk: Vec<f64> = (0..32).map(|i| (i as f64 * 0.4).sin() * 50.0).collect();
//! let effort = queue.feed(&chunk);
//! assert!(effort.is_finite());
//! assert_eq!(queue.samples().len(), 16);
//! ```

pub mod config;
pub mod core;
pub mod protocol;
pub mod recording;
pub mod replay;
pub mod server;
pub mod session;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError};
pub use core::{envelope, mad, EffortCalculator, EffortQueue, ModeRegistry, WarmupRamp};
pub use protocol::{Command, Frame, ProtocolError, Reply};
pub use recording::{EffortSink, MemorySink, RecordingError, SessionRecorder, SessionStore};
pub use server::{ServerConfig, ServerHandle};
pub use session::{SessionError, SessionState, StreamingSession};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
