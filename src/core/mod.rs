//! Core signal processing for breathing-effort estimation.
//!
//! This module contains:
//! - Numeric helpers (extrema, MAD, Welch PSD)
//! - Envelope extraction
//! - The effort calculators and their name registry
//! - The sliding-window queue that drives a calculator over a sample stream

pub mod effort;
pub mod envelope;
pub mod queue;
pub mod registry;
pub mod stats;

// Re-export commonly used types
pub use effort::EffortCalculator;
pub use envelope::envelope;
pub use queue::{EffortQueue, WarmupRamp};
pub use registry::ModeRegistry;
pub use stats::mad;
