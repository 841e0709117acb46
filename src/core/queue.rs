//! Sliding-window effort queue.
//!
//! The queue keeps a fixed-capacity window of raw samples and a parallel
//! effort trace of the same capacity. Each fed chunk shifts both buffers
//! left, re-evaluates the calculator over the whole valid window and writes
//! a linear ramp from the previous effort value to the new one into the
//! effort trace, so the trace stays continuous across chunks.

use crate::core::effort::EffortCalculator;
use serde::{Deserialize, Serialize};

/// How fast the valid-sample count grows before the window is full.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupRamp {
    /// Advance by half of each chunk (the deployed behaviour).
    #[default]
    Half,
    /// Advance by the full chunk length.
    Full,
}

impl WarmupRamp {
    fn advance(self, chunk_len: usize) -> usize {
        match self {
            WarmupRamp::Half => chunk_len / 2,
            WarmupRamp::Full => chunk_len,
        }
    }
}

/// Fixed-capacity raw-sample window plus its effort trace.
#[derive(Debug, Clone)]
pub struct EffortQueue {
    samples: Vec<f64>,
    effort: Vec<f64>,
    total_valid: usize,
    warmup: WarmupRamp,
    calculator: EffortCalculator,
    last_ramp: Vec<f64>,
}

impl EffortQueue {
    /// Create a zero-filled queue holding `capacity` samples.
    pub fn new(capacity: usize, calculator: EffortCalculator) -> Self {
        Self::with_warmup(capacity, calculator, WarmupRamp::default())
    }

    pub fn with_warmup(capacity: usize, calculator: EffortCalculator, warmup: WarmupRamp) -> Self {
        Self {
            samples: vec![0.0; capacity],
            effort: vec![0.0; capacity],
            total_valid: 0,
            warmup,
            calculator,
            last_ramp: Vec::new(),
        }
    }

    /// Push a chunk of raw samples and return the effort of the updated window.
    ///
    /// An empty chunk leaves the queue untouched and returns the most recent
    /// effort value.
    pub fn feed(&mut self, chunk: &[f64]) -> f64 {
        if chunk.is_empty() {
            self.last_ramp.clear();
            return self.last_effort();
        }

        if self.total_valid < self.capacity() {
            let advanced = self.total_valid + self.warmup.advance(chunk.len());
            self.total_valid = advanced.min(self.capacity());
        }

        push_tail(&mut self.samples, chunk);
        let latest = self.calculator.effort(self.samples());

        self.last_ramp = ramp(self.last_effort(), latest, chunk.len());
        push_tail(&mut self.effort, &self.last_ramp);

        latest
    }

    /// The valid tail of the sample window.
    pub fn samples(&self) -> &[f64] {
        &self.samples[self.capacity() - self.total_valid..]
    }

    /// The valid tail of the effort trace.
    pub fn effort(&self) -> &[f64] {
        &self.effort[self.capacity() - self.total_valid..]
    }

    /// Effort values written by the most recent feed, one per fed sample.
    pub fn last_ramp(&self) -> &[f64] {
        &self.last_ramp
    }

    /// Newest value of the effort trace (`0.0` before any feed).
    pub fn last_effort(&self) -> f64 {
        self.effort.last().copied().unwrap_or(0.0)
    }

    /// Zero both buffers and restart warm-up. The calculator is kept.
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
        self.effort.fill(0.0);
        self.total_valid = 0;
        self.last_ramp.clear();
    }

    pub fn capacity(&self) -> usize {
        self.samples.len()
    }

    pub fn total_valid_samples(&self) -> usize {
        self.total_valid
    }

    pub fn is_warming_up(&self) -> bool {
        self.total_valid < self.capacity()
    }

    pub fn calculator(&self) -> EffortCalculator {
        self.calculator
    }

    pub fn set_calculator(&mut self, calculator: EffortCalculator) {
        self.calculator = calculator;
    }

    pub fn warmup(&self) -> WarmupRamp {
        self.warmup
    }
}

/// Shift `buffer` left by the chunk length and copy the chunk into the tail.
/// Only the newest `buffer.len()` values of an oversized chunk are kept.
fn push_tail(buffer: &mut [f64], chunk: &[f64]) {
    let capacity = buffer.len();
    let chunk = &chunk[chunk.len().saturating_sub(capacity)..];
    let n = chunk.len();
    buffer.copy_within(n.., 0);
    buffer[capacity - n..].copy_from_slice(chunk);
}

/// `len` evenly spaced values from `from` to `to`, both inclusive. A
/// single-value ramp is just `to`.
fn ramp(from: f64, to: f64, len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![to],
        _ => {
            let step = (to - from) / (len - 1) as f64;
            (0..len)
                .map(|i| if i == len - 1 { to } else { from + step * i as f64 })
                .collect()
        }
    }
}
