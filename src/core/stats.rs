//! Numeric building blocks shared by the effort calculators.
//!
//! Everything here works on plain `f64` slices and never panics on short or
//! empty input: degenerate inputs produce empty outputs or `0.0`.

use rustfft::{num_complex::Complex, FftPlanner};
use statrs::statistics::{Data, OrderStatistics};

/// Default Welch segment length (matches the usual periodogram default).
pub const WELCH_SEGMENT_LEN: usize = 256;

/// Which kind of local extremum to look for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extremum {
    Max,
    Min,
}

impl Extremum {
    fn beats(self, value: f64, neighbour: f64) -> bool {
        match self {
            Extremum::Max => value > neighbour,
            Extremum::Min => value < neighbour,
        }
    }
}

/// Indices of strict local extrema.
///
/// A sample qualifies only when it strictly beats both neighbours, so the
/// first and last samples are never reported and plateaus are skipped.
pub fn relative_extrema(signal: &[f64], kind: Extremum) -> Vec<usize> {
    if signal.len() < 3 {
        return Vec::new();
    }

    (1..signal.len() - 1)
        .filter(|&i| kind.beats(signal[i], signal[i - 1]) && kind.beats(signal[i], signal[i + 1]))
        .collect()
}

/// First difference, `out[i] = signal[i + 1] - signal[i]`.
pub fn diff(signal: &[f64]) -> Vec<f64> {
    signal.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

/// Median of the values. Even-length input averages the two middle values.
///
/// Returns `None` for empty input.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut data = Data::new(values.to_vec());
    Some(data.median())
}

/// Unscaled median absolute deviation: `median(|x - median(x)|)`.
///
/// Empty input yields `0.0`.
pub fn mad(values: &[f64]) -> f64 {
    let Some(center) = median(values) else {
        return 0.0;
    };
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations).unwrap_or(0.0)
}

/// Trapezoidal integral of `y` over the sample points `x`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(y, x)| (x[1] - x[0]) * (y[0] + y[1]) / 2.0)
        .sum()
}

/// Periodic Hann window of length `len`.
fn hann(len: usize) -> Vec<f64> {
    if len == 1 {
        return vec![1.0];
    }
    (0..len)
        .map(|i| 0.5 - 0.5 * (2.0 * std::f64::consts::PI * i as f64 / len as f64).cos())
        .collect()
}

/// Power spectral density estimate using Welch's averaged periodogram.
///
/// Hann window, segments of `min(256, len)` samples with 50% overlap, each
/// segment mean-detrended, one-sided density scaling. Returns
/// `(frequencies, power)`; both are empty for empty input.
pub fn welch_psd(signal: &[f64], fs: f64) -> (Vec<f64>, Vec<f64>) {
    let n = signal.len();
    if n == 0 || fs <= 0.0 {
        return (Vec::new(), Vec::new());
    }

    let seg_len = n.min(WELCH_SEGMENT_LEN);
    let overlap = seg_len / 2;
    let step = seg_len - overlap;
    let segments = (n - overlap) / step;
    let bins = seg_len / 2 + 1;

    let window = hann(seg_len);
    let window_power: f64 = window.iter().map(|w| w * w).sum();
    let scale = 1.0 / (fs * window_power);

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(seg_len);

    let mut power = vec![0.0; bins];
    let mut buffer = vec![Complex::new(0.0, 0.0); seg_len];
    for s in 0..segments {
        let segment = &signal[s * step..s * step + seg_len];
        let mean = segment.iter().sum::<f64>() / seg_len as f64;

        for ((slot, &sample), &w) in buffer.iter_mut().zip(segment).zip(&window) {
            *slot = Complex::new((sample - mean) * w, 0.0);
        }
        fft.process(&mut buffer);

        for (acc, c) in power.iter_mut().zip(&buffer) {
            *acc += c.norm_sqr() * scale;
        }
    }

    // Fold negative frequencies in: double everything except DC and,
    // for even segment lengths, the Nyquist bin.
    let last_doubled = if seg_len % 2 == 0 { bins - 1 } else { bins };
    for (k, p) in power.iter_mut().enumerate() {
        *p /= segments as f64;
        if k > 0 && k < last_doubled {
            *p *= 2.0;
        }
    }

    let freqs = (0..bins).map(|k| k as f64 * fs / seg_len as f64).collect();
    (freqs, power)
}
