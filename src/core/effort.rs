//! Effort estimation strategies.
//!
//! Every strategy maps a whole sample window to one scalar. The window is
//! re-evaluated from scratch on every feed; nothing is carried over between
//! calls.

use crate::core::envelope::envelope;
use crate::core::stats::{diff, mad, relative_extrema, trapezoid, welch_psd, Extremum};
use serde::{Deserialize, Serialize};

/// Sampling rate assumed by the PSD integral. The integral of a density
/// over frequency does not depend on it.
const PSD_SAMPLE_RATE: f64 = 1.0;

/// A breathing-effort estimation strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffortCalculator {
    /// Integral of the Welch power spectral density.
    Psd,
    /// MAD of the lower envelope (respiratory-induced baseline wander).
    BaselineModulation,
    /// MAD of the upper envelope minus MAD of the lower envelope.
    #[default]
    AmplitudeModulation,
    /// MAD of the second-order upper envelope of the first difference.
    Derivative,
    /// MAD of the beat rate derived from second-order troughs.
    HeartRate,
    /// Product of PSD, baseline, amplitude and derivative efforts.
    Fused,
}

impl EffortCalculator {
    /// Every variant, in declaration order.
    pub const ALL: [EffortCalculator; 6] = [
        EffortCalculator::Psd,
        EffortCalculator::BaselineModulation,
        EffortCalculator::AmplitudeModulation,
        EffortCalculator::Derivative,
        EffortCalculator::HeartRate,
        EffortCalculator::Fused,
    ];

    /// Stable identifier used on the wire (`change_mode`, `list_modes`).
    pub fn name(&self) -> &'static str {
        match self {
            EffortCalculator::Psd => "EffortPSD",
            EffortCalculator::BaselineModulation => "EffortBaselineModulation",
            EffortCalculator::AmplitudeModulation => "EffortAmplitudeModulation",
            EffortCalculator::Derivative => "EffortDerivative",
            EffortCalculator::HeartRate => "EffortHeartRate",
            EffortCalculator::Fused => "EffortFused",
        }
    }

    /// Compute the effort of a sample window.
    ///
    /// Windows shorter than two samples and non-finite results map to `0.0`.
    pub fn effort(&self, window: &[f64]) -> f64 {
        if window.len() < 2 {
            return 0.0;
        }

        let value = match self {
            EffortCalculator::Psd => psd_effort(window),
            EffortCalculator::BaselineModulation => baseline_effort(window),
            EffortCalculator::AmplitudeModulation => amplitude_effort(window),
            EffortCalculator::Derivative => derivative_effort(window),
            EffortCalculator::HeartRate => heart_rate_effort(window),
            EffortCalculator::Fused => {
                psd_effort(window)
                    * baseline_effort(window)
                    * amplitude_effort(window)
                    * derivative_effort(window)
            }
        };

        if value.is_finite() {
            value
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for EffortCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn psd_effort(window: &[f64]) -> f64 {
    let (freqs, power) = welch_psd(window, PSD_SAMPLE_RATE);
    trapezoid(&power, &freqs)
}

fn baseline_effort(window: &[f64]) -> f64 {
    mad(&envelope(window, None, false, 1))
}

fn amplitude_effort(window: &[f64]) -> f64 {
    let top = envelope(window, None, true, 1);
    let bottom = envelope(window, None, false, 1);
    mad(&top) - mad(&bottom)
}

fn derivative_effort(window: &[f64]) -> f64 {
    mad(&envelope(&diff(window), None, true, 2))
}

fn heart_rate_effort(window: &[f64]) -> f64 {
    let troughs = relative_extrema(window, Extremum::Min);
    let trough_values: Vec<f64> = troughs.iter().map(|&i| window[i]).collect();

    // Troughs of the trough sequence drop the shallow notches between beats.
    let beats: Vec<usize> = relative_extrema(&trough_values, Extremum::Min)
        .into_iter()
        .map(|i| troughs[i])
        .collect();

    let rates: Vec<f64> = beats
        .windows(2)
        .map(|pair| 1.0 / (pair[1] - pair[0]) as f64)
        .collect();
    mad(&rates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    /// Synthetic BVP: a 1.2 Hz pulse at 64 Hz whose amplitude and baseline
    /// are modulated by a 0.25 Hz breathing wave.
    fn synthetic_bvp(len: usize, breathing_depth: f64) -> Vec<f64> {
        (0..len)
            .map(|i| {
                let t = i as f64 / 64.0;
                let breath = (2.0 * PI * 0.25 * t).sin();
                let amplitude = 40.0 * (1.0 + breathing_depth * breath);
                amplitude * (2.0 * PI * 1.2 * t).sin() + 20.0 * breathing_depth * breath
            })
            .collect()
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = EffortCalculator::ALL.iter().map(|c| c.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), EffortCalculator::ALL.len());
    }

    #[test]
    fn test_short_windows_are_zero() {
        for calculator in EffortCalculator::ALL {
            assert_eq!(calculator.effort(&[]), 0.0, "{calculator}");
            assert_eq!(calculator.effort(&[3.0]), 0.0, "{calculator}");
        }
    }

    #[test]
    fn test_constant_window_is_zero() {
        let window = vec![12.5; 960];
        for calculator in EffortCalculator::ALL {
            assert_eq!(calculator.effort(&window), 0.0, "{calculator}");
        }
    }

    #[test]
    fn test_degenerate_windows_stay_finite() {
        let monotonic: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let single_peak = [0.0, 1.0, 5.0, 1.0, 0.0];
        for calculator in EffortCalculator::ALL {
            assert!(calculator.effort(&monotonic).is_finite(), "{calculator}");
            assert!(calculator.effort(&single_peak).is_finite(), "{calculator}");
        }
    }

    #[test]
    fn test_baseline_tracks_breathing_depth() {
        let shallow = EffortCalculator::BaselineModulation.effort(&synthetic_bvp(960, 0.05));
        let deep = EffortCalculator::BaselineModulation.effort(&synthetic_bvp(960, 0.5));
        assert!(deep > shallow, "deep = {deep}, shallow = {shallow}");
    }

    #[test]
    fn test_psd_grows_with_signal_power() {
        let quiet: Vec<f64> = synthetic_bvp(960, 0.2).iter().map(|v| v * 0.1).collect();
        let loud = synthetic_bvp(960, 0.2);
        let quiet_effort = EffortCalculator::Psd.effort(&quiet);
        let loud_effort = EffortCalculator::Psd.effort(&loud);
        assert!(quiet_effort > 0.0);
        assert!((loud_effort / quiet_effort - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_heart_rate_of_regular_beats_is_zero() {
        // Beats every 10 samples with a shallow notch between them.
        let mut window = Vec::new();
        for _ in 0..8 {
            window.extend_from_slice(&[5.0, -10.0, 5.0, 8.0, 6.0, 2.0, 6.0, 8.0, 7.0, 6.0]);
        }
        assert_eq!(EffortCalculator::HeartRate.effort(&window), 0.0);
    }

    #[test]
    fn test_heart_rate_of_irregular_beats() {
        // Deep troughs at 10, 30, 40, 60, 70 with shallow troughs between.
        let mut window = vec![10.0; 80];
        for i in [10, 30, 40, 60, 70] {
            window[i] = -10.0;
        }
        for i in [20, 35, 50, 65] {
            window[i] = 0.0;
        }
        // The outermost troughs never qualify as second-order minima, so
        // beats land on 30, 40, 60: rates [0.1, 0.05], deviations 0.025.
        let effort = EffortCalculator::HeartRate.effort(&window);
        assert!((effort - 0.025).abs() < 1e-12, "effort = {effort}");
    }

    #[test]
    fn test_heart_rate_without_beats() {
        let window = [1.0, 0.0, 1.0, 0.0, 1.0];
        assert_eq!(EffortCalculator::HeartRate.effort(&window), 0.0);
    }

    #[test]
    fn test_fused_is_product() {
        let window = synthetic_bvp(960, 0.3);
        let expected = EffortCalculator::Psd.effort(&window)
            * EffortCalculator::BaselineModulation.effort(&window)
            * EffortCalculator::AmplitudeModulation.effort(&window)
            * EffortCalculator::Derivative.effort(&window);
        let fused = EffortCalculator::Fused.effort(&window);
        assert!((fused - expected).abs() <= 1e-9 * expected.abs().max(1.0));
    }
}
