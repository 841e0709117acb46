//! Envelope extraction by interpolating through local extrema.
//!
//! Each pass finds the strict local maxima (upper envelope) or minima (lower
//! envelope) of the current signal and replaces the signal with the
//! piecewise-linear curve through them. Values outside the first/last
//! extremum are extrapolated linearly from the outermost segments. Running
//! more passes takes the extrema of the previous envelope, giving smoother,
//! higher-order envelopes.

use crate::core::stats::{relative_extrema, Extremum};

/// Compute the upper (`top`) or lower envelope of `signal`.
///
/// The result is evaluated at `x` when given, otherwise at every index
/// `0..signal.len()`. A pass that finds no extrema (flat or monotonic
/// input) fits a straight line through the first and last samples, and a
/// pass that finds exactly one yields a constant at that value. Zero
/// iterations returns the signal unchanged.
pub fn envelope(signal: &[f64], x: Option<&[f64]>, top: bool, iterations: usize) -> Vec<f64> {
    let default_x: Vec<f64>;
    let at = match x {
        Some(x) => x,
        None => {
            default_x = (0..signal.len()).map(|i| i as f64).collect();
            &default_x
        }
    };
    let kind = if top { Extremum::Max } else { Extremum::Min };

    let mut current = signal.to_vec();
    for _ in 0..iterations {
        let mut knots = relative_extrema(&current, kind);
        if knots.is_empty() {
            knots = match current.len() {
                0 => Vec::new(),
                1 => vec![0],
                n => vec![0, n - 1],
            };
        }

        let knot_x: Vec<f64> = knots.iter().map(|&i| i as f64).collect();
        let knot_y: Vec<f64> = knots.iter().map(|&i| current[i]).collect();
        current = interpolate(&knot_x, &knot_y, at);
    }

    current
}

/// Piecewise-linear interpolation through `(knot_x, knot_y)` with linear
/// extrapolation past both ends. `knot_x` must be strictly increasing.
pub fn interpolate(knot_x: &[f64], knot_y: &[f64], at: &[f64]) -> Vec<f64> {
    match knot_x.len() {
        0 => vec![0.0; at.len()],
        1 => vec![knot_y[0]; at.len()],
        n => at
            .iter()
            .map(|&t| {
                let segment = knot_x.partition_point(|&k| k <= t).saturating_sub(1).min(n - 2);
                let (x0, x1) = (knot_x[segment], knot_x[segment + 1]);
                let (y0, y1) = (knot_y[segment], knot_y[segment + 1]);
                y0 + (t - x0) * (y1 - y0) / (x1 - x0)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-9, "{a:?} != {b:?}");
        }
    }

    #[test]
    fn test_interpolate_extrapolates_linearly() {
        let out = interpolate(&[1.0, 3.0], &[2.0, 6.0], &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_close(&out, &[0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_interpolate_degenerate_knots() {
        assert_eq!(interpolate(&[2.0], &[5.0], &[0.0, 1.0, 9.0]), vec![5.0; 3]);
        assert_eq!(interpolate(&[], &[], &[0.0, 1.0]), vec![0.0; 2]);
    }

    #[test]
    fn test_upper_envelope_through_peaks() {
        // Peaks at 1 (value 4) and 5 (value 8).
        let signal = [0.0, 4.0, 1.0, 2.0, 1.0, 8.0, 0.0];
        // Index 3 is also a peak (2 > 1 on both sides).
        let out = envelope(&signal, None, true, 1);
        let expected = interpolate(&[1.0, 3.0, 5.0], &[4.0, 2.0, 8.0], &[0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_close(&out, &expected);
    }

    #[test]
    fn test_lower_envelope_through_troughs() {
        let signal = [5.0, 1.0, 5.0, 5.0, 3.0, 5.0];
        let out = envelope(&signal, None, false, 1);
        // Troughs at 1 (1.0) and 4 (3.0): slope 2/3 per sample.
        let expected: Vec<f64> = (0..6).map(|i| 1.0 + (i as f64 - 1.0) * 2.0 / 3.0).collect();
        assert_close(&out, &expected);
    }

    #[test]
    fn test_monotonic_signal_does_not_panic() {
        let signal: Vec<f64> = (0..20).map(|i| i as f64 * 0.5).collect();
        for iterations in 1..5 {
            let out = envelope(&signal, None, true, iterations);
            assert_close(&out, &signal);
        }
    }

    #[test]
    fn test_convex_monotonic_signal_gives_chord() {
        let signal = [0.0, 1.0, 4.0, 9.0, 16.0, 25.0];
        for top in [true, false] {
            for iterations in 1..4 {
                let out = envelope(&signal, None, top, iterations);
                assert_close(&out, &[0.0, 5.0, 10.0, 15.0, 20.0, 25.0]);
            }
        }

        let out = envelope(&signal, Some(&[-1.0, 2.5, 7.0]), true, 1);
        assert_close(&out, &[-5.0, 12.5, 35.0]);
    }

    #[test]
    fn test_single_sample_envelope() {
        assert_eq!(envelope(&[4.0], None, true, 2), vec![4.0]);
    }

    #[test]
    fn test_single_extremum_gives_constant() {
        let signal = [0.0, 1.0, 2.0, 9.0, 2.0, 1.0, 0.0];
        let out = envelope(&signal, None, true, 1);
        assert_eq!(out, vec![9.0; 7]);

        // The flat result has no peaks, so further passes keep it flat.
        let out = envelope(&signal, None, true, 3);
        assert_eq!(out, vec![9.0; 7]);
    }

    #[test]
    fn test_flat_and_empty_signals() {
        assert_eq!(envelope(&[2.0; 10], None, false, 2), vec![2.0; 10]);
        assert!(envelope(&[], None, true, 1).is_empty());
    }

    #[test]
    fn test_custom_evaluation_points() {
        let signal = [0.0, 4.0, 0.0, 0.0, 8.0, 0.0];
        let at = [0.5, 2.5, 6.0];
        let out = envelope(&signal, Some(&at), true, 1);
        // Peaks (1, 4) and (4, 8): slope 4/3.
        let expected: Vec<f64> = at.iter().map(|t| 4.0 + (t - 1.0) * 4.0 / 3.0).collect();
        assert_close(&out, &expected);
    }

    #[test]
    fn test_zero_iterations_is_identity() {
        let signal = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(envelope(&signal, None, true, 0), signal.to_vec());
    }
}
