//! Dense resampling of a recorded quantity against along-track distance.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::trim::trim_track;
use crate::units::meters_to_cbl;
use crate::ChartError;

/// Resampled `(distance, value)` pairs, distance in cables.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SmoothCurve {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl SmoothCurve {
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }
}

/// Quadratic interpolating spline with knots at the samples.
///
/// Each interval carries its own parabola; neighbouring parabolas share the
/// knot value and the slope there, so the curve is continuous in value and
/// first derivative. Knot slopes obey `d[i] + d[i + 1] = 2 * secant[i]`,
/// which leaves one degree of freedom. It is fixed by sweeping from both ends
/// (each seeded with the parabola through the three outermost knots) and
/// averaging the two solutions, which keeps the fit symmetric and exact for
/// quadratic data.
#[derive(Clone, Debug)]
pub struct QuadraticInterpolant {
    xs: Vec<f64>,
    ys: Vec<f64>,
    slopes: Vec<f64>,
    curvatures: Vec<f64>,
}

impl QuadraticInterpolant {
    /// `xs` must be strictly monotonic in either direction with at least 3 knots.
    pub fn new(xs: &[f64], ys: &[f64]) -> Result<Self, ChartError> {
        if xs.len() != ys.len() {
            return Err(ChartError::InterpolationDomain(format!(
                "{} distances but {} values",
                xs.len(),
                ys.len()
            )));
        }
        if xs.len() < 3 {
            return Err(ChartError::InterpolationDomain(format!(
                "quadratic interpolation needs at least 3 points, got {}",
                xs.len()
            )));
        }
        if let Some(idx) = ys.iter().position(|v| !v.is_finite()) {
            return Err(ChartError::InterpolationDomain(format!(
                "non-finite value at sample {idx}"
            )));
        }
        let ascending = xs.windows(2).all(|w| w[0] < w[1]);
        let descending = xs.windows(2).all(|w| w[0] > w[1]);
        let (mut kx, mut ky) = (xs.to_vec(), ys.to_vec());
        if descending {
            kx.reverse();
            ky.reverse();
        } else if !ascending {
            let idx = xs
                .windows(2)
                .position(|w| w[0] == w[1])
                .map(|i| format!("duplicate distance at sample {}", i + 1))
                .unwrap_or_else(|| "distances change direction".to_string());
            return Err(ChartError::InterpolationDomain(format!(
                "distances are not strictly monotonic: {idx}"
            )));
        }

        let n = kx.len();
        let secants: Vec<f64> = (0..n - 1)
            .map(|i| (ky[i + 1] - ky[i]) / (kx[i + 1] - kx[i]))
            .collect();

        let mut forward = vec![0.0; n];
        forward[0] = parabola_slope(&kx[..3], &ky[..3], kx[0]);
        for i in 0..n - 1 {
            forward[i + 1] = 2.0 * secants[i] - forward[i];
        }
        let mut backward = vec![0.0; n];
        backward[n - 1] = parabola_slope(&kx[n - 3..], &ky[n - 3..], kx[n - 1]);
        for i in (0..n - 1).rev() {
            backward[i] = 2.0 * secants[i] - backward[i + 1];
        }

        let slopes: Vec<f64> = forward
            .iter()
            .zip(backward.iter())
            .map(|(f, b)| 0.5 * (f + b))
            .collect();
        let curvatures: Vec<f64> = (0..n - 1)
            .map(|i| (secants[i] - slopes[i]) / (kx[i + 1] - kx[i]))
            .collect();

        Ok(Self {
            xs: kx,
            ys: ky,
            slopes,
            curvatures,
        })
    }

    pub fn eval(&self, x: f64) -> f64 {
        let n = self.xs.len();
        let x = x.clamp(self.xs[0], self.xs[n - 1]);
        // Interval [i, i + 1] containing x.
        let i = self.xs.partition_point(|&k| k <= x).clamp(1, n - 1) - 1;
        let t = x - self.xs[i];
        self.ys[i] + t * (self.slopes[i] + t * self.curvatures[i])
    }
}

/// Derivative at `x` of the parabola through three knots.
fn parabola_slope(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let (x0, x1, x2) = (xs[0], xs[1], xs[2]);
    let l0 = ((x - x1) + (x - x2)) / ((x0 - x1) * (x0 - x2));
    let l1 = ((x - x0) + (x - x2)) / ((x1 - x0) * (x1 - x2));
    let l2 = ((x - x0) + (x - x1)) / ((x2 - x0) * (x2 - x1));
    ys[0] * l0 + ys[1] * l1 + ys[2] * l2
}

/// Smooth `values` against `distances_m` (meters) into `samples` points.
///
/// Distances are converted to cables and the downwind prefix is trimmed
/// before fitting. The resampled axis runs from the first to the last trimmed
/// distance.
pub fn interpolate(
    distances_m: &[f64],
    values: &[f64],
    samples: usize,
) -> Result<SmoothCurve, ChartError> {
    if samples < 2 {
        return Err(ChartError::InvalidParameter(format!(
            "at least 2 resample points required, got {samples}"
        )));
    }
    let distances: Vec<f64> = distances_m.iter().map(|&m| meters_to_cbl(m)).collect();
    let track = trim_track(&distances, values)?;
    let interpolant = QuadraticInterpolant::new(&track.distances, &track.values)?;

    let first = track.distances[0];
    let last = track.distances[track.len() - 1];
    let xs = Array1::linspace(first, last, samples);
    let ys = xs.mapv(|x| interpolant.eval(x));
    Ok(SmoothCurve {
        xs: xs.to_vec(),
        ys: ys.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reproduces_a_parabola_exactly() {
        let xs = [0.0, 1.0, 2.5, 4.0, 7.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x * x - 3.0 * x + 1.0).collect();
        let f = QuadraticInterpolant::new(&xs, &ys).unwrap();
        for t in [0.0, 0.3, 1.7, 3.2, 5.5, 7.0] {
            assert_abs_diff_eq!(f.eval(t), 2.0 * t * t - 3.0 * t + 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn passes_through_every_knot() {
        let xs = [9.0, 6.0, 4.0, 3.0, 1.0, 0.0];
        let ys = [1.0, -2.0, 0.5, 3.0, 3.0, 8.0];
        let f = QuadraticInterpolant::new(&xs, &ys).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_abs_diff_eq!(f.eval(*x), *y, epsilon = 1e-9);
        }
    }

    #[test]
    fn continuous_across_interval_midpoints() {
        let xs = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let f = QuadraticInterpolant::new(&xs, &ys).unwrap();
        let eps = 1e-9;
        for w in xs.windows(2) {
            let mid = 0.5 * (w[0] + w[1]);
            assert!((f.eval(mid - eps) - f.eval(mid + eps)).abs() < 1e-6, "jump at {mid}");
        }
    }

    #[test]
    fn slope_is_continuous_at_knots() {
        let xs = [0.0, 0.7, 1.5, 2.1, 3.4, 4.0, 5.2];
        let ys = [8.4, 8.1, 7.6, 8.3, 8.0, 7.2, 8.9];
        let f = QuadraticInterpolant::new(&xs, &ys).unwrap();
        let h = 1e-6;
        for &k in &xs[1..xs.len() - 1] {
            let left = (f.eval(k) - f.eval(k - h)) / h;
            let right = (f.eval(k + h) - f.eval(k)) / h;
            assert!((left - right).abs() < 1e-3, "kink at {k}: {left} vs {right}");
            assert!((f.eval(k - h) - f.eval(k + h)).abs() < 1e-4);
        }
    }

    #[test]
    fn resamples_inbound_track() {
        let distances_m: Vec<f64> = (0..20).rev().map(|i| i as f64 * 100.0).collect();
        let values: Vec<f64> = distances_m.iter().map(|m| m / 10.0).collect();
        let curve = interpolate(&distances_m, &values, 500).unwrap();
        assert_eq!(curve.len(), 500);
        assert_abs_diff_eq!(curve.xs[0], meters_to_cbl(1900.0), epsilon = 1e-9);
        assert_abs_diff_eq!(curve.xs[499], 0.0, epsilon = 1e-9);
        // Linear data stays linear.
        for (x, y) in curve.xs.iter().zip(curve.ys.iter()) {
            assert_abs_diff_eq!(*y, x * 185.2 / 10.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn trims_downwind_before_fitting() {
        let distances_m = [100.0, 300.0, 900.0, 700.0, 500.0, 200.0, 0.0];
        let values = [50.0, 50.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let curve = interpolate(&distances_m, &values, 10).unwrap();
        assert_abs_diff_eq!(curve.xs[0], meters_to_cbl(900.0), epsilon = 1e-9);
        assert_abs_diff_eq!(curve.ys[0], 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(curve.ys[9], 5.0, epsilon = 1e-9);
    }

    #[test]
    fn two_points_are_not_enough() {
        let err = interpolate(&[200.0, 100.0], &[1.0, 2.0], 500).unwrap_err();
        assert!(matches!(err, ChartError::InterpolationDomain(_)));
        // Downwind trimming can also leave too little behind.
        let err = interpolate(&[100.0, 200.0, 300.0, 250.0], &[0.0; 4], 500).unwrap_err();
        assert!(matches!(err, ChartError::InterpolationDomain(_)));
    }

    #[test]
    fn duplicate_distances_are_rejected() {
        let err = interpolate(&[400.0, 300.0, 300.0, 100.0], &[1.0, 2.0, 3.0, 4.0], 50)
            .unwrap_err();
        assert!(matches!(err, ChartError::InterpolationDomain(_)));
    }

    #[test]
    fn malformed_distance_surfaces_integrity_error() {
        let err = interpolate(&[400.0, f64::NAN, 100.0], &[1.0, 2.0, 3.0], 50).unwrap_err();
        assert!(matches!(err, ChartError::SequenceIntegrity { index: 1, .. }));
    }
}
