//! Statistics over an ordered window of samples.
//!
//! Samples are indexed by arrival order, so the regression abscissa is
//! simply `0..N`. Degenerate inputs yield `None` (or `+inf` for a rate
//! from zero) instead of a numeric fault.

use serde::{Serialize, Serializer};

/// Slope and intercept of `value = slope * index + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

/// Trend signals computed from one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleStats {
    pub mean: f64,
    /// Percent change between the last two samples. Serialized as
    /// `"inf"` when the previous sample was zero.
    #[serde(serialize_with = "serialize_rate")]
    pub rate: Option<f64>,
    pub regression: Option<Regression>,
    pub stddev: Option<f64>,
}

fn serialize_rate<S: Serializer>(rate: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match rate {
        Some(r) if r.is_infinite() => {
            serializer.serialize_str(if r.is_sign_positive() { "inf" } else { "-inf" })
        }
        Some(r) => serializer.serialize_some(r),
        None => serializer.serialize_none(),
    }
}

/// How the degree-1 least-squares fit is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressionBackend {
    /// Fit on mean-centred data. Avoids the cancellation the raw
    /// normal equations suffer on long windows with large values.
    PolyFit,
    /// `a = (Σxy·N − Σx·Σy) / (Σx²·N − (Σx)²)`, `b = (Σy − a·Σx) / N`.
    NormalEquations,
}

impl RegressionBackend {
    /// Best backend compiled into this build.
    pub fn detect() -> Self {
        if cfg!(feature = "polyfit") {
            RegressionBackend::PolyFit
        } else {
            RegressionBackend::NormalEquations
        }
    }

    /// Fit `samples` against their indexes. `None` below two samples.
    pub fn fit(&self, samples: &[f64]) -> Option<Regression> {
        if samples.len() < 2 {
            return None;
        }
        match self {
            RegressionBackend::PolyFit => centred_fit(samples),
            RegressionBackend::NormalEquations => normal_equations_fit(samples),
        }
    }
}

fn centred_fit(samples: &[f64]) -> Option<Regression> {
    let n = samples.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = samples.iter().sum::<f64>() / n;

    let (sxy, sxx) = samples
        .iter()
        .enumerate()
        .fold((0.0_f64, 0.0_f64), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });

    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(Regression {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}

fn normal_equations_fit(samples: &[f64]) -> Option<Regression> {
    let n = samples.len() as f64;
    let (sum_x, sum_y, sum_xx, sum_xy) = samples.iter().enumerate().fold(
        (0.0_f64, 0.0_f64, 0.0_f64, 0.0_f64),
        |(sx, sy, sxx, sxy), (i, y)| {
            let x = i as f64;
            (sx + x, sy + y, sxx + x * x, sxy + x * y)
        },
    );

    let denominator = sum_xx * n - sum_x * sum_x;
    if denominator == 0.0 {
        return None;
    }
    let slope = (sum_xy * n - sum_x * sum_y) / denominator;
    Some(Regression {
        slope,
        intercept: (sum_y - slope * sum_x) / n,
    })
}

/// Arithmetic mean, `None` for an empty window.
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// `100 * last / previous - 100` over the last two samples.
///
/// A zero previous sample gives `+inf`. `None` below two samples.
pub fn instant_rate(samples: &[f64]) -> Option<f64> {
    let [.., previous, last] = samples else {
        return None;
    };
    if *previous == 0.0 {
        return Some(f64::INFINITY);
    }
    Some(100.0 * last / previous - 100.0)
}

/// Least-squares trend of the samples with the detected backend.
pub fn linear_regression(samples: &[f64]) -> Option<Regression> {
    RegressionBackend::detect().fit(samples)
}

/// `sqrt(Σ(x − mean)² / N)`, `None` for an empty window.
pub fn population_stddev(samples: &[f64], mean: f64) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let variance =
        samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / samples.len() as f64;
    Some(variance.sqrt())
}

/// All trend signals for a window, with the detected backend.
pub fn get_stats(samples: &[f64]) -> Option<SampleStats> {
    get_stats_with(RegressionBackend::detect(), samples)
}

/// All trend signals for a window.
///
/// The mean is always present for a non-empty window; rate, regression
/// and deviation need at least two samples.
pub fn get_stats_with(backend: RegressionBackend, samples: &[f64]) -> Option<SampleStats> {
    let avg = mean(samples)?;
    if samples.len() < 2 {
        return Some(SampleStats {
            mean: avg,
            rate: None,
            regression: None,
            stddev: None,
        });
    }
    Some(SampleStats {
        mean: avg,
        rate: instant_rate(samples),
        regression: backend.fit(samples),
        stddev: population_stddev(samples, avg),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn single_sample_only_has_a_mean() {
        let stats = get_stats(&[10.0]).unwrap();
        assert_eq!(
            stats,
            SampleStats {
                mean: 10.0,
                rate: None,
                regression: None,
                stddev: None,
            }
        );
    }

    #[test]
    fn two_samples_give_every_signal() {
        let stats = get_stats(&[10.0, 20.0]).unwrap();
        assert_eq!(stats.mean, 15.0);
        assert_eq!(stats.rate, Some(100.0));
        let reg = stats.regression.unwrap();
        assert!(close(reg.slope, 10.0));
        assert!(close(reg.intercept, 10.0));
        assert_eq!(stats.stddev, Some(5.0));
    }

    #[test]
    fn empty_window_has_no_stats() {
        assert_eq!(get_stats(&[]), None);
        assert_eq!(mean(&[]), None);
        assert_eq!(population_stddev(&[], 0.0), None);
    }

    #[test]
    fn rate_from_zero_is_infinite() {
        assert_eq!(instant_rate(&[5.0, 0.0, 3.0]), Some(f64::INFINITY));
        assert_eq!(instant_rate(&[0.0, 0.0]), Some(f64::INFINITY));
        assert_eq!(instant_rate(&[3.0]), None);
    }

    #[test]
    fn rate_uses_the_last_two_samples() {
        assert_eq!(instant_rate(&[1.0, 40.0, 30.0]), Some(-25.0));
        assert_eq!(instant_rate(&[50.0, 50.0]), Some(0.0));
    }

    #[test]
    fn stddev_of_one_sample_is_zero() {
        assert_eq!(population_stddev(&[42.0], 42.0), Some(0.0));
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(population_stddev(&samples, 5.0), Some(2.0));
    }

    #[test]
    fn regression_needs_two_samples() {
        for backend in [RegressionBackend::PolyFit, RegressionBackend::NormalEquations] {
            assert_eq!(backend.fit(&[]), None);
            assert_eq!(backend.fit(&[3.0]), None);
        }
    }

    #[test]
    fn flat_series_has_zero_slope() {
        let reg = linear_regression(&[7.0, 7.0, 7.0, 7.0]).unwrap();
        assert!(close(reg.slope, 0.0));
        assert!(close(reg.intercept, 7.0));
    }

    #[test]
    fn backends_agree_on_noisy_series() {
        let samples = [12.0, 15.5, 11.0, 19.25, 22.0, 20.5, 27.0, 26.75, 31.0];
        let a = RegressionBackend::PolyFit.fit(&samples).unwrap();
        let b = RegressionBackend::NormalEquations.fit(&samples).unwrap();
        assert!(close(a.slope, b.slope), "{} vs {}", a.slope, b.slope);
        assert!(close(a.intercept, b.intercept), "{} vs {}", a.intercept, b.intercept);
    }

    #[test]
    fn exact_line_is_recovered() {
        let samples: Vec<f64> = (0..20).map(|i| 3.5 * i as f64 - 4.0).collect();
        for backend in [RegressionBackend::PolyFit, RegressionBackend::NormalEquations] {
            let reg = backend.fit(&samples).unwrap();
            assert!(close(reg.slope, 3.5));
            assert!(close(reg.intercept, -4.0));
        }
    }

    #[test]
    fn detected_backend_follows_features() {
        let expected = if cfg!(feature = "polyfit") {
            RegressionBackend::PolyFit
        } else {
            RegressionBackend::NormalEquations
        };
        assert_eq!(RegressionBackend::detect(), expected);
    }

    #[test]
    fn unbounded_rate_serializes_apart_from_missing_rate() {
        let unbounded = serde_json::to_value(get_stats(&[0.0, 10.0]).unwrap()).unwrap();
        let missing = serde_json::to_value(get_stats(&[10.0]).unwrap()).unwrap();

        assert_eq!(unbounded["rate"], "inf");
        assert!(missing["rate"].is_null());
        assert_ne!(unbounded["rate"], missing["rate"]);
        assert_eq!(unbounded["mean"], 5.0);

        let finite = serde_json::to_value(get_stats(&[10.0, 20.0]).unwrap()).unwrap();
        assert_eq!(finite["rate"], 100.0);
    }
}
