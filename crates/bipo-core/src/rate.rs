use crate::common::constants::SECONDS_PER_DAY;
use crate::units::Measurement;
use serde::Serialize;

/// Coincidence rate in events per second with its Poisson uncertainty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateEstimate {
    pub count: usize,
    pub live_time_seconds: f64,
    pub rate: f64,
    pub uncertainty: f64,
}

impl RateEstimate {
    pub fn as_measurement(&self) -> Measurement {
        Measurement::new(self.rate, self.uncertainty)
    }

    /// Counts per day.
    pub fn per_day(&self) -> Measurement {
        self.as_measurement()
            .map(|per_second| per_second * SECONDS_PER_DAY)
    }
}

/// `count / T` with `sqrt(count) / T` as the one-sigma error. A live time
/// that is zero, negative or not finite yields `(0, 0)`.
pub fn estimate_rate(count: usize, live_time_seconds: f64) -> RateEstimate {
    let (rate, uncertainty) = if live_time_seconds.is_finite() && live_time_seconds > 0.0 {
        let count = count as f64;
        (count / live_time_seconds, count.sqrt() / live_time_seconds)
    } else {
        (0.0, 0.0)
    };

    RateEstimate {
        count,
        live_time_seconds,
        rate,
        uncertainty,
    }
}

#[cfg(test)]
mod tests {
    use super::estimate_rate;

    #[test]
    fn rate_is_count_over_live_time_with_poisson_error() {
        let estimate = estimate_rate(3, 10.0);
        assert!((estimate.rate - 0.3).abs() < 1.0e-15);
        assert!((estimate.uncertainty - 0.173_205_080_756_887_7).abs() < 1.0e-15);
        assert_eq!(estimate.count, 3);
    }

    #[test]
    fn zero_count_gives_zero_rate() {
        for live_time in [1.0e-9, 1.0, 86_400.0] {
            let estimate = estimate_rate(0, live_time);
            assert_eq!((estimate.rate, estimate.uncertainty), (0.0, 0.0));
        }
    }

    #[test]
    fn non_positive_live_time_never_divides() {
        for live_time in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let estimate = estimate_rate(42, live_time);
            assert_eq!((estimate.rate, estimate.uncertainty), (0.0, 0.0));
        }
    }

    #[test]
    fn per_day_scales_both_components() {
        let per_day = estimate_rate(4, 86_400.0).per_day();
        assert!((per_day.value - 4.0).abs() < 1.0e-12);
        assert!((per_day.uncertainty - 2.0).abs() < 1.0e-12);
    }
}
