//! Sliding-window supervised samples over closing prices.
//!
//! Sample i: input = closes[i+1-w ..= i], target = closes[i+1].

use crate::domain::error::ForecastError;
use crate::domain::price_series::PriceSeries;

pub const MIN_WINDOW: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Minimum number of closes a window of size `window` needs.
pub fn required_len(window: usize) -> usize {
    window + 1
}

pub fn prepare(symbol: &str, closes: &[f64], window: usize) -> Result<Vec<Sample>, ForecastError> {
    if window < MIN_WINDOW || closes.len() < required_len(window) {
        return Err(ForecastError::InsufficientData {
            symbol: symbol.to_string(),
            have: closes.len(),
            need: required_len(window.max(MIN_WINDOW)),
        });
    }

    Ok(closes
        .windows(window + 1)
        .map(|w| Sample {
            input: w[..window].to_vec(),
            target: w[window],
        })
        .collect())
}

pub fn prepare_series(series: &PriceSeries, window: usize) -> Result<Vec<Sample>, ForecastError> {
    prepare(series.symbol(), &series.closes(), window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn builds_ordered_samples() {
        let closes = [1.0, 2.0, 3.0, 4.0, 5.0];
        let samples = prepare("X", &closes, 3).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].input, vec![1.0, 2.0, 3.0]);
        assert_eq!(samples[0].target, 4.0);
        assert_eq!(samples[1].input, vec![2.0, 3.0, 4.0]);
        assert_eq!(samples[1].target, 5.0);
    }

    #[test]
    fn window_of_len_minus_one_gives_one_sample() {
        let closes = [1.0, 2.0, 3.0];
        let samples = prepare("X", &closes, 2).unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn window_below_minimum_fails() {
        let closes = [1.0, 2.0, 3.0, 4.0];
        assert!(matches!(
            prepare("X", &closes, 1),
            Err(ForecastError::InsufficientData { .. })
        ));
        assert!(matches!(
            prepare("X", &closes, 0),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn error_reports_symbol_and_counts() {
        match prepare("MSFT", &[1.0, 2.0], 5) {
            Err(ForecastError::InsufficientData { symbol, have, need }) => {
                assert_eq!(symbol, "MSFT");
                assert_eq!(have, 2);
                assert_eq!(need, 6);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    proptest! {
        #[test]
        fn short_series_always_fails(len in 0usize..40, extra in 0usize..10) {
            let window = len + extra;
            let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            prop_assert!(
                matches!(
                    prepare("X", &closes, window),
                    Err(ForecastError::InsufficientData { .. })
                ),
                "expected InsufficientData error"
            );
        }

        #[test]
        fn sample_count_matches_len(len in 3usize..80, window in 2usize..20) {
            prop_assume!(window < len);
            let closes: Vec<f64> = (0..len).map(|i| i as f64).collect();
            let samples = prepare("X", &closes, window).unwrap();
            prop_assert_eq!(samples.len(), len - window);
            for s in &samples {
                prop_assert_eq!(s.input.len(), window);
            }
        }
    }
}
