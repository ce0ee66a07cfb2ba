//! Error and dispersion statistics shared by the validators.

/// Mean absolute error over paired values; `None` when empty or mismatched.
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let total: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum();
    Some(total / actual.len() as f64)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Simple returns `c[i] / c[i-1] - 1`, skipping non-positive bases.
pub fn simple_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| w[1] / w[0] - 1.0)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn mae_basic() {
        let mae = mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]).unwrap();
        // (1 + 0 + 2) / 3
        assert_abs_diff_eq!(mae, 1.0);
    }

    #[test]
    fn mae_empty_or_mismatched() {
        assert!(mean_absolute_error(&[], &[]).is_none());
        assert!(mean_absolute_error(&[1.0], &[1.0, 2.0]).is_none());
    }

    #[test]
    fn std_dev_population() {
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_abs_diff_eq!(sd, 2.0);
    }

    #[test]
    fn returns_skip_zero_base() {
        let r = simple_returns(&[0.0, 10.0, 11.0]);
        assert_eq!(r.len(), 1);
        assert_abs_diff_eq!(r[0], 0.1, epsilon = 1e-12);
    }
}
