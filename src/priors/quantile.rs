//! Quantile matching for normal distributions.
//!
//! Given two points of a cumulative distribution, `P(X ≤ x1) = p1` and `P(X ≤ x2) = p2`,
//! there is exactly one normal distribution passing through both. Log-normal priors are
//! matched the same way after taking the logarithm of both points.

use statrs::distribution::{ContinuousCDF, Normal};

use super::error::PriorError;

/// Finds the normal distribution with the given two quantiles.
///
/// # Arguments
///
/// * `x1`, `p1` - The lower point and its cumulative probability
/// * `x2`, `p2` - The upper point and its cumulative probability
///
/// # Returns
///
/// Returns `(mu, sigma)`, or [`PriorError::InvalidQuantiles`] unless
/// `0 < p1 < p2 < 1` and `x1 < x2`.
pub fn quantile_match(x1: f64, p1: f64, x2: f64, p2: f64) -> Result<(f64, f64), PriorError> {
    let invalid = PriorError::InvalidQuantiles { x1, p1, x2, p2 };

    let ordered = 0.0 < p1 && p1 < p2 && p2 < 1.0 && x1 < x2;
    if !ordered || !x1.is_finite() || !x2.is_finite() {
        return Err(invalid);
    }

    let standard = Normal::new(0.0, 1.0).map_err(|_| invalid.clone())?;
    let z1 = standard.inverse_cdf(p1);
    let z2 = standard.inverse_cdf(p2);

    let sigma = (x2 - x1) / (z2 - z1);
    let mu = x1 - sigma * z1;

    Ok((mu, sigma))
}

/// Finds the log-normal distribution with the given two quantiles.
///
/// Both points must be strictly positive. The result is `(mu, sigma)` of the underlying
/// normal distribution.
pub fn lognormal_quantile_match(
    x1: f64,
    p1: f64,
    x2: f64,
    p2: f64,
) -> Result<(f64, f64), PriorError> {
    if x1 <= 0.0 || x2 <= 0.0 {
        return Err(PriorError::InvalidQuantiles { x1, p1, x2, p2 });
    }
    quantile_match(x1.ln(), p1, x2.ln(), p2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lognormal_percentiles() {
        let (mu, sigma) = lognormal_quantile_match(0.4, 0.01, 6.8, 0.99).unwrap();
        assert_relative_eq!(mu, 0.500, epsilon = 1e-3);
        assert_relative_eq!(sigma, 0.609, epsilon = 1e-3);
    }

    #[test]
    fn test_normal_general_quantiles() {
        let (mu, sigma) = quantile_match(-3.0, 0.1, 2.0, 0.6).unwrap();
        assert_relative_eq!(mu, 1.175, epsilon = 1e-3);
        assert_relative_eq!(sigma, 3.258, epsilon = 1e-3);
    }

    #[test]
    fn test_matched_distribution_reproduces_quantiles() {
        let (mu, sigma) = quantile_match(1.0, 0.05, 4.0, 0.95).unwrap();
        let normal = Normal::new(mu, sigma).unwrap();
        assert_relative_eq!(normal.cdf(1.0), 0.05, epsilon = 1e-9);
        assert_relative_eq!(normal.cdf(4.0), 0.95, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_quantiles() {
        assert!(quantile_match(2.0, 0.01, 1.0, 0.99).is_err());
        assert!(quantile_match(1.0, 0.99, 2.0, 0.01).is_err());
        assert!(quantile_match(1.0, 0.0, 2.0, 0.99).is_err());
        assert!(lognormal_quantile_match(-1.0, 0.01, 2.0, 0.99).is_err());
    }
}
