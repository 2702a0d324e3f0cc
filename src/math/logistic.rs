//! Logistic link helpers.
//!
//! Numerical notes:
//! - `exp` overflows for arguments beyond ~709, so the linear predictor is
//!   clamped to `±ETA_LIMIT` before it reaches the sigmoid.
//! - Probabilities are kept away from exact 0/1 (`PROB_EPS`) wherever a log or
//!   a division by `μ(1-μ)` follows.

/// Clamp applied to the linear predictor before exponentiation.
pub const ETA_LIMIT: f64 = 700.0;

/// Distance kept between fitted probabilities and exact 0/1.
pub const PROB_EPS: f64 = 1e-8;

/// Logistic sigmoid `1 / (1 + exp(-η))`.
pub fn sigmoid(eta: f64) -> f64 {
    let eta = eta.clamp(-ETA_LIMIT, ETA_LIMIT);
    if eta >= 0.0 {
        1.0 / (1.0 + (-eta).exp())
    } else {
        let e = eta.exp();
        e / (1.0 + e)
    }
}

/// Log-odds `ln(p / (1 - p))`, with `p` clamped into `[PROB_EPS, 1 - PROB_EPS]`.
pub fn logit(p: f64) -> f64 {
    let p = clamp_probability(p);
    (p / (1.0 - p)).ln()
}

/// Keep a probability away from exact 0/1.
pub fn clamp_probability(p: f64) -> f64 {
    p.clamp(PROB_EPS, 1.0 - PROB_EPS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sigmoid_is_centered_and_symmetric() {
        assert_relative_eq!(sigmoid(0.0), 0.5);
        for &x in &[0.1, 1.0, 3.5, 20.0] {
            assert_relative_eq!(sigmoid(x) + sigmoid(-x), 1.0, epsilon = 1e-15);
        }
    }

    #[test]
    fn logit_inverts_sigmoid() {
        for &x in &[-6.0, -1.25, 0.0, 0.48, 4.0] {
            assert_relative_eq!(logit(sigmoid(x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn extremes_stay_finite() {
        assert!(sigmoid(1e6).is_finite());
        assert!(sigmoid(-1e6).is_finite());
        assert!(logit(0.0).is_finite());
        assert!(logit(1.0).is_finite());
    }
}
