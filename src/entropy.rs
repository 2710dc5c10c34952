//! Expected Shannon entropy of \(f(T)\) under the random-function model.
//!
//! For \(x \in S\) let \(M(k) = \{x : |f^{-1}(x)| = k\}\). Taking the preimage counts to follow
//! the generated distribution exactly, \(|M(k)| \approx r \cdot p(k)\), and each \(x \in M(k)\) is
//! hit with probability \(k/n\). So
//!
//! \[
//! H(f(T)) \approx \sum_k r\,p(k) \cdot \frac{k}{n} \cdot \left(-\log_2 \frac{k}{n}\right)
//!        = \frac{r}{n} \sum_{k \ge 1} p(k)\, k \log_2 \frac{n}{k}.
//! \]
//!
//! Note that \(p(k)\) is the chance that a random *output* has \(k\) preimages, not the chance that
//! a random *input* lands on an output with \(k\) preimages: \(p(0)\) can be large even though no
//! input maps to an element without preimages. The result is an expectation under the idealized
//! model; nothing is sampled, and the same distribution always gives the same number.

use core::f64::consts::LN_2;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::binomial::Distribution;
use crate::{ln_big, ratio_f64, Params, PreimageError, Result};

/// Estimated entropy of \(f(T)\) (nats).
///
/// # Errors
///
/// Returns [`PreimageError::EmptyDistribution`] for a series with no terms.
pub fn entropy_estimate_nats(dist: &Distribution, params: &Params) -> Result<f64> {
    let ln_n = ln_big(params.n());
    match dist {
        Distribution::Series(ps) => {
            if ps.is_empty() {
                return Err(PreimageError::EmptyDistribution);
            }
            let mut acc = 0.0;
            for (k, &p) in ps.iter().enumerate().skip(1) {
                if p == 0.0 {
                    continue;
                }
                let k = k as f64;
                acc += p * k * (ln_n - k.ln());
            }
            Ok(ratio_f64(params.r(), params.n()) * acc)
        }
        // One count `c` with probability 1; for r = 1 that is c = n and the entropy is zero.
        Distribution::PointMass(c) => {
            if c.is_zero() {
                return Ok(0.0);
            }
            Ok(ratio_f64(&(params.r() * c), params.n()) * (ln_n - ln_big(c)))
        }
    }
}

/// Estimated entropy of \(f(T)\) (bits).
///
/// # Examples
///
/// ```
/// use preimages::{entropy_estimate_bits, preimage_distribution, Params};
///
/// let params = Params::from_u64(1000, 10).unwrap();
/// let dist = preimage_distribution(&params).unwrap();
/// let h = entropy_estimate_bits(&dist, &params).unwrap();
///
/// // About 0.007 bits short of log2(10).
/// assert!((h - 10f64.log2()).abs() < 0.02);
/// ```
///
/// # Errors
///
/// See [`entropy_estimate_nats`].
pub fn entropy_estimate_bits(dist: &Distribution, params: &Params) -> Result<f64> {
    Ok(entropy_estimate_nats(dist, params)? / LN_2)
}

/// [`entropy_estimate_bits`] for raw `(n, r)`.
///
/// # Errors
///
/// [`PreimageError::InvalidParameter`] if `n == 0`, `r == 0`, or `r > n`; otherwise see
/// [`entropy_estimate_nats`].
pub fn shannon_entropy_bits(dist: &Distribution, n: &BigUint, r: &BigUint) -> Result<f64> {
    let params = Params::new(n.clone(), r.clone())?;
    entropy_estimate_bits(dist, &params)
}

/// Scalar summaries of one analysis run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntropySummary {
    /// Expected entropy of \(f(T)\) (bits).
    pub estimated_bits: f64,
    /// \(\log_2 r\).
    pub ideal_bits: f64,
    /// \(n / r\).
    pub expected_peak_frequency: f64,
}

impl EntropySummary {
    /// Summarize `dist` for `params`.
    ///
    /// # Errors
    ///
    /// See [`entropy_estimate_nats`].
    pub fn compute(dist: &Distribution, params: &Params) -> Result<Self> {
        Ok(Self {
            estimated_bits: entropy_estimate_bits(dist, params)?,
            ideal_bits: params.ideal_entropy_bits(),
            expected_peak_frequency: params.expected_peak_frequency(),
        })
    }

    /// Bits lost to collisions, `ideal_bits - estimated_bits`.
    #[must_use]
    pub fn entropy_loss_bits(&self) -> f64 {
        self.ideal_bits - self.estimated_bits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binomial::preimage_distribution;

    fn estimate(n: u64, r: u64) -> (f64, Params) {
        let params = Params::from_u64(n, r).unwrap();
        let dist = preimage_distribution(&params).unwrap();
        (entropy_estimate_bits(&dist, &params).unwrap(), params)
    }

    #[test]
    fn thousand_into_ten_is_near_ideal() {
        let (h, params) = estimate(1000, 10);
        let ideal = 10f64.log2();
        assert!((params.ideal_entropy_bits() - ideal).abs() < 1e-12);
        assert!(h < ideal);
        assert!((h - ideal).abs() / ideal < 0.02, "h={h}");
    }

    #[test]
    fn hundred_into_hundred() {
        // Poisson(1)-like counts: about E[k log2 k] ~ 0.83 bits are lost.
        let (h, params) = estimate(100, 100);
        let ideal = params.ideal_entropy_bits();
        assert!((ideal - 100f64.log2()).abs() < 1e-12);
        assert!(h < ideal);
        assert!(ideal - h < 1.0, "h={h}");
    }

    #[test]
    fn ratio_to_ideal_grows_with_equal_sizes() {
        let mut last = 0.0;
        for n in [100u64, 1_000, 10_000] {
            let (h, params) = estimate(n, n);
            let ideal = params.ideal_entropy_bits();
            let loss = ideal - h;
            assert!(loss > 0.7 && loss < 0.95, "n={n} loss={loss}");
            let ratio = h / ideal;
            assert!(ratio > last, "n={n} ratio={ratio} last={last}");
            last = ratio;
        }
    }

    #[test]
    fn loss_shrinks_as_peak_frequency_grows() {
        let mut last = f64::INFINITY;
        for r in [1000u64, 250, 100, 20] {
            let (h, params) = estimate(1000, r);
            let loss = params.ideal_entropy_bits() - h;
            assert!(loss < last, "r={r} loss={loss} last={last}");
            last = loss;
        }
    }

    #[test]
    fn single_output_has_zero_entropy() {
        let (h, _) = estimate(42, 1);
        assert_eq!(h, 0.0);
    }

    #[test]
    fn sapling_loses_a_few_hundredths_of_a_bit() {
        let params = Params::sapling_to_scalar().unwrap();
        let dist = preimage_distribution(&params).unwrap();
        let s = EntropySummary::compute(&dist, &params).unwrap();
        assert!((s.expected_peak_frequency - 17.666).abs() < 1e-2);
        let loss = s.entropy_loss_bits();
        // ~ 1 / (2 (n/r) ln 2)
        assert!(loss > 0.0 && loss < 0.1, "loss={loss}");
    }

    #[test]
    fn empty_series_is_an_error() {
        let params = Params::from_u64(10, 10).unwrap();
        let err = entropy_estimate_bits(&Distribution::Series(Vec::new()), &params).unwrap_err();
        assert!(matches!(err, PreimageError::EmptyDistribution));
    }

    #[test]
    fn raw_parameters_are_validated() {
        let dist = Distribution::Series(vec![0.5, 0.5]);
        let two = BigUint::from(2u32);
        assert!(shannon_entropy_bits(&dist, &two, &two).is_ok());
        assert!(matches!(
            shannon_entropy_bits(&dist, &BigUint::from(0u32), &two),
            Err(PreimageError::InvalidParameter(_))
        ));
        assert!(matches!(
            shannon_entropy_bits(&dist, &two, &BigUint::from(0u32)),
            Err(PreimageError::InvalidParameter(_))
        ));
    }

    #[test]
    fn bits_and_nats_agree() {
        let params = Params::from_u64(500, 37).unwrap();
        let dist = preimage_distribution(&params).unwrap();
        let h_nats = entropy_estimate_nats(&dist, &params).unwrap();
        let h_bits = entropy_estimate_bits(&dist, &params).unwrap();
        assert!((h_bits - h_nats / LN_2).abs() < 1e-12);
    }

    #[test]
    fn hand_built_series() {
        // n = r = 2: p = [1/4, 1/2, 1/4]. H = (2/2)(1/2 * 1 * 1 + 1/4 * 2 * 0) = 1/2 bit.
        let params = Params::from_u64(2, 2).unwrap();
        let dist = Distribution::Series(vec![0.25, 0.5, 0.25]);
        let h = entropy_estimate_bits(&dist, &params).unwrap();
        assert!((h - 0.5).abs() < 1e-12);
    }
}
