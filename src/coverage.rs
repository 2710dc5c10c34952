//! Image-size summaries for a random map (how much of the codomain gets hit).
//!
//! These connect the preimage-count distribution to the classical occupancy picture:
//! throwing `n` balls into `r` bins, the expected fraction of non-empty bins is
//! \(1 - ((r-1)/r)^n\), which is \(1 - p(0)\).

use core::f64::consts::LN_2;

use num_traits::{One, ToPrimitive, Zero};

use crate::binomial::{ln_base_term, Distribution};
use crate::{ln_big, Params, PreimageError, Result};

/// Expected fraction of codomain elements with at least one preimage (closed form).
///
/// \[
/// \mathbb{E}\left[\frac{|f(T)|}{r}\right] = 1 - \left(1 - \frac1r\right)^n.
/// \]
///
/// # Examples
///
/// ```
/// use preimages::{coverage::expected_image_fraction, Params};
///
/// let p = Params::from_u64(10, 10).unwrap();
/// assert!((expected_image_fraction(&p) - (1.0 - 0.9f64.powi(10))).abs() < 1e-12);
/// ```
#[must_use]
pub fn expected_image_fraction(params: &Params) -> f64 {
    if params.r().is_one() {
        return 1.0;
    }
    -ln_base_term(params.n(), params.r()).exp_m1()
}

/// The same fraction read off a generated distribution: \(1 - p(0)\).
///
/// # Errors
///
/// Returns [`PreimageError::EmptyDistribution`] for a series with no terms.
pub fn image_fraction(dist: &Distribution) -> Result<f64> {
    match dist {
        Distribution::Series(ps) => {
            let p0 = ps.first().ok_or(PreimageError::EmptyDistribution)?;
            Ok((1.0 - p0).clamp(0.0, 1.0))
        }
        Distribution::PointMass(c) => Ok(if c.is_zero() { 0.0 } else { 1.0 }),
    }
}

/// Mean preimage count \(\sum_k k\,p(k)\). Should match `n / r` up to the truncated tail.
///
/// # Errors
///
/// Returns [`PreimageError::EmptyDistribution`] for a series with no terms.
pub fn mean_preimage_count(dist: &Distribution) -> Result<f64> {
    match dist {
        Distribution::Series(ps) => {
            if ps.is_empty() {
                return Err(PreimageError::EmptyDistribution);
            }
            Ok(ps.iter().enumerate().map(|(k, &p)| (k as f64) * p).sum())
        }
        Distribution::PointMass(c) => Ok(c.to_f64().unwrap_or(f64::INFINITY)),
    }
}

/// \(\log_2\) of the expected image size, \(\log_2(r \cdot (1 - p(0)))\) (bits).
///
/// Output entropy can never exceed the log of the number of outputs actually hit, so this bounds
/// [`crate::entropy_estimate_bits`] from above, and tighter than \(\log_2 r\).
///
/// # Errors
///
/// See [`image_fraction`].
pub fn entropy_upper_bound_bits(dist: &Distribution, params: &Params) -> Result<f64> {
    let frac = image_fraction(dist)?;
    Ok((ln_big(params.r()) + frac.ln()) / LN_2)
}
