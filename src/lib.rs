//! `preimages`: preimage-count distributions and output entropy of random maps.
//!
//! This crate is for the "hash-to-scalar" question: given a map \(f : T \to S\) with
//! \(|T| = n\) (say \(2^{256}\)) onto a prime-order group with \(|S| = r\), how much Shannon
//! entropy does \(f(T)\) lose relative to the ideal \(\log_2 r\) if \(f\) behaves like a
//! uniformly random function?
//!
//! Design intent:
//! - Generate the preimage-count distribution \(p(k) = \Pr[|f^{-1}(x)| = k]\) term by term with a
//!   stable truncated series (see [`binomial`]), never the full binomial distribution.
//! - Fold it into an expected-entropy estimate in closed form (see [`entropy`]).
//! - Keep reporting and plotting outside the numeric core (see [`report`] and `demos/`).
//!
//! ## Numerics
//!
//! `n` and `r` are arbitrary-precision integers. The ratio between consecutive terms is kept as
//! an exact rational and only folded into `f64` when a term is emitted, so relative error does
//! not compound across the recurrence even when `n` has hundreds of bits.
//!
//! ## Quick example
//!
//! ```rust
//! use preimages::{entropy_estimate_bits, preimage_distribution, Params};
//!
//! let params = Params::from_u64(1000, 10).unwrap();
//! let dist = preimage_distribution(&params).unwrap();
//!
//! let h = entropy_estimate_bits(&dist, &params).unwrap();
//! assert!(h <= params.ideal_entropy_bits() + 1e-9);
//! assert!((params.expected_peak_frequency() - 100.0).abs() < 1e-9);
//! assert!((dist.total_mass() - 1.0).abs() < 1e-4);
//! ```

#![forbid(unsafe_code)]

use core::f64::consts::LN_2;

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};
use thiserror::Error;

pub mod binomial;
pub mod coverage;
pub mod entropy;
pub mod report;

pub use binomial::{
    preimage_distribution, preimage_distribution_with, Binomials, Distribution, FrequencyTerm,
    GeneratorConfig, TruncationPolicy, UnderflowPolicy,
};
pub use entropy::{
    entropy_estimate_bits, entropy_estimate_nats, shannon_entropy_bits, EntropySummary,
};
pub use report::CollisionReport;

/// Errors for distribution generation and entropy estimation.
#[derive(Debug, Error)]
pub enum PreimageError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    #[error("numeric instability: {0}")]
    NumericInstability(&'static str),

    #[error("empty distribution")]
    EmptyDistribution,
}

pub type Result<T> = core::result::Result<T, PreimageError>;

/// Order of the prime-order Jubjub subgroup (decimal).
///
/// Sapling's `ToScalar` maps 256-bit strings onto this group, which is the reference case for
/// [`Params::sapling_to_scalar`].
pub const JUBJUB_ORDER: &str =
    "6554484396890773809930967563523245729705921265872317281365359162392183254199";

/// Bit length of the Sapling `ToScalar` input space.
pub const SAPLING_INPUT_BITS: u32 = 256;

/// Parameters of a random map \(f : T \to S\): domain size `n` and codomain size `r`.
///
/// Construction enforces \(1 \le r \le n\); a `Params` value is always valid input for the
/// generator and the estimator.
///
/// # Examples
///
/// ```
/// use preimages::Params;
///
/// let p = Params::from_u64(1000, 10).unwrap();
/// assert!((p.expected_peak_frequency() - 100.0).abs() < 1e-12);
/// assert!((p.ideal_entropy_bits() - 10f64.log2()).abs() < 1e-12);
///
/// assert!(Params::from_u64(0, 1).is_err());
/// assert!(Params::from_u64(5, 0).is_err());
/// assert!(Params::from_u64(5, 6).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Params {
    n: BigUint,
    r: BigUint,
}

impl Params {
    /// Validate and wrap a domain size `n` and codomain size `r`.
    ///
    /// # Errors
    ///
    /// Returns [`PreimageError::InvalidParameter`] if `n == 0`, `r == 0`, or `r > n`.
    pub fn new(n: BigUint, r: BigUint) -> Result<Self> {
        if n.is_zero() {
            return Err(PreimageError::InvalidParameter("n must be >= 1"));
        }
        if r.is_zero() {
            return Err(PreimageError::InvalidParameter("r must be >= 1"));
        }
        if r > n {
            return Err(PreimageError::InvalidParameter("r must be <= n"));
        }
        Ok(Self { n, r })
    }

    /// Convenience constructor for machine-sized parameters.
    pub fn from_u64(n: u64, r: u64) -> Result<Self> {
        Self::new(BigUint::from(n), BigUint::from(r))
    }

    /// The reference case: \(n = 2^{256}\), \(r\) = [`JUBJUB_ORDER`].
    pub fn sapling_to_scalar() -> Result<Self> {
        let r = BigUint::parse_bytes(JUBJUB_ORDER.as_bytes(), 10)
            .ok_or(PreimageError::InvalidParameter("malformed Jubjub order"))?;
        Self::new(BigUint::one() << SAPLING_INPUT_BITS, r)
    }

    /// Domain size.
    #[must_use]
    pub fn n(&self) -> &BigUint {
        &self.n
    }

    /// Codomain size.
    #[must_use]
    pub fn r(&self) -> &BigUint {
        &self.r
    }

    /// Expected number of preimages per codomain element, \(n / r\).
    ///
    /// This is where the preimage-count distribution peaks.
    #[must_use]
    pub fn expected_peak_frequency(&self) -> f64 {
        ratio_f64(&self.n, &self.r)
    }

    /// Entropy of a uniform distribution on the codomain, \(\ln r\) (nats).
    #[must_use]
    pub fn ideal_entropy_nats(&self) -> f64 {
        ln_big(&self.r)
    }

    /// Entropy of a uniform distribution on the codomain, \(\log_2 r\) (bits).
    #[must_use]
    pub fn ideal_entropy_bits(&self) -> f64 {
        self.ideal_entropy_nats() / LN_2
    }
}

/// Significant bits kept when a big integer is folded into an `f64`.
const TOP_BITS: u64 = 64;

/// Largest binary exponent handed to [`ldexp`]; anything beyond saturates to `0` or `inf`.
const MAX_EXP2: i64 = 2000;

/// Split `x` into `(top, shift)` with `x ~ top * 2^shift` and `top < 2^64`.
fn split_big(x: &BigUint) -> (f64, i64) {
    let shift = x.bits().saturating_sub(TOP_BITS);
    let top = (x >> shift).to_f64().unwrap_or(f64::INFINITY);
    (top, shift as i64)
}

/// `numer / denom` as `(mantissa, exp2)`, valid for operands of any size.
pub(crate) fn ratio_parts(numer: &BigUint, denom: &BigUint) -> (f64, i64) {
    let (a, ea) = split_big(numer);
    let (b, eb) = split_big(denom);
    (a / b, ea - eb)
}

/// `m * 2^e`, split in two steps so neither factor overflows on its own.
pub(crate) fn ldexp(m: f64, e: i64) -> f64 {
    let e = e.clamp(-MAX_EXP2, MAX_EXP2) as i32;
    let half = e / 2;
    m * 2f64.powi(half) * 2f64.powi(e - half)
}

/// `numer / denom` rounded to `f64`.
pub(crate) fn ratio_f64(numer: &BigUint, denom: &BigUint) -> f64 {
    let (m, e) = ratio_parts(numer, denom);
    ldexp(m, e)
}

/// Natural log of `numer / denom`, finite whenever both are non-zero.
pub(crate) fn ln_ratio(numer: &BigUint, denom: &BigUint) -> f64 {
    let (m, e) = ratio_parts(numer, denom);
    m.ln() + (e as f64) * LN_2
}

/// Natural log of a big integer (`-inf` for zero).
pub(crate) fn ln_big(x: &BigUint) -> f64 {
    let (top, shift) = split_big(x);
    top.ln() + (shift as f64) * LN_2
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn params_reject_invalid() {
        for (n, r) in [(0u64, 0u64), (0, 1), (10, 0), (10, 11)] {
            let err = Params::from_u64(n, r).unwrap_err();
            assert!(
                matches!(err, PreimageError::InvalidParameter(_)),
                "(n={n}, r={r}) gave {err:?}"
            );
        }
        assert!(Params::from_u64(1, 1).is_ok());
        assert!(Params::from_u64(10, 10).is_ok());
    }

    #[test]
    fn sapling_reference_parameters() {
        let p = Params::sapling_to_scalar().unwrap();
        assert_eq!(p.n().bits(), 257);
        assert_eq!(p.r().bits(), 252);
        // 2^256 / r ~ 17.67.
        let peak = p.expected_peak_frequency();
        assert!((peak - 17.666).abs() < 1e-2, "peak={peak}");
        let ideal = p.ideal_entropy_bits();
        assert!(ideal > 251.8 && ideal < 251.9, "ideal={ideal}");
    }

    #[test]
    fn big_ratio_helpers_match_small_values() {
        let a = BigUint::from(3u32);
        let b = BigUint::from(8u32);
        assert!((ratio_f64(&a, &b) - 0.375).abs() < 1e-15);
        assert!((ln_ratio(&a, &b) - 0.375f64.ln()).abs() < 1e-14);
        assert!((ln_big(&b) - 8f64.ln()).abs() < 1e-14);
        assert_eq!(ln_big(&BigUint::zero()), f64::NEG_INFINITY);
    }

    #[test]
    fn big_ratio_helpers_survive_huge_operands() {
        // Neither operand fits in an f64, but the ratio does.
        let big = BigUint::one() << 3000u32;
        let bigger = &big * 5u32;
        assert!((ratio_f64(&bigger, &big) - 5.0).abs() < 1e-12);
        assert!((ln_ratio(&big, &bigger) + 5f64.ln()).abs() < 1e-12);
        assert!((ln_big(&big) - 3000.0 * LN_2).abs() < 1e-9);
        // Out-of-range results saturate instead of producing NaN.
        assert_eq!(ratio_f64(&big, &BigUint::one()), f64::INFINITY);
        assert_eq!(ratio_f64(&BigUint::one(), &big), 0.0);
    }

    // ---- Cross-module properties ----

    proptest! {
        #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]

        #[test]
        fn series_is_contiguous_and_normalized(r in 2u64..400, mult in 1u64..40) {
            let params = Params::from_u64(r * mult, r).unwrap();
            let terms: Vec<FrequencyTerm> = Binomials::new(&params).unwrap().collect();
            prop_assert!(!terms.is_empty());
            for (i, t) in terms.iter().enumerate() {
                prop_assert_eq!(t.k, i);
                prop_assert!((0.0..=1.0 + 1e-12).contains(&t.p));
            }
            let mass: f64 = terms.iter().map(|t| t.p).sum();
            prop_assert!((mass - 1.0).abs() < 1e-4, "mass={}", mass);
        }

        #[test]
        fn estimate_never_exceeds_ideal(r in 2u64..400, mult in 1u64..40) {
            let params = Params::from_u64(r * mult, r).unwrap();
            let dist = preimage_distribution(&params).unwrap();
            let h = entropy_estimate_bits(&dist, &params).unwrap();
            prop_assert!(h.is_finite());
            prop_assert!(h >= 0.0);
            prop_assert!(h <= params.ideal_entropy_bits() + 1e-6);

            // Jensen: the estimate is also bounded by the log of the expected image size.
            let bound = coverage::entropy_upper_bound_bits(&dist, &params).unwrap();
            prop_assert!(h <= bound + 1e-6, "h={} bound={}", h, bound);
        }

        #[test]
        fn mean_preimage_count_matches_peak(r in 2u64..400, mult in 1u64..40) {
            let params = Params::from_u64(r * mult, r).unwrap();
            let dist = preimage_distribution(&params).unwrap();
            let mean = coverage::mean_preimage_count(&dist).unwrap();
            let peak = params.expected_peak_frequency();
            prop_assert!((mean - peak).abs() < 1e-4 * peak.max(1.0), "mean={} peak={}", mean, peak);
        }
    }

    #[test]
    fn invalid_inputs_fail_before_generation() {
        let zero = BigUint::zero();
        let ten = BigUint::from(10u32);
        let dist = Distribution::Series(vec![1.0]);
        for (n, r) in [(&zero, &ten), (&ten, &zero), (&ten, &(&ten + 1u32))] {
            assert!(matches!(
                shannon_entropy_bits(&dist, n, r),
                Err(PreimageError::InvalidParameter(_))
            ));
        }
    }
}
