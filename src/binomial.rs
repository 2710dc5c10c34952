//! Preimage-count distribution of a uniformly random map.
//!
//! For \(f : T \to S\) uniform with \(|T| = n\), \(|S| = r\), and a fixed \(x \in S\), the number
//! of preimages \(|f^{-1}(x)|\) is \(\operatorname{Bin}(n, 1/r)\):
//!
//! \[
//! p(k) = \binom{n}{k} \frac{1}{r^k} \left(\frac{r-1}{r}\right)^{n-k}
//!      = \left(\frac{r-1}{r}\right)^n \cdot \frac{\binom{n}{k}}{(r-1)^k}.
//! \]
//!
//! The first factor is the base term \(p(0)\). It is evaluated as
//! \(\exp\bigl((n/r) \cdot r \ln(1 - 1/r)\bigr)\), where the second factor tends to \(-1\), so for
//! large \(r\) this is the familiar \(e^{-n/r}\). The second factor is accumulated as an exact
//! rational through
//!
//! \[
//! \frac{p(k)}{p(k-1)} = \frac{n + 1 - k}{k (r - 1)}
//! \]
//!
//! and multiplied into \(p(0)\) only when a term is emitted.
//!
//! The series is cut off by a patience rule (see [`TruncationPolicy`]): past
//! \(k_{\min} = \lfloor 3n / 2r \rfloor\), which sits well beyond the peak at \(n/r\), emission
//! stops once `patience` consecutive terms fall below `tail_threshold`.

use core::iter::FusedIterator;

use log::{debug, warn};
use num_bigint::BigUint;
use num_rational::Ratio;
use num_traits::{One, ToPrimitive, Zero};

use crate::{ldexp, ln_ratio, ratio_f64, ratio_parts, Params, PreimageError, Result};

/// Consecutive negligible terms required before the series is cut off.
pub const PATIENCE: u32 = 10;

/// A term below this probability counts as negligible.
pub const TAIL_THRESHOLD: f64 = 1e-7;

/// `min_k = floor(MIN_K_NUMER * n / (MIN_K_DENOM * r))`.
pub const MIN_K_NUMER: u32 = 3;
/// See [`MIN_K_NUMER`].
pub const MIN_K_DENOM: u32 = 2;

/// Default cap on `min_k`, and so on the number of emitted terms (up to `patience` more).
pub const MAX_TERMS: usize = 1 << 20;

/// Stopping rule for the truncated series.
///
/// These values are empirical, not derived from an error bound. The defaults leave a truncated
/// mass well under `1e-4` for `n/r` up to a few hundred.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncationPolicy {
    /// Consecutive terms below `tail_threshold` (past `min_k`) that end the series.
    pub patience: u32,
    /// Probability below which a term is negligible.
    pub tail_threshold: f64,
    /// Numerator of the `min_k` factor (applied to `n / r`).
    pub min_k_numer: u32,
    /// Denominator of the `min_k` factor.
    pub min_k_denom: u32,
    /// Refuse to expand the series when `min_k` exceeds this.
    pub max_terms: usize,
}

impl Default for TruncationPolicy {
    fn default() -> Self {
        Self {
            patience: PATIENCE,
            tail_threshold: TAIL_THRESHOLD,
            min_k_numer: MIN_K_NUMER,
            min_k_denom: MIN_K_DENOM,
            max_terms: MAX_TERMS,
        }
    }
}

impl TruncationPolicy {
    /// Index below which the series is never cut off: \(\lfloor a n / (b r) \rfloor\).
    #[must_use]
    pub fn min_k(&self, params: &Params) -> BigUint {
        let num = params.n() * self.min_k_numer;
        let den = params.r() * self.min_k_denom.max(1);
        num / den
    }

    fn validate(&self) -> Result<()> {
        if self.patience == 0 {
            return Err(PreimageError::InvalidParameter("patience must be >= 1"));
        }
        if self.min_k_denom == 0 {
            return Err(PreimageError::InvalidParameter("min_k_denom must be >= 1"));
        }
        if !(self.tail_threshold.is_finite() && self.tail_threshold > 0.0) {
            return Err(PreimageError::InvalidParameter(
                "tail_threshold must be finite and > 0",
            ));
        }
        Ok(())
    }
}

/// What to do when \(p(0)\) is not a normal `f64` (roughly \(n/r > 708\)).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnderflowPolicy {
    /// Evaluate every term in the log domain instead.
    #[default]
    Escalate,
    /// Report [`PreimageError::NumericInstability`].
    Fail,
}

/// Generator settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratorConfig {
    pub truncation: TruncationPolicy,
    pub underflow: UnderflowPolicy,
}

/// One emitted term: probability `p` that a fixed codomain element has exactly `k` preimages.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyTerm {
    pub k: usize,
    pub p: f64,
}

/// How emitted terms are scaled by the base term \(p(0)\).
#[derive(Debug, Clone, Copy, PartialEq)]
enum BaseTerm {
    /// `p(0)` itself.
    Linear(f64),
    /// `ln p(0)`; used when `p(0)` underflows.
    Log(f64),
}

impl BaseTerm {
    fn scale(self, ratio: &Ratio<BigUint>) -> f64 {
        if ratio.is_zero() {
            return 0.0;
        }
        match self {
            Self::Linear(p0) => {
                let (m, e) = ratio_parts(ratio.numer(), ratio.denom());
                ldexp(p0 * m, e)
            }
            Self::Log(ln_p0) => (ln_p0 + ln_ratio(ratio.numer(), ratio.denom())).exp(),
        }
    }
}

/// \(\ln\bigl(((r-1)/r)^n\bigr)\), evaluated as \((n/r) \cdot r \ln(1 - 1/r)\).
///
/// `-inf` for `r = 1`.
pub(crate) fn ln_base_term(n: &BigUint, r: &BigUint) -> f64 {
    let q = ratio_f64(n, r);
    let x = r.to_f64().map_or(0.0, f64::recip);
    // r ln(1 - 1/r) -> -1 once 1/r is below f64 resolution.
    let per_unit = if x > 0.0 { (-x).ln_1p() / x } else { -1.0 };
    q * per_unit
}

fn base_term(params: &Params, underflow: UnderflowPolicy) -> Result<BaseTerm> {
    let ln_p0 = ln_base_term(params.n(), params.r());
    if !ln_p0.is_finite() {
        return Err(PreimageError::NumericInstability(
            "n/r is not representable as f64",
        ));
    }
    let p0 = ln_p0.exp();
    if p0.is_normal() {
        return Ok(BaseTerm::Linear(p0));
    }
    match underflow {
        UnderflowPolicy::Escalate => {
            warn!("p(0) = exp({ln_p0}) underflows f64; evaluating terms in the log domain");
            Ok(BaseTerm::Log(ln_p0))
        }
        UnderflowPolicy::Fail => Err(PreimageError::NumericInstability("p(0) underflows f64")),
    }
}

/// Lazy generator of \(p(0), p(1), \dots\) up to the truncation point.
///
/// Cloning an unstarted generator gives an independent restart.
///
/// # Examples
///
/// ```
/// use preimages::{Binomials, Params};
///
/// let params = Params::from_u64(10, 10).unwrap();
/// let terms: Vec<_> = Binomials::new(&params).unwrap().collect();
///
/// // (9/10)^10
/// assert!((terms[0].p - 0.3487).abs() < 1e-3);
/// assert!(terms.iter().enumerate().all(|(i, t)| t.k == i));
/// ```
#[derive(Debug, Clone)]
pub struct Binomials {
    n_plus_one: BigUint,
    r_minus_one: BigUint,
    base: BaseTerm,
    ratio: Ratio<BigUint>,
    k: usize,
    min_k: usize,
    patience: u32,
    countdown: u32,
    threshold: f64,
    done: bool,
}

impl Binomials {
    /// Generator with the default [`GeneratorConfig`].
    ///
    /// # Errors
    ///
    /// See [`Binomials::with_config`].
    pub fn new(params: &Params) -> Result<Self> {
        Self::with_config(params, &GeneratorConfig::default())
    }

    /// Generator with explicit settings.
    ///
    /// # Errors
    ///
    /// - [`PreimageError::InvalidParameter`] for `r = 1` (no series form; use
    ///   [`preimage_distribution`]), an invalid policy, or `min_k > max_terms`.
    /// - [`PreimageError::NumericInstability`] if \(p(0)\) cannot be represented and the
    ///   underflow policy is [`UnderflowPolicy::Fail`].
    pub fn with_config(params: &Params, config: &GeneratorConfig) -> Result<Self> {
        let policy = &config.truncation;
        policy.validate()?;
        if params.r().is_one() {
            return Err(PreimageError::InvalidParameter(
                "r = 1 has no series form (all mass at k = n)",
            ));
        }
        let min_k = policy
            .min_k(params)
            .to_usize()
            .filter(|&m| m <= policy.max_terms)
            .ok_or(PreimageError::InvalidParameter(
                "n/r too large: min_k exceeds max_terms",
            ))?;
        let base = base_term(params, config.underflow)?;
        Ok(Self {
            n_plus_one: params.n() + 1u32,
            r_minus_one: params.r() - 1u32,
            base,
            ratio: Ratio::one(),
            k: 0,
            min_k,
            patience: policy.patience,
            countdown: policy.patience,
            threshold: policy.tail_threshold,
            done: false,
        })
    }

    /// The index below which the series is never cut off.
    #[must_use]
    pub fn min_k(&self) -> usize {
        self.min_k
    }

    /// Advance the exact ratio \(p(k) / p(0)\) from `k - 1` to `k`.
    fn step_ratio(&mut self, k: usize) {
        if self.ratio.is_zero() {
            return;
        }
        let k_big = BigUint::from(k);
        if k_big >= self.n_plus_one {
            // k > n: no element can have more preimages than there are inputs.
            self.ratio = Ratio::zero();
            return;
        }
        let num = &self.n_plus_one - &k_big;
        let den = &self.r_minus_one * &k_big;
        self.ratio *= Ratio::new(num, den);
    }
}

impl Iterator for Binomials {
    type Item = FrequencyTerm;

    fn next(&mut self) -> Option<FrequencyTerm> {
        if self.done {
            return None;
        }
        let k = self.k;
        if k > 0 {
            self.step_ratio(k);
        }
        let p = self.base.scale(&self.ratio);

        if k > self.min_k && p < self.threshold {
            self.countdown -= 1;
        } else {
            self.countdown = self.patience;
        }
        if self.countdown == 0 {
            debug!("series truncated after k={k} (min_k={})", self.min_k);
            self.done = true;
        }
        self.k += 1;
        Some(FrequencyTerm { k, p })
    }
}

impl FusedIterator for Binomials {}

/// A generated preimage-count distribution.
#[derive(Debug, Clone, PartialEq)]
pub enum Distribution {
    /// `p(0), p(1), ..., p(K)` up to the truncation point.
    Series(Vec<f64>),
    /// All mass at a single preimage count. This is the `r = 1` case, where the one codomain
    /// element has all `n` inputs as preimages.
    PointMass(BigUint),
}

impl Distribution {
    /// The dense series, if this is one.
    #[must_use]
    pub fn as_series(&self) -> Option<&[f64]> {
        match self {
            Self::Series(ps) => Some(ps),
            Self::PointMass(_) => None,
        }
    }

    /// `true` for a series with no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Series(ps) if ps.is_empty())
    }

    /// \(\sum_k p(k)\). Should be close to 1; the gap is the truncated tail.
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        match self {
            Self::Series(ps) => ps.iter().sum(),
            Self::PointMass(_) => 1.0,
        }
    }

    /// \(p(k)\); zero past the truncation point.
    #[must_use]
    pub fn probability(&self, k: usize) -> f64 {
        match self {
            Self::Series(ps) => ps.get(k).copied().unwrap_or(0.0),
            Self::PointMass(at) => {
                if *at == BigUint::from(k) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// The series as `(k, p)` rows. Empty for a point mass.
    #[must_use]
    pub fn rows(&self) -> Vec<FrequencyTerm> {
        self.as_series()
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(k, &p)| FrequencyTerm { k, p })
            .collect()
    }
}

/// Generate the preimage-count distribution for `params` with default settings.
///
/// # Errors
///
/// See [`preimage_distribution_with`].
pub fn preimage_distribution(params: &Params) -> Result<Distribution> {
    preimage_distribution_with(params, &GeneratorConfig::default())
}

/// Generate the preimage-count distribution for `params`.
///
/// For `r = 1` this is [`Distribution::PointMass`] at `n`; otherwise the truncated series from
/// [`Binomials`].
///
/// # Errors
///
/// Everything [`Binomials::with_config`] reports, and [`PreimageError::EmptyDistribution`] if
/// the generator yields nothing.
pub fn preimage_distribution_with(
    params: &Params,
    config: &GeneratorConfig,
) -> Result<Distribution> {
    if params.r().is_one() {
        return Ok(Distribution::PointMass(params.n().clone()));
    }
    let series: Vec<f64> = Binomials::with_config(params, config)?
        .map(|t| t.p)
        .collect();
    if series.is_empty() {
        return Err(PreimageError::EmptyDistribution);
    }
    Ok(Distribution::Series(series))
}
