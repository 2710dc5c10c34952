//! One analysis run packaged for a reporting or plotting front end.

use core::fmt;

use crate::binomial::{preimage_distribution_with, Distribution, FrequencyTerm, GeneratorConfig};
use crate::coverage::image_fraction;
use crate::entropy::EntropySummary;
use crate::{Params, Result};

/// Distribution rows plus scalar summaries for one `(n, r)`.
///
/// `Display` renders the plain-text table:
///
/// ```text
///  k  p(k)
///  0  0.348678
///  1  0.387420
///  ...
/// sum = 1.000000
/// Shannon entropy = 2.552722 bits
/// ideal   entropy = 3.321928 bits
/// expected peak frequency = 1.000000
/// ```
#[derive(Debug, Clone)]
pub struct CollisionReport {
    pub params: Params,
    pub distribution: Distribution,
    /// \(\sum_k p(k)\); a sanity check, expected to be close to 1.
    pub total_mass: f64,
    /// Expected share of the codomain that is hit.
    pub image_fraction: f64,
    pub summary: EntropySummary,
}

impl CollisionReport {
    /// Run the generator and the estimator with default settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use preimages::{CollisionReport, Params};
    ///
    /// let report = CollisionReport::compute(Params::from_u64(10, 10).unwrap()).unwrap();
    /// assert!((report.total_mass - 1.0).abs() < 1e-9);
    /// assert!(report.to_string().starts_with(" k  p(k)\n 0  0.348678\n"));
    /// ```
    ///
    /// # Errors
    ///
    /// Anything the generator or the estimator reports.
    pub fn compute(params: Params) -> Result<Self> {
        Self::compute_with(params, &GeneratorConfig::default())
    }

    /// Run the generator and the estimator with explicit generator settings.
    ///
    /// # Errors
    ///
    /// Anything the generator or the estimator reports.
    pub fn compute_with(params: Params, config: &GeneratorConfig) -> Result<Self> {
        let distribution = preimage_distribution_with(&params, config)?;
        let summary = EntropySummary::compute(&distribution, &params)?;
        Ok(Self {
            total_mass: distribution.total_mass(),
            image_fraction: image_fraction(&distribution)?,
            summary,
            distribution,
            params,
        })
    }

    /// `(k, p(k))` rows in increasing `k`; what a plotting front end needs.
    #[must_use]
    pub fn rows(&self) -> Vec<FrequencyTerm> {
        self.distribution.rows()
    }

    /// The most likely preimage count (first one on ties).
    #[must_use]
    pub fn mode(&self) -> Option<FrequencyTerm> {
        self.rows()
            .into_iter()
            .fold(None, |best: Option<FrequencyTerm>, t| match best {
                Some(b) if b.p >= t.p => Some(b),
                _ => Some(t),
            })
    }
}

impl fmt::Display for CollisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, " k  p(k)")?;
        match &self.distribution {
            Distribution::Series(ps) => {
                for (k, p) in ps.iter().enumerate() {
                    writeln!(f, "{k:>2}  {p:.6}")?;
                }
            }
            Distribution::PointMass(at) => writeln!(f, "{at:>2}  {:.6}", 1.0)?,
        }
        writeln!(f, "sum = {:.6}", self.total_mass)?;
        writeln!(f, "Shannon entropy = {:.6} bits", self.summary.estimated_bits)?;
        writeln!(f, "ideal   entropy = {:.6} bits", self.summary.ideal_bits)?;
        writeln!(
            f,
            "expected peak frequency = {:.6}",
            self.summary.expected_peak_frequency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_into_ten_table() {
        let report = CollisionReport::compute(Params::from_u64(10, 10).unwrap()).unwrap();
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], " k  p(k)");
        assert_eq!(lines[1], " 0  0.348678");
        assert_eq!(lines[2], " 1  0.387420");
        // 19 rows, then four summary lines.
        assert_eq!(lines.len(), 1 + 19 + 4);
        assert_eq!(lines[20], "sum = 1.000000");
        assert!(lines[21].starts_with("Shannon entropy = "));
        assert_eq!(lines[22], "ideal   entropy = 3.321928 bits");
        assert_eq!(lines[23], "expected peak frequency = 1.000000");
    }

    #[test]
    fn sapling_report() {
        let report = CollisionReport::compute(Params::sapling_to_scalar().unwrap()).unwrap();
        let rows = report.rows();
        assert!(rows.iter().enumerate().all(|(i, t)| t.k == i));
        let mode = report.mode().unwrap();
        // Poisson-like with mean ~17.67: the mode is 17.
        assert_eq!(mode.k, 17);
        assert!(report.image_fraction > 1.0 - 1e-7);
        assert!(report.summary.estimated_bits < report.summary.ideal_bits);
        let text = report.to_string();
        assert!(text.contains("expected peak frequency = 17.66"));
    }

    #[test]
    fn point_mass_table() {
        let report = CollisionReport::compute(Params::from_u64(12, 1).unwrap()).unwrap();
        assert!(report.rows().is_empty());
        assert!(report.mode().is_none());
        let text = report.to_string();
        assert!(text.contains("\n12  1.000000\n"));
        assert!(text.contains("Shannon entropy = 0.000000 bits"));
        assert!(text.contains("ideal   entropy = 0.000000 bits"));
    }
}
