use anyhow::bail;
use ordered_float::NotNan;
use std::ops::Deref;

/// Coefficients whose magnitude falls below this threshold after expression
/// arithmetic are purged from the sparse map.
pub const COEFFICIENT_EPSILON: f64 = 1e-10;

/// Absolute tolerance for feasibility checks.
///
/// A solution is feasible iff its total violation does not exceed this
/// tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ATol(NotNan<f64>);

impl Deref for ATol {
    type Target = f64;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Default for ATol {
    fn default() -> Self {
        ATol(NotNan::new(1e-6).unwrap())
    }
}

impl ATol {
    pub fn new(value: f64) -> anyhow::Result<Self> {
        if value <= 0.0 {
            bail!("ATol must be positive: {value}");
        }
        Ok(ATol(NotNan::new(value)?))
    }

    pub fn into_inner(&self) -> f64 {
        self.0.into_inner()
    }
}

impl PartialEq<f64> for ATol {
    fn eq(&self, other: &f64) -> bool {
        self.0.into_inner() == *other
    }
}

impl PartialOrd<f64> for ATol {
    fn partial_cmp(&self, other: &f64) -> Option<std::cmp::Ordering> {
        self.0.into_inner().partial_cmp(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atol_new() {
        assert!(ATol::new(1e-4).is_ok());
        assert!(ATol::new(0.0).is_err());
        assert!(ATol::new(-1.0).is_err());
    }

    #[test]
    fn test_atol_default() {
        assert_eq!(ATol::default(), 1e-6);
    }
}
