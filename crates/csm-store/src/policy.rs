use tracing::warn;

use crate::error::StoreResult;

/// Error reporting policy of a driver.
///
/// Drivers implement each operation once as a plain fallible function and
/// pass the result through [`Strictness::settle`] to apply the policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strictness {
    /// Failures are returned as typed errors.
    Strict,
    /// Failures are logged and reported as `Ok(None)` / `Ok(false)`.
    Lenient,
}

impl Strictness {
    pub fn from_flag(strict: bool) -> Self {
        if strict {
            Self::Strict
        } else {
            Self::Lenient
        }
    }

    pub fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }

    /// Apply the policy to the outcome of operation `op`.
    pub fn settle<T>(self, op: &'static str, result: StoreResult<T>) -> StoreResult<Option<T>> {
        match (self, result) {
            (_, Ok(value)) => Ok(Some(value)),
            (Self::Strict, Err(e)) => Err(e),
            (Self::Lenient, Err(e)) => {
                warn!(op, error = %e, "operation failed (non-strict)");
                Ok(None)
            }
        }
    }

    /// [`Strictness::settle`] for operations without a value: `Ok(true)` on
    /// success, `Ok(false)` on a lenient failure.
    pub fn settle_flag(self, op: &'static str, result: StoreResult<()>) -> StoreResult<bool> {
        self.settle(op, result).map(|o| o.is_some())
    }
}

impl From<bool> for Strictness {
    fn from(strict: bool) -> Self {
        Self::from_flag(strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;

    fn failure() -> StoreResult<u8> {
        Err(StoreError::Configuration("boom".into()))
    }

    #[test]
    fn strict_propagates_error() {
        let err = Strictness::Strict.settle("get", failure()).unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn lenient_returns_none() {
        assert!(Strictness::Lenient.settle("get", failure()).unwrap().is_none());
    }

    #[test]
    fn success_is_some_in_both_modes() {
        assert_eq!(Strictness::Strict.settle("get", Ok(3)).unwrap(), Some(3));
        assert_eq!(Strictness::Lenient.settle("get", Ok(3)).unwrap(), Some(3));
    }

    #[test]
    fn settle_flag_maps_to_bool() {
        assert!(Strictness::Lenient.settle_flag("set", Ok(())).unwrap());
        let failed = Strictness::Lenient.settle_flag("set", failure().map(|_| ()));
        assert!(!failed.unwrap());
    }

    #[test]
    fn from_flag() {
        assert_eq!(Strictness::from(true), Strictness::Strict);
        assert!(!Strictness::from_flag(false).is_strict());
    }
}
