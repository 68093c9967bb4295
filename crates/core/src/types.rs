/// The scalar type used for all coefficients.
pub type Scalar = f64;

/// Flat-column stand-in for a query whose evaluation budget ran out.
///
/// Distinguishable from every valid coefficient, including `0.0`, via
/// `f64::is_nan`.
pub const FAILURE_SENTINEL: Scalar = f64::NAN;

/// Outcome of a single top-level coefficient query.
#[derive(Debug, Clone, PartialEq)]
pub enum Coefficient {
    /// A coefficient in `[0, 1]`.
    Value(Scalar),
    /// The query was aborted; `reason` carries the error text.
    Unavailable { reason: String },
}

impl Coefficient {
    pub fn value(&self) -> Option<Scalar> {
        match self {
            Coefficient::Value(v) => Some(*v),
            Coefficient::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Coefficient::Value(_))
    }

    /// The coefficient, or [`FAILURE_SENTINEL`] when unavailable.
    pub fn or_sentinel(&self) -> Scalar {
        self.value().unwrap_or(FAILURE_SENTINEL)
    }
}

impl From<crate::error::Result<Scalar>> for Coefficient {
    fn from(result: crate::error::Result<Scalar>) -> Self {
        match result {
            Ok(v) => Coefficient::Value(v),
            Err(e) => Coefficient::Unavailable {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::KinshipError;

    #[test]
    fn test_sentinel_distinct_from_zero() {
        let failed = Coefficient::Unavailable {
            reason: "x".to_string(),
        };
        assert!(failed.or_sentinel().is_nan());
        assert_eq!(Coefficient::Value(0.0).or_sentinel(), 0.0);
        assert!(!failed.is_available());
    }

    #[test]
    fn test_from_result() {
        let ok: Coefficient = Ok(0.125).into();
        assert_eq!(ok, Coefficient::Value(0.125));

        let err: Coefficient = Err(KinshipError::RecursionExhausted {
            id: "A".to_string(),
            frames: 3,
            steps: 10,
        })
        .into();
        match err {
            Coefficient::Unavailable { reason } => assert!(reason.contains("'A'")),
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
