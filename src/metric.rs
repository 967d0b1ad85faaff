use serde::Serialize;

/// A statistic that may not be computable for the given input.
///
/// Zero denominators (an empty cohort, a student with no credit hours)
/// produce [`Metric::Undefined`] instead of `NaN` or a misleading `0.0`.
/// Serializes as `{"status":"defined","value":3.2}` or
/// `{"status":"undefined"}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Defined(f64),
    Undefined,
}

impl Metric {
    /// Wraps `value`, mapping non-finite results to [`Metric::Undefined`].
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Metric::Defined(value)
        } else {
            Metric::Undefined
        }
    }

    /// `numerator / denominator`, undefined when the denominator is zero.
    pub fn ratio(numerator: f64, denominator: f64) -> Self {
        if denominator == 0.0 {
            Metric::Undefined
        } else {
            Metric::from_value(numerator / denominator)
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Metric::Defined(v) => Some(v),
            Metric::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, Metric::Defined(_))
    }

    pub fn is_undefined(self) -> bool {
        !self.is_defined()
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Metric::Defined(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            Metric::Undefined => f.write_str("undefined"),
        }
    }
}
