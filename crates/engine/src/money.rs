use std::{
    fmt,
    ops::{Add, Neg, Sub},
};

use crate::EngineError;

/// Signed money amount represented as **integer minor units** (cents).
///
/// Use this type for **all** monetary values in the engine (donation amounts,
/// campaign goals and funding counters) to avoid floating-point drift. The
/// wire format is a decimal number; conversion happens at the boundary with
/// [`Money::from_decimal`] and [`Money::to_decimal`].
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.minor(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Wire decimals with more than two fractional digits are rejected:
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!(Money::from_decimal(10.5, "amount").unwrap().minor(), 1050);
/// assert!(Money::from_decimal(12.345, "amount").is_err());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Money(i64);

/// Tolerance used when checking that a decimal has at most two fractional
/// digits after scaling.
const SCALE_EPSILON: f64 = 1e-6;

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer minor units.
    #[must_use]
    pub const fn new(minor: i64) -> Self {
        Self(minor)
    }

    /// Returns the raw value in minor units.
    #[must_use]
    pub const fn minor(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Converts a wire decimal into minor units.
    ///
    /// Fails with a validation error on `field` when the value is not finite,
    /// carries more than two fractional digits or does not fit in `i64`.
    pub fn from_decimal(value: f64, field: &str) -> Result<Self, EngineError> {
        if !value.is_finite() {
            return Err(EngineError::validation(field, "amount must be a finite number"));
        }
        let scaled = value * 100.0;
        let rounded = scaled.round();
        if (scaled - rounded).abs() > SCALE_EPSILON {
            return Err(EngineError::validation(
                field,
                "amount must have at most 2 decimals",
            ));
        }
        if rounded >= i64::MAX as f64 || rounded <= i64::MIN as f64 {
            return Err(EngineError::validation(field, "amount too large"));
        }
        Ok(Self(rounded as i64))
    }

    /// Converts minor units back into a wire decimal.
    #[must_use]
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}
