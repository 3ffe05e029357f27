//! Deterministic fixed-point fractions.
//!
//! A [`Fraction`] is an unsigned integer numerator over the implicit
//! denominator [`FIXED1`] (1e24). All arithmetic is checked: subtracting a
//! larger fraction from a smaller one is an [`StakingError::Underflow`],
//! never a wrap. Products are computed through 256-bit intermediates so a
//! multiplication only fails when the final result does not fit.

use std::fmt;
use std::str::FromStr;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StakingError};

/// Number of decimal digits behind the point.
pub const DIGITS: u32 = 24;

/// Raw representation of 1.0.
pub const FIXED1: u128 = 1_000_000_000_000_000_000_000_000;

/// Computes `a * b / c` without intermediate overflow, rounding down.
pub fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if c == 0 {
        return Err(StakingError::DivisionByZero);
    }
    let product = U256::from(a)
        .checked_mul(U256::from(b))
        .ok_or(StakingError::Overflow)?;
    narrow(product / U256::from(c))
}

fn narrow(value: U256) -> Result<u128> {
    if value > U256::from(u128::MAX) {
        return Err(StakingError::Overflow);
    }
    Ok(value.low_u128())
}

#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fraction(u128);

impl Fraction {
    pub const ZERO: Fraction = Fraction(0);
    pub const ONE: Fraction = Fraction(FIXED1);

    /// Wraps an already scaled value.
    pub const fn from_raw(raw: u128) -> Self {
        Fraction(raw)
    }

    /// The scaled value (numerator over [`FIXED1`]).
    pub const fn raw(self) -> u128 {
        self.0
    }

    pub fn from_integer(value: u128) -> Result<Self> {
        value
            .checked_mul(FIXED1)
            .map(Fraction)
            .ok_or(StakingError::Overflow)
    }

    /// `numerator / denominator`, rounded down to the fixed-point grid.
    pub fn new(numerator: u128, denominator: u128) -> Result<Self> {
        mul_div(numerator, FIXED1, denominator).map(Fraction)
    }

    /// Shorthand for percentages, `Fraction::percent(5)` is 0.05.
    pub fn percent(value: u128) -> Result<Self> {
        Self::new(value, 100)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Fraction) -> Result<Self> {
        self.0
            .checked_add(other.0)
            .map(Fraction)
            .ok_or(StakingError::Overflow)
    }

    pub fn checked_sub(self, other: Fraction) -> Result<Self> {
        self.0
            .checked_sub(other.0)
            .map(Fraction)
            .ok_or(StakingError::Underflow)
    }

    pub fn checked_mul(self, other: Fraction) -> Result<Self> {
        mul_div(self.0, other.0, FIXED1).map(Fraction)
    }

    pub fn checked_div(self, other: Fraction) -> Result<Self> {
        mul_div(self.0, FIXED1, other.0).map(Fraction)
    }

    pub fn halve(self) -> Self {
        Fraction(self.0 / 2)
    }

    /// Raises the fraction to an integer power by repeated squaring,
    /// truncating to the fixed-point grid after every product.
    pub fn pow(self, exponent: u64) -> Result<Self> {
        let mut result = Fraction::ONE;
        let mut base = self;
        let mut remaining = exponent;
        while remaining > 0 {
            if remaining & 1 == 1 {
                result = result.checked_mul(base)?;
            }
            remaining >>= 1;
            if remaining > 0 {
                base = base.checked_mul(base)?;
            }
        }
        Ok(result)
    }

    /// `floor(amount * self)` for base-currency amounts.
    pub fn mul_amount(self, amount: u128) -> Result<u128> {
        mul_div(amount, self.0, FIXED1)
    }

    /// Whole part, discarding the fractional digits.
    pub fn integer_part(self) -> u128 {
        self.0 / FIXED1
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / FIXED1;
        let fractional = self.0 % FIXED1;
        if fractional == 0 {
            return write!(f, "{}", whole);
        }
        let digits = format!("{:0width$}", fractional, width = DIGITS as usize);
        write!(f, "{}.{}", whole, digits.trim_end_matches('0'))
    }
}

impl fmt::Debug for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fraction({})", self)
    }
}

impl FromStr for Fraction {
    type Err = StakingError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || StakingError::InvalidParameter(format!("invalid fraction `{}`", s));
        let (whole, fractional) = match s.trim().split_once('.') {
            Some((whole, fractional)) => (whole, fractional),
            None => (s.trim(), ""),
        };
        if fractional.len() > DIGITS as usize
            || !fractional.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| invalid())?
        };
        let scaled = if fractional.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", fractional, width = DIGITS as usize);
            padded.parse::<u128>().map_err(|_| invalid())?
        };
        Fraction::from_integer(whole)?.checked_add(Fraction(scaled))
    }
}

impl TryFrom<String> for Fraction {
    type Error = StakingError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Fraction> for String {
    fn from(value: Fraction) -> Self {
        value.to_string()
    }
}
