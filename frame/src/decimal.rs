use crate::{Error, Result};
use std::cmp::Ordering;
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// A fixed-point number: `coefficient * 10^-scale`.
///
/// Equality is structural, so `1.0` (10, 1) and `1.00` (100, 2) are different
/// values; use [`Decimal::value_cmp`] to compare numerically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Decimal {
    pub coefficient: i64,
    pub scale: i32,
}

fn pow10(exp: u32) -> Result<i128> {
    10i128.checked_pow(exp).ok_or(Error::Overflow)
}

fn narrow(x: i128) -> Result<i64> {
    i64::try_from(x).map_err(|_| Error::Overflow)
}

impl Decimal {
    pub fn new(coefficient: i64, scale: i32) -> Self {
        Decimal { coefficient, scale }
    }

    /// Re-expresses the number at another scale. Scaling down truncates toward zero.
    pub fn rescale(self, scale: i32) -> Result<Decimal> {
        let diff = i64::from(scale) - i64::from(self.scale);
        let exp = u32::try_from(diff.abs()).map_err(|_| Error::Overflow)?;
        let coefficient = if diff >= 0 {
            let factor = pow10(exp)?;
            narrow(
                i128::from(self.coefficient)
                    .checked_mul(factor)
                    .ok_or(Error::Overflow)?,
            )?
        } else {
            match pow10(exp) {
                Ok(factor) => narrow(i128::from(self.coefficient) / factor)?,
                // Dividing by more than 10^38 leaves nothing of an i64.
                Err(_) => 0,
            }
        };
        Ok(Decimal { coefficient, scale })
    }

    /// Brings both operands to the larger of their scales.
    fn align(self, other: Decimal) -> Result<(i64, i64, i32)> {
        let scale = self.scale.max(other.scale);
        let a = self.rescale(scale)?;
        let b = other.rescale(scale)?;
        Ok((a.coefficient, b.coefficient, scale))
    }

    pub fn checked_add(self, other: Decimal) -> Result<Decimal> {
        let (a, b, scale) = self.align(other)?;
        let coefficient = a.checked_add(b).ok_or(Error::Overflow)?;
        Ok(Decimal { coefficient, scale })
    }

    pub fn checked_sub(self, other: Decimal) -> Result<Decimal> {
        let (a, b, scale) = self.align(other)?;
        let coefficient = a.checked_sub(b).ok_or(Error::Overflow)?;
        Ok(Decimal { coefficient, scale })
    }

    pub fn checked_mul(self, other: Decimal) -> Result<Decimal> {
        let coefficient = self
            .coefficient
            .checked_mul(other.coefficient)
            .ok_or(Error::Overflow)?;
        let scale = self.scale.checked_add(other.scale).ok_or(Error::Overflow)?;
        Ok(Decimal { coefficient, scale })
    }

    /// Divides, keeping the larger of the two operand scales. The quotient is
    /// truncated toward zero.
    pub fn checked_div(self, other: Decimal) -> Result<Decimal> {
        if other.coefficient == 0 {
            return Err(Error::DivideByZero);
        }
        let scale = self.scale.max(other.scale);
        // a/10^sa / (b/10^sb) = q/10^scale  =>  q = a * 10^(scale - sa + sb) / b
        let exp = i64::from(scale) - i64::from(self.scale) + i64::from(other.scale);
        let mut numerator = i128::from(self.coefficient);
        let mut denominator = i128::from(other.coefficient);
        let factor = pow10(u32::try_from(exp.abs()).map_err(|_| Error::Overflow)?)?;
        if exp >= 0 {
            numerator = numerator.checked_mul(factor).ok_or(Error::Overflow)?;
        } else {
            denominator = denominator.checked_mul(factor).ok_or(Error::Overflow)?;
        }
        Ok(Decimal {
            coefficient: narrow(numerator / denominator)?,
            scale,
        })
    }

    /// Numeric comparison, independent of scale.
    pub fn value_cmp(&self, other: &Decimal) -> Ordering {
        match self.align(*other) {
            Ok((a, b, _)) => a.cmp(&b),
            // One side could not be widened; compare in floating point instead.
            Err(_) => self
                .to_f64()
                .partial_cmp(&other.to_f64())
                .unwrap_or(Ordering::Equal),
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.coefficient as f64 / 10f64.powi(self.scale)
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.scale <= 0 {
            write!(f, "{}", self.coefficient)?;
            for _ in 0..-(self.scale as i64) {
                write!(f, "0")?;
            }
            return Ok(());
        }

        let digits = self.coefficient.unsigned_abs().to_string();
        let scale = self.scale as usize;
        let sign = if self.coefficient < 0 { "-" } else { "" };
        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{}{}.{}", sign, int, frac)
        } else {
            write!(f, "{}0.{:0>width$}", sign, digits, width = scale)
        }
    }
}

impl FromStr for Decimal {
    type Err = Error;

    fn from_str(s: &str) -> Result<Decimal> {
        let bad = || Error::Corrupt(format!("{:?} is not a decimal", s));
        let (int, frac) = match s.find('.') {
            Some(dot) => (&s[..dot], &s[dot + 1..]),
            None => (s, ""),
        };
        if int.is_empty() && frac.is_empty() {
            return Err(bad());
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let digits = format!("{}{}", int, frac);
        let coefficient = digits.parse::<i64>().map_err(|_| bad())?;
        let scale = i32::try_from(frac.len()).map_err(|_| Error::Overflow)?;
        Ok(Decimal { coefficient, scale })
    }
}
