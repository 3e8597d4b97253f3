//! The numeric tower: arbitrary precision integers, exact rationals and
//! doubles.

use std::cmp::Ordering;
use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};

use crate::error::{Error, Result};

/// A number value.
///
/// Exact results are kept normalized: a rational whose denominator reduces to
/// `1` is stored as [`Number::Int`]. Any operation that involves a double
/// produces a double.
#[derive(Debug, Clone, PartialEq)]
pub enum Number {
    Int(BigInt),
    Rational(BigRational),
    Double(f64),
}

impl Number {
    pub fn zero() -> Number {
        Number::Int(BigInt::zero())
    }

    pub fn one() -> Number {
        Number::Int(BigInt::one())
    }

    /// Parse a number literal.
    ///
    /// The accepted grammar is `[+-]?digits`, `[+-]?digits/digits` and
    /// `[+-]?digits.digits`. Anything else, including a rational with a zero
    /// denominator, is a syntax error.
    pub fn parse(s: &str) -> Result<Number> {
        let invalid = || Error::syntax(format!("invalid number syntax '{}'", s));

        let (negative, unsigned) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let int_part_len = unsigned
            .bytes()
            .position(|b| !b.is_ascii_digit())
            .unwrap_or_else(|| unsigned.len());
        if int_part_len == 0 {
            return Err(invalid());
        }
        let (int_part, rest) = unsigned.split_at(int_part_len);
        let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

        let signed = |n: BigInt| if negative { -n } else { n };
        let parse_int =
            |digits: &str| BigInt::parse_bytes(digits.as_bytes(), 10).ok_or_else(invalid);

        if rest.is_empty() {
            Ok(Number::Int(signed(parse_int(int_part)?)))
        } else if let Some(denom) = rest.strip_prefix('/') {
            if !all_digits(denom) {
                return Err(invalid());
            }
            let denom = parse_int(denom)?;
            if denom.is_zero() {
                return Err(Error::syntax(format!("zero denominator in '{}'", s)));
            }
            Ok(Number::from(BigRational::new(
                signed(parse_int(int_part)?),
                denom,
            )))
        } else if let Some(frac) = rest.strip_prefix('.') {
            if !all_digits(frac) {
                return Err(invalid());
            }
            s.parse::<f64>().map(Number::Double).map_err(|_| invalid())
        } else {
            Err(invalid())
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Number::Int(i) => i.is_zero(),
            Number::Rational(r) => r.is_zero(),
            Number::Double(d) => *d == 0.0,
        }
    }

    /// Whether this number is an exact integer.
    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Int(_))
    }

    pub fn as_int(&self) -> Option<&BigInt> {
        match self {
            Number::Int(i) => Some(i),
            _ => None,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            Number::Int(i) => i.to_f64().unwrap_or(f64::NAN),
            Number::Rational(r) => match (r.numer().to_f64(), r.denom().to_f64()) {
                (Some(n), Some(d)) => n / d,
                _ => f64::NAN,
            },
            Number::Double(d) => *d,
        }
    }

    fn to_ratio(&self) -> Option<BigRational> {
        match self {
            Number::Int(i) => Some(BigRational::from_integer(i.clone())),
            Number::Rational(r) => Some(r.clone()),
            Number::Double(_) => None,
        }
    }

    fn binary_op(
        &self,
        rhs: &Number,
        int_op: impl FnOnce(&BigInt, &BigInt) -> BigInt,
        ratio_op: impl FnOnce(&BigRational, &BigRational) -> BigRational,
        double_op: impl FnOnce(f64, f64) -> f64,
    ) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => Number::Int(int_op(a, b)),
            (Number::Double(_), _) | (_, Number::Double(_)) => {
                Number::Double(double_op(self.to_f64(), rhs.to_f64()))
            }
            _ => match (self.to_ratio(), rhs.to_ratio()) {
                (Some(a), Some(b)) => Number::from(ratio_op(&a, &b)),
                _ => unreachable!("doubles are handled above"),
            },
        }
    }

    pub fn add(&self, rhs: &Number) -> Number {
        self.binary_op(rhs, |a, b| a + b, |a, b| a + b, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Number) -> Number {
        self.binary_op(rhs, |a, b| a - b, |a, b| a - b, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Number) -> Number {
        self.binary_op(rhs, |a, b| a * b, |a, b| a * b, |a, b| a * b)
    }

    /// Divide. Exact operands produce an exact result, so `(/ 1 3)` is the
    /// rational `1/3`. A zero divisor is always an error, even for doubles.
    pub fn div(&self, rhs: &Number) -> Result<Number> {
        if rhs.is_zero() {
            return Err(Error::DivisionByZero);
        }
        let res = match (self, rhs) {
            (Number::Double(_), _) | (_, Number::Double(_)) => {
                Number::Double(self.to_f64() / rhs.to_f64())
            }
            _ => match (self.to_ratio(), rhs.to_ratio()) {
                (Some(a), Some(b)) => Number::from(a / b),
                _ => unreachable!("doubles are handled above"),
            },
        };
        Ok(res)
    }

    /// Floored modulo over integers. The result takes the sign of the divisor.
    ///
    /// Returns `None` if either operand is not an exact integer.
    pub fn modulo(&self, rhs: &Number) -> Option<Result<Number>> {
        let (a, b) = (self.as_int()?, rhs.as_int()?);
        if b.is_zero() {
            return Some(Err(Error::DivisionByZero));
        }
        Some(Ok(Number::Int(a.mod_floor(b))))
    }

    pub fn neg(&self) -> Number {
        match self {
            Number::Int(i) => Number::Int(-i),
            Number::Rational(r) => Number::Rational(-r),
            Number::Double(d) => Number::Double(-d),
        }
    }

    /// Compare by numeric value. Returns `None` when a NaN is involved.
    pub fn partial_cmp_value(&self, rhs: &Number) -> Option<Ordering> {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(b)),
            (Number::Double(_), _) | (_, Number::Double(_)) => {
                self.to_f64().partial_cmp(&rhs.to_f64())
            }
            _ => Some(self.to_ratio()?.cmp(&rhs.to_ratio()?)),
        }
    }

    /// Numeric equality across representations, so `(eq? 1 1.0)` holds.
    pub fn num_eq(&self, rhs: &Number) -> bool {
        self.partial_cmp_value(rhs) == Some(Ordering::Equal)
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(BigInt::from(v))
    }
}

impl From<BigInt> for Number {
    fn from(v: BigInt) -> Self {
        Number::Int(v)
    }
}

impl From<BigRational> for Number {
    fn from(v: BigRational) -> Self {
        if v.denom().is_one() {
            Number::Int(v.to_integer())
        } else {
            Number::Rational(v)
        }
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Double(v)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Rational(r) => write!(f, "{}/{}", r.numer(), r.denom()),
            Number::Double(d) => {
                let s = d.to_string();
                // keep doubles distinguishable from integers when read back
                if d.is_finite() && !s.contains('.') {
                    write!(f, "{}.0", s)
                } else {
                    f.write_str(&s)
                }
            }
        }
    }
}
