//! Exact rational arithmetic.
//!
//! `Number` is the sole numeric type in Musique: an (num, den) pair always
//! kept in canonical form (`gcd(|num|, den) == 1 && den > 0`). Ported from
//! `original_source/musique/value/number.cc`.

use crate::error::{Arithmetic_Error, Error, MusiqueError, Result};
use std::cmp::Ordering;
use std::fmt;

pub type Value_Type = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Number {
    pub num: Value_Type,
    pub den: Value_Type,
}

fn gcd(a: Value_Type, b: Value_Type) -> Value_Type {
    let (mut a, mut b) = (a.abs(), b.abs());
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn lcm(a: Value_Type, b: Value_Type) -> Value_Type {
    if a == 0 || b == 0 {
        return 0;
    }
    (a / gcd(a, b)) * b
}

impl Number {
    pub fn new(num: Value_Type, den: Value_Type) -> Self {
        Number { num, den }.simplify()
    }

    pub fn integer(v: Value_Type) -> Self {
        Number { num: v, den: 1 }
    }

    /// Returns self rounded down to the nearest integer, as a Number, then
    /// coerced to `i64`. Panics only if called on a non-integer-valued
    /// Number after simplification with a non-unit denominator and nonzero
    /// numerator — callers that need a lossless int should call `.floor()`
    /// or check `den == 1` themselves first.
    pub fn as_int(&self) -> Value_Type {
        let s = self.simplify();
        debug_assert!(s.den == 1 || s.num == 0);
        s.num
    }

    pub fn simplify(&self) -> Number {
        let mut copy = *self;
        copy.simplify_inplace();
        copy
    }

    pub fn simplify_inplace(&mut self) {
        loop {
            let d = gcd(self.num, self.den);
            if d != 1 && d != 0 {
                self.num /= d;
                self.den /= d;
            } else {
                break;
            }
        }
        if self.den < 0 {
            self.den = -self.den;
            self.num = -self.num;
        }
    }

    pub fn floor(&self) -> Number {
        round_impl(*self, Rounding_Mode::Floor)
    }

    pub fn ceil(&self) -> Number {
        round_impl(*self, Rounding_Mode::Ceil)
    }

    pub fn round(&self) -> Number {
        round_impl(*self, Rounding_Mode::Round)
    }

    pub fn inverse(&self) -> Result<Number> {
        if self.num == 0 {
            return Err(Arithmetic_Error::Division_By_Zero.into());
        }
        Ok(Number::new(self.den, self.num))
    }

    /// Raises self to an integer power `n`; `n` must have an integer value
    /// (den == 1 after simplification), else a clear rejection is raised —
    /// non-integer exponents (nth roots) are not implemented.
    pub fn pow(&self, n: Number) -> Result<Number> {
        let n = n.simplify();
        if n.den != 1 {
            return Err(MusiqueError::Unsupported_Types_For {
                operator_or_function: "function",
                name: "**".into(),
                possibilities: vec!["(number, integer-valued number) -> number"],
            }
            .into());
        }
        pow_impl(*self, n.num)
    }
}

fn pow_impl(x: Number, mut n: Value_Type) -> Result<Number> {
    if n == 0 {
        return Ok(Number::integer(1));
    }
    let flip = n < 0;
    if flip {
        n = -n;
    }
    let mut result = Number { num: 1, den: 1 };
    for _ in 0..n {
        result.num *= x.num;
        result.den *= x.den;
    }
    let result = result.simplify();
    if flip {
        result.inverse()
    } else {
        Ok(result)
    }
}

enum Rounding_Mode {
    Ceil,
    Floor,
    Round,
}

fn round_impl(value: Number, mode: Rounding_Mode) -> Number {
    let mut result = value.simplify();
    if result.den == 1 {
        return result;
    }
    let negative = result.num < 0;
    let mut num = result.num.abs();
    let den = result.den.abs();

    let r = num % den;
    if r != 0 {
        let mut ceil = matches!(mode, Rounding_Mode::Ceil);
        if matches!(mode, Rounding_Mode::Round) {
            ceil |= if negative { r * 2 <= den } else { r * 2 >= den };
        }
        if ceil ^ negative {
            num += den;
        }
        num /= den;
        result.num = if negative { -num } else { num };
        result.den = 1;
    } else {
        result.num = num / den * if negative { -1 } else { 1 };
        result.den = 1;
    }
    result
}

fn modular_inverse(a: Value_Type, n: Value_Type) -> Result<Value_Type> {
    let (mut t, mut newt) = (0i64, 1i64);
    let (mut r, mut newr) = (n, a);
    while newr != 0 {
        let q = r / newr;
        let t2 = t - q * newt;
        t = newt;
        newt = t2;
        let r2 = r - q * newr;
        r = newr;
        newr = r2;
    }
    if r > 1 {
        return Err(Arithmetic_Error::Unable_To_Calculate_Modular_Multiplicative_Inverse.into());
    }
    Ok(if t < 0 { t + n } else { t })
}

impl std::ops::Add for Number {
    type Output = Number;
    fn add(self, rhs: Number) -> Number {
        let l = lcm(self.den, rhs.den);
        Number::new(self.num * (l / self.den) + rhs.num * (l / rhs.den), l)
    }
}

impl std::ops::Sub for Number {
    type Output = Number;
    fn sub(self, rhs: Number) -> Number {
        let l = lcm(self.den, rhs.den);
        Number::new(self.num * (l / self.den) - rhs.num * (l / rhs.den), l)
    }
}

impl std::ops::Mul for Number {
    type Output = Number;
    fn mul(self, rhs: Number) -> Number {
        Number::new(self.num * rhs.num, self.den * rhs.den)
    }
}

impl std::ops::Neg for Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number::new(-self.num, self.den)
    }
}

impl Number {
    pub fn checked_div(self, rhs: Number) -> Result<Number> {
        if rhs.num == 0 {
            return Err(Arithmetic_Error::Division_By_Zero.into());
        }
        Ok(Number::new(self.num * rhs.den, self.den * rhs.num))
    }

    pub fn checked_rem(self, rhs: Number) -> Result<Number> {
        if rhs.num == 0 {
            return Err(Arithmetic_Error::Division_By_Zero.into());
        }
        let dividend = self.simplify();
        let divisor = rhs.simplify();
        if divisor.den != 1 {
            return Err(Arithmetic_Error::Fractional_Modulo.into());
        }
        let rnum = divisor.num;
        if dividend.den == 1 {
            return Ok(Number::integer(dividend.num % rnum));
        }
        let inv = modular_inverse(dividend.den, rnum)?;
        Ok(Number::integer((inv * dividend.num).rem_euclid(rnum)))
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.num * other.den - self.den * other.num).cmp(&0)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Parses a numeric literal's source text (already lexed as a single
/// Numeric token) into a Number: integer part, optional `.` fractional part.
pub fn parse(source: &str) -> Result<Number> {
    let err = || -> Error {
        MusiqueError::Failed_Numeric_Parsing {
            source: source.to_string(),
        }
        .into()
    };

    let (int_part, frac_part) = match source.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (source, None),
    };

    let num: Value_Type = if int_part.is_empty() {
        0
    } else {
        int_part.parse().map_err(|_| err())?
    };

    let mut result = Number { num, den: 1 };

    if let Some(frac) = frac_part {
        if frac.is_empty() {
            return Ok(result.simplify());
        }
        let frac_value: Value_Type = frac.parse().map_err(|_| err())?;
        let den = 10i64.checked_pow(frac.len() as u32).ok_or_else(err)?;
        let sign = if result.num < 0 { -1 } else { 1 };
        result = result + Number::new(sign * frac_value, den);
    }

    Ok(result.simplify())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_operators() {
        assert_eq!(Number::new(1, 8) + Number::new(3, 4), Number::new(7, 8));
        assert_eq!(Number::new(1, 8) - Number::new(3, 4), Number::new(-5, 8));
        assert_eq!(Number::new(1, 8) * Number::new(3, 4), Number::new(3, 32));
        assert_eq!(
            Number::new(1, 8).checked_div(Number::new(3, 4)).unwrap(),
            Number::new(1, 6)
        );
    }

    #[test]
    fn floor_ceil_round() {
        assert_eq!(Number::new(1, 2).floor(), Number::integer(0));
        assert_eq!(Number::new(3, 2).floor(), Number::integer(1));
        assert_eq!(Number::new(-1, 2).floor(), Number::integer(-1));

        assert_eq!(Number::new(1, 2).ceil(), Number::integer(1));
        assert_eq!(Number::new(3, 2).ceil(), Number::integer(2));
        assert_eq!(Number::new(-1, 2).ceil(), Number::integer(0));

        assert_eq!(Number::new(3, 4).round(), Number::integer(1));
        assert_eq!(Number::new(1, 4).round(), Number::integer(0));
        assert_eq!(Number::new(5, 4).round(), Number::integer(1));
        assert_eq!(Number::new(7, 4).round(), Number::integer(2));
        assert_eq!(Number::new(-3, 4).round(), Number::integer(-1));
        assert_eq!(Number::new(-5, 4).round(), Number::integer(-1));
        assert_eq!(Number::new(-7, 4).round(), Number::integer(-2));
    }

    #[test]
    fn division_by_zero_errors() {
        assert!(Number::integer(1).checked_div(Number::integer(0)).is_err());
    }

    #[test]
    fn fractional_modulo_errors() {
        assert!(Number::integer(5).checked_rem(Number::new(1, 2)).is_err());
    }

    #[test]
    fn pow_integer_and_negative() {
        assert_eq!(Number::integer(2).pow(Number::integer(3)).unwrap(), Number::integer(8));
        assert_eq!(
            Number::integer(2).pow(Number::integer(-1)).unwrap(),
            Number::new(1, 2)
        );
    }

    #[test]
    fn parses_decimal_literals() {
        assert_eq!(parse("120").unwrap(), Number::integer(120));
        assert_eq!(parse(".75").unwrap(), Number::new(3, 4));
        assert_eq!(parse("1.5").unwrap(), Number::new(3, 2));
    }

    #[test]
    fn ordering_is_cross_multiplied() {
        assert!(Number::new(1, 2) < Number::new(2, 3));
        assert_eq!(Number::new(2, 4), Number::new(1, 2));
    }

    #[test]
    fn simplify_keeps_denominator_positive() {
        let n = Number::new(1, -2);
        assert_eq!(n.num, -1);
        assert_eq!(n.den, 2);
    }
}
