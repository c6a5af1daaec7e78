//! Decimal arithmetic helpers with spreadsheet error mapping
//!
//! Linear operations stay exact. Non-linear ones (fractional powers, roots,
//! logarithms) go through `f64` and back.

use paintcalc_core::{CellError, Decimal};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::RoundingStrategy;

pub type NumResult = Result<Decimal, CellError>;

pub fn add(a: Decimal, b: Decimal) -> NumResult {
    a.checked_add(b).ok_or(CellError::Num)
}

pub fn sub(a: Decimal, b: Decimal) -> NumResult {
    a.checked_sub(b).ok_or(CellError::Num)
}

pub fn mul(a: Decimal, b: Decimal) -> NumResult {
    a.checked_mul(b).ok_or(CellError::Num)
}

pub fn div(a: Decimal, b: Decimal) -> NumResult {
    if b.is_zero() {
        return Err(CellError::Div0);
    }
    a.checked_div(b).ok_or(CellError::Num)
}

pub fn to_f64(n: Decimal) -> f64 {
    n.to_f64().unwrap_or(f64::NAN)
}

/// Back from `f64`; NaN and infinities become #NUM!
pub fn from_f64(f: f64) -> NumResult {
    if !f.is_finite() {
        return Err(CellError::Num);
    }
    Decimal::from_f64(f).ok_or(CellError::Num)
}

/// `base ^ exponent`. Integral exponents are exact.
pub fn pow(base: Decimal, exponent: Decimal) -> NumResult {
    if exponent.fract().is_zero() {
        if let Some(e) = exponent.to_i64() {
            if e.unsigned_abs() <= 1024 {
                return powi(base, e);
            }
        }
    }
    if base.is_sign_negative() && !base.is_zero() {
        // Fractional power of a negative number
        return Err(CellError::Num);
    }
    from_f64(to_f64(base).powf(to_f64(exponent)))
}

fn powi(base: Decimal, exponent: i64) -> NumResult {
    if exponent == 0 {
        if base.is_zero() {
            return Err(CellError::Num);
        }
        return Ok(Decimal::ONE);
    }

    let mut result = Decimal::ONE;
    let mut factor = base;
    let mut e = exponent.unsigned_abs();
    while e > 0 {
        if e & 1 == 1 {
            result = mul(result, factor)?;
        }
        e >>= 1;
        if e > 0 {
            factor = mul(factor, factor)?;
        }
    }

    if exponent < 0 {
        div(Decimal::ONE, result)
    } else {
        Ok(result)
    }
}

pub fn sqrt(n: Decimal) -> NumResult {
    if n.is_sign_negative() && !n.is_zero() {
        return Err(CellError::Num);
    }
    from_f64(to_f64(n).sqrt())
}

/// `10^digits` for |digits| up to 28
fn power_of_ten(digits: u32) -> NumResult {
    powi(Decimal::TEN, digits as i64)
}

/// Round to `digits` decimal places; negative digits round left of the point
pub fn round_with(n: Decimal, digits: i64, strategy: RoundingStrategy) -> NumResult {
    if digits >= 0 {
        let dp = digits.min(28) as u32;
        return Ok(n.round_dp_with_strategy(dp, strategy));
    }
    let places = digits.unsigned_abs();
    if places > 28 {
        return Ok(Decimal::ZERO);
    }
    let scale = power_of_ten(places as u32)?;
    let scaled = div(n, scale)?.round_dp_with_strategy(0, strategy);
    mul(scaled, scale)
}

/// ROUND semantics: half away from zero
pub fn round_half_away(n: Decimal, digits: i64) -> NumResult {
    round_with(n, digits, RoundingStrategy::MidpointAwayFromZero)
}

/// Integer part of a numeric argument, truncating toward zero
pub fn to_i64(n: Decimal) -> Option<i64> {
    n.trunc().to_i64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_division() {
        assert_eq!(div(dec!(3000), dec!(0.45)).unwrap().round_dp(2), dec!(6666.67));
        assert_eq!(div(dec!(1), dec!(0)), Err(CellError::Div0));
    }

    #[test]
    fn test_exact_sums() {
        assert_eq!(add(dec!(0.1), dec!(0.2)).unwrap(), dec!(0.3));
        assert_eq!(mul(Decimal::MAX, dec!(2)), Err(CellError::Num));
    }

    #[test]
    fn test_pow() {
        assert_eq!(pow(dec!(2), dec!(10)).unwrap(), dec!(1024));
        assert_eq!(pow(dec!(2), dec!(-2)).unwrap(), dec!(0.25));
        assert_eq!(pow(dec!(1.5), dec!(2)).unwrap(), dec!(2.25));
        assert_eq!(pow(dec!(0), dec!(0)), Err(CellError::Num));
        assert_eq!(pow(dec!(-8), dec!(0.5)), Err(CellError::Num));
        let root = pow(dec!(9), dec!(0.5)).unwrap();
        assert_eq!(root.round_dp(10), dec!(3));
    }

    #[test]
    fn test_round_half_away() {
        assert_eq!(round_half_away(dec!(2.5), 0).unwrap(), dec!(3));
        assert_eq!(round_half_away(dec!(-2.5), 0).unwrap(), dec!(-3));
        assert_eq!(round_half_away(dec!(1.005), 2).unwrap(), dec!(1.01));
        assert_eq!(round_half_away(dec!(1250), -2).unwrap(), dec!(1300));
        assert_eq!(round_half_away(dec!(-1249), -2).unwrap(), dec!(-1200));
    }

    #[test]
    fn test_sqrt_domain() {
        assert_eq!(sqrt(dec!(16)).unwrap(), dec!(4));
        assert_eq!(sqrt(dec!(-1)), Err(CellError::Num));
    }
}
