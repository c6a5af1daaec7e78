//! Math functions

use super::criteria::{for_each_match, CriteriaMatcher};
use super::{collect_numbers, opt_integer, opt_number, FunctionResult};
use crate::numeric::{self, div, from_f64, mul, round_half_away, round_with, to_f64};
use crate::value::FormulaValue;
use paintcalc_core::{CellError, Decimal};
use rust_decimal::RoundingStrategy;

fn number(n: Decimal) -> FunctionResult {
    Ok(FormulaValue::Number(n))
}

/// SUM(number1, [number2], ...)
pub fn fn_sum(args: &[FormulaValue]) -> FunctionResult {
    let mut total = Decimal::ZERO;
    for n in collect_numbers(args)? {
        total = numeric::add(total, n)?;
    }
    number(total)
}

/// PRODUCT(number1, [number2], ...): zero when there is nothing to multiply
pub fn fn_product(args: &[FormulaValue]) -> FunctionResult {
    let numbers = collect_numbers(args)?;
    if numbers.is_empty() {
        return number(Decimal::ZERO);
    }
    let mut product = Decimal::ONE;
    for n in numbers {
        product = mul(product, n)?;
    }
    number(product)
}

/// SUMPRODUCT(array1, [array2], ...)
///
/// All arrays need the same dimensions; non-numeric entries count as zero,
/// so only offsets where the first array holds a number can add anything.
pub fn fn_sumproduct(args: &[FormulaValue]) -> FunctionResult {
    let dims = args[0].dimensions();
    if args.iter().any(|a| a.dimensions() != dims) {
        return Err(CellError::Value);
    }
    if let Some(e) = args.iter().flat_map(FormulaValue::flat).find_map(FormulaValue::error) {
        return Err(e);
    }

    let mut total = Decimal::ZERO;
    for (r, c, first) in args[0].entries() {
        let FormulaValue::Number(first) = first else { continue };
        let mut product = *first;
        for other in &args[1..] {
            let factor = match other.get(r, c) {
                Some(FormulaValue::Number(n)) => *n,
                _ => Decimal::ZERO,
            };
            product = mul(product, factor)?;
        }
        total = numeric::add(total, product)?;
    }
    number(total)
}

/// SUMIF(range, criteria, [sum_range])
///
/// `sum_range` is read at the same offsets as the matching cells of `range`.
pub fn fn_sumif(args: &[FormulaValue]) -> FunctionResult {
    let matcher = CriteriaMatcher::new(&args[1]);
    let range = &args[0];
    let sum_range = args.get(2).unwrap_or(range);

    let mut total = Decimal::ZERO;
    for_each_match(range, &matcher, sum_range, |value| {
        match value {
            FormulaValue::Number(n) => total = numeric::add(total, *n)?,
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
        Ok(())
    })?;
    number(total)
}

/// ROUND(number, num_digits): halves round away from zero
pub fn fn_round(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let digits = args[1].to_integer()?;
    number(round_half_away(n, digits)?)
}

/// ROUNDUP(number, num_digits): away from zero
pub fn fn_roundup(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let digits = args[1].to_integer()?;
    number(round_with(n, digits, RoundingStrategy::AwayFromZero)?)
}

/// ROUNDDOWN(number, num_digits): toward zero
pub fn fn_rounddown(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let digits = args[1].to_integer()?;
    number(round_with(n, digits, RoundingStrategy::ToZero)?)
}

/// Shared body of CEILING/FLOOR: `round(n / significance) * significance`
fn to_multiple(args: &[FormulaValue], round: fn(Decimal) -> Decimal, zero: FunctionResult) -> FunctionResult {
    let n = args[0].to_number()?;
    let significance = opt_number(args, 1, Decimal::ONE)?;
    if significance.is_zero() {
        return zero;
    }
    if n.is_sign_positive() && !n.is_zero() && significance.is_sign_negative() {
        return Err(CellError::Num);
    }
    let quotient = div(n, significance)?;
    number(mul(round(quotient), significance)?)
}

/// CEILING(number, [significance])
pub fn fn_ceiling(args: &[FormulaValue]) -> FunctionResult {
    to_multiple(args, |q| q.ceil(), number(Decimal::ZERO))
}

/// FLOOR(number, [significance])
pub fn fn_floor(args: &[FormulaValue]) -> FunctionResult {
    to_multiple(args, |q| q.floor(), Err(CellError::Div0))
}

/// MROUND(number, multiple): nearest multiple, halves away from zero
pub fn fn_mround(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let multiple = args[1].to_number()?;
    if multiple.is_zero() {
        return number(Decimal::ZERO);
    }
    if !n.is_zero() && n.is_sign_negative() != multiple.is_sign_negative() {
        return Err(CellError::Num);
    }
    let quotient = round_half_away(div(n, multiple)?, 0)?;
    number(mul(quotient, multiple)?)
}

/// INT(number): round down to the next integer
pub fn fn_int(args: &[FormulaValue]) -> FunctionResult {
    number(args[0].to_number()?.floor())
}

/// TRUNC(number, [num_digits])
pub fn fn_trunc(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let digits = opt_integer(args, 1, 0)?;
    number(round_with(n, digits, RoundingStrategy::ToZero)?)
}

pub fn fn_abs(args: &[FormulaValue]) -> FunctionResult {
    number(args[0].to_number()?.abs())
}

pub fn fn_sign(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let sign = if n.is_zero() {
        Decimal::ZERO
    } else if n.is_sign_negative() {
        Decimal::NEGATIVE_ONE
    } else {
        Decimal::ONE
    };
    number(sign)
}

/// MOD(number, divisor): the result takes the sign of the divisor
pub fn fn_mod(args: &[FormulaValue]) -> FunctionResult {
    let n = args[0].to_number()?;
    let d = args[1].to_number()?;
    if d.is_zero() {
        return Err(CellError::Div0);
    }
    let r = n.checked_rem(d).ok_or(CellError::Num)?;
    if !r.is_zero() && r.is_sign_negative() != d.is_sign_negative() {
        number(numeric::add(r, d)?)
    } else {
        number(r)
    }
}

/// POWER(number, power)
pub fn fn_power(args: &[FormulaValue]) -> FunctionResult {
    let base = args[0].to_number()?;
    let exponent = args[1].to_number()?;
    number(numeric::pow(base, exponent)?)
}

pub fn fn_sqrt(args: &[FormulaValue]) -> FunctionResult {
    number(numeric::sqrt(args[0].to_number()?)?)
}

fn positive(n: Decimal) -> Result<f64, CellError> {
    if n.is_sign_negative() || n.is_zero() {
        return Err(CellError::Num);
    }
    Ok(to_f64(n))
}

/// LN(number)
pub fn fn_ln(args: &[FormulaValue]) -> FunctionResult {
    let x = positive(args[0].to_number()?)?;
    number(from_f64(x.ln())?)
}

/// LOG(number, [base]): base 10 by default
pub fn fn_log(args: &[FormulaValue]) -> FunctionResult {
    let x = positive(args[0].to_number()?)?;
    let base = positive(opt_number(args, 1, Decimal::TEN)?)?;
    if base == 1.0 {
        return Err(CellError::Div0);
    }
    let log = if base == 10.0 {
        x.log10()
    } else if base == 2.0 {
        x.log2()
    } else {
        x.ln() / base.ln()
    };
    number(from_f64(log)?)
}

pub fn fn_log10(args: &[FormulaValue]) -> FunctionResult {
    let x = positive(args[0].to_number()?)?;
    number(from_f64(x.log10())?)
}

pub fn fn_exp(args: &[FormulaValue]) -> FunctionResult {
    let x = to_f64(args[0].to_number()?);
    number(from_f64(x.exp())?)
}

pub fn fn_pi(_args: &[FormulaValue]) -> FunctionResult {
    number(from_f64(std::f64::consts::PI)?)
}
