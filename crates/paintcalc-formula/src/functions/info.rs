//! Information functions
//!
//! These never propagate errors from their argument; ISERROR and ISNA
//! exist to inspect them.

use super::FunctionResult;
use crate::value::FormulaValue;
use paintcalc_core::CellError;

fn check(args: &[FormulaValue], test: fn(&FormulaValue) -> bool) -> FunctionResult {
    let value = args[0].clone().into_scalar();
    Ok(FormulaValue::Boolean(test(&value)))
}

pub fn fn_isblank(args: &[FormulaValue]) -> FunctionResult {
    check(args, FormulaValue::is_empty)
}

pub fn fn_isnumber(args: &[FormulaValue]) -> FunctionResult {
    check(args, |v| matches!(v, FormulaValue::Number(_)))
}

pub fn fn_istext(args: &[FormulaValue]) -> FunctionResult {
    check(args, |v| matches!(v, FormulaValue::Text(_)))
}

pub fn fn_iserror(args: &[FormulaValue]) -> FunctionResult {
    check(args, FormulaValue::is_error)
}

pub fn fn_isna(args: &[FormulaValue]) -> FunctionResult {
    check(args, |v| v.error() == Some(CellError::Na))
}

pub fn fn_islogical(args: &[FormulaValue]) -> FunctionResult {
    check(args, |v| matches!(v, FormulaValue::Boolean(_)))
}

/// NA(): the `#N/A` error value
pub fn fn_na(_args: &[FormulaValue]) -> FunctionResult {
    Err(CellError::Na)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::testing::{eval, MapContext};
    use crate::value::FormulaValue;
    use paintcalc_core::CellError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn yes() -> FormulaValue {
        FormulaValue::Boolean(true)
    }

    fn no() -> FormulaValue {
        FormulaValue::Boolean(false)
    }

    #[test]
    fn test_type_checks() {
        let ctx = MapContext::new().with("A1", dec!(3)).with("A2", "three").with("A3", false);
        assert_eq!(ctx.eval("=ISNUMBER(A1)"), yes());
        assert_eq!(ctx.eval("=ISNUMBER(A2)"), no());
        assert_eq!(ctx.eval("=ISTEXT(A2)"), yes());
        assert_eq!(ctx.eval("=ISLOGICAL(A3)"), yes());
        assert_eq!(ctx.eval("=ISBLANK(A4)"), yes());
        assert_eq!(ctx.eval("=ISBLANK(A1)"), no());
    }

    #[test]
    fn test_error_checks() {
        assert_eq!(eval("=ISERROR(1/0)"), yes());
        assert_eq!(eval("=ISERROR(1)"), no());
        assert_eq!(eval("=ISNA(NA())"), yes());
        assert_eq!(eval("=ISNA(1/0)"), no());
        assert_eq!(eval("=NA()"), FormulaValue::Error(CellError::Na));
    }
}
