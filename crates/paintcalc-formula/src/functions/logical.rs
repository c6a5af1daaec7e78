//! Logical functions
//!
//! `IF`, `IFS`, `IFERROR`, `IFNA`, `SWITCH`, `AND` and `OR` are lazy. A branch
//! that is not taken is never evaluated, so an error inside it cannot leak.

use super::FunctionResult;
use crate::ast::FormulaExpr;
use crate::evaluator::{evaluate, EvaluationContext};
use crate::value::{compare_values, FormulaValue};
use paintcalc_core::CellError;
use std::cmp::Ordering;

fn condition(expr: &FormulaExpr, ctx: &dyn EvaluationContext) -> Result<bool, CellError> {
    evaluate(expr, ctx).into_scalar().to_bool()
}

/// IF(condition, value_if_true, [value_if_false])
pub fn fn_if(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    if condition(&args[0], ctx)? {
        Ok(evaluate(&args[1], ctx))
    } else {
        Ok(args
            .get(2)
            .map_or(FormulaValue::Boolean(false), |expr| evaluate(expr, ctx)))
    }
}

/// IFS(condition1, value1, [condition2, value2], ...)
pub fn fn_ifs(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    if args.len() % 2 != 0 {
        return Err(CellError::Value);
    }
    for pair in args.chunks_exact(2) {
        if condition(&pair[0], ctx)? {
            return Ok(evaluate(&pair[1], ctx));
        }
    }
    Err(CellError::Na)
}

/// IFERROR(value, value_if_error)
pub fn fn_iferror(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    let value = evaluate(&args[0], ctx);
    if value.is_error() {
        Ok(evaluate(&args[1], ctx))
    } else {
        Ok(value)
    }
}

/// IFNA(value, value_if_na)
pub fn fn_ifna(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    let value = evaluate(&args[0], ctx);
    if value.error() == Some(CellError::Na) {
        Ok(evaluate(&args[1], ctx))
    } else {
        Ok(value)
    }
}

/// SWITCH(expression, value1, result1, [value2, result2], ..., [default])
pub fn fn_switch(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    let subject = evaluate(&args[0], ctx).into_scalar();
    if let Some(e) = subject.error() {
        return Err(e);
    }

    let cases = &args[1..];
    for pair in cases.chunks_exact(2) {
        let candidate = evaluate(&pair[0], ctx).into_scalar();
        if let Some(e) = candidate.error() {
            return Err(e);
        }
        if compare_values(&subject, &candidate) == Ordering::Equal {
            return Ok(evaluate(&pair[1], ctx));
        }
    }

    match cases.chunks_exact(2).remainder() {
        [default] => Ok(evaluate(default, ctx)),
        _ => Err(CellError::Na),
    }
}

/// Logical view of one argument
///
/// Inside ranges and arrays only booleans and numbers count. A direct text
/// argument must spell TRUE or FALSE.
fn for_each_logical(
    value: &FormulaValue,
    visit: &mut dyn FnMut(bool) -> bool,
) -> Result<(bool, bool), CellError> {
    let mut seen = false;
    match value {
        FormulaValue::Array(_) | FormulaValue::Range(_) => {
            for cell in value.flat() {
                let b = match cell {
                    FormulaValue::Boolean(b) => *b,
                    FormulaValue::Number(n) => !n.is_zero(),
                    FormulaValue::Error(e) => return Err(*e),
                    _ => continue,
                };
                seen = true;
                if visit(b) {
                    return Ok((true, true));
                }
            }
        }
        FormulaValue::Empty => {}
        scalar => {
            seen = true;
            if visit(scalar.to_bool()?) {
                return Ok((true, true));
            }
        }
    }
    Ok((seen, false))
}

/// Shared body of AND/OR: stop at the first value equal to `decisive`
fn short_circuit(args: &[FormulaExpr], ctx: &dyn EvaluationContext, decisive: bool) -> FunctionResult {
    let mut any = false;
    for arg in args {
        let value = evaluate(arg, ctx);
        let (seen, stopped) = for_each_logical(&value, &mut |b| b == decisive)?;
        if stopped {
            return Ok(FormulaValue::Boolean(decisive));
        }
        any |= seen;
    }
    if any {
        Ok(FormulaValue::Boolean(!decisive))
    } else {
        Err(CellError::Value)
    }
}

/// AND(logical1, [logical2], ...)
pub fn fn_and(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    short_circuit(args, ctx, false)
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    short_circuit(args, ctx, true)
}

/// XOR(logical1, [logical2], ...): TRUE when an odd number of arguments are TRUE
pub fn fn_xor(args: &[FormulaValue]) -> FunctionResult {
    let mut any = false;
    let mut trues = 0usize;
    for value in args {
        let (seen, _) = for_each_logical(value, &mut |b| {
            trues += usize::from(b);
            false
        })?;
        any |= seen;
    }
    if any {
        Ok(FormulaValue::Boolean(trues % 2 == 1))
    } else {
        Err(CellError::Value)
    }
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue]) -> FunctionResult {
    Ok(FormulaValue::Boolean(!args[0].to_bool()?))
}

/// TRUE()
pub fn fn_true(_args: &[FormulaValue]) -> FunctionResult {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[FormulaValue]) -> FunctionResult {
    Ok(FormulaValue::Boolean(false))
}

#[cfg(test)]
mod tests {
    use crate::evaluator::testing::{eval, num, MapContext};
    use crate::value::FormulaValue;
    use paintcalc_core::CellError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_if() {
        assert_eq!(eval("=IF(TRUE, 1, 2)"), num(dec!(1)));
        assert_eq!(eval("=IF(0, 1, 2)"), num(dec!(2)));
        assert_eq!(eval("=IF(FALSE, 1)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=IF(\"x\", 1, 2)"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=IF(1/0, 1, 2)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_if_only_evaluates_taken_branch() {
        assert_eq!(eval("=IF(TRUE, 5, 1/0)"), num(dec!(5)));
        assert_eq!(eval("=IF(FALSE, NA(), \"ok\")"), FormulaValue::text("ok"));
    }

    #[test]
    fn test_ifs() {
        let ctx = MapContext::new().with("A1", dec!(75));
        assert_eq!(
            ctx.eval("=IFS(A1>=90, \"A\", A1>=70, \"C\", TRUE, \"F\")"),
            FormulaValue::text("C")
        );
        assert_eq!(ctx.eval("=IFS(A1>100, 1)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_iferror_and_ifna() {
        assert_eq!(eval("=IFERROR(1/0, 0)"), num(dec!(0)));
        assert_eq!(eval("=IFERROR(5, 1/0)"), num(dec!(5)));
        assert_eq!(eval("=IFNA(NA(), \"none\")"), FormulaValue::text("none"));
        assert_eq!(eval("=IFNA(1/0, \"none\")"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_switch() {
        let ctx = MapContext::new().with("A1", "premium");
        assert_eq!(
            ctx.eval("=SWITCH(A1, \"economy\", 2.5, \"PREMIUM\", 5, 0)"),
            num(dec!(5))
        );
        assert_eq!(ctx.eval("=SWITCH(A1, \"economy\", 2.5, 0)"), num(dec!(0)));
        assert_eq!(
            ctx.eval("=SWITCH(A1, \"economy\", 2.5)"),
            FormulaValue::Error(CellError::Na)
        );
    }

    #[test]
    fn test_and_or() {
        assert_eq!(eval("=AND(TRUE, 1, 2>1)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE, 0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(FALSE, 0, 3)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=OR(FALSE, 0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=AND(\"maybe\")"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=AND(A1:A3)"), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_and_or_short_circuit() {
        assert_eq!(eval("=AND(FALSE, 1/0)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=OR(TRUE, NA())"), FormulaValue::Boolean(true));
        assert_eq!(eval("=AND(TRUE, 1/0)"), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_ranges_skip_text() {
        let ctx = MapContext::new()
            .with("A1", true)
            .with("A2", "note")
            .with("A3", dec!(1));
        assert_eq!(ctx.eval("=AND(A1:A3)"), FormulaValue::Boolean(true));
        assert_eq!(ctx.eval("=XOR(A1:A3)"), FormulaValue::Boolean(false));
    }

    #[test]
    fn test_not_xor_constants() {
        assert_eq!(eval("=NOT(FALSE)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=NOT(5)"), FormulaValue::Boolean(false));
        assert_eq!(eval("=XOR(TRUE, FALSE, TRUE, TRUE)"), FormulaValue::Boolean(true));
        assert_eq!(eval("=TRUE()"), FormulaValue::Boolean(true));
        assert_eq!(eval("=FALSE()"), FormulaValue::Boolean(false));
    }
}
