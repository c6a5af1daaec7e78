//! Formula evaluator
//!
//! Evaluates formula ASTs to produce values. Evaluation never fails as a Rust
//! error: bad input becomes an error value that flows into whatever reads it.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaError, FormulaResult};
use crate::functions::{registry, FunctionKind};
use crate::numeric;
use crate::value::{compare_values, FormulaValue, RangeValue};
use paintcalc_core::{CellError, Decimal};
use std::cmp::Ordering;

/// Where references get their values
///
/// The engine implements this over one evaluation pass; tests implement it
/// over a plain map.
pub trait EvaluationContext {
    /// Value of a single referenced cell
    fn cell(&self, reference: &CellReference) -> FormulaValue;

    /// Values of a referenced range as a [`FormulaValue::Range`]
    fn range(&self, reference: &RangeReference) -> FormulaValue;

    /// Value of a defined name
    fn name(&self, name: &str) -> FormulaValue;
}

/// A context without a workbook: every cell is empty and no names exist
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyContext;

impl EvaluationContext for EmptyContext {
    fn cell(&self, _reference: &CellReference) -> FormulaValue {
        FormulaValue::Empty
    }

    fn range(&self, reference: &RangeReference) -> FormulaValue {
        let range = reference.range;
        FormulaValue::Range(RangeValue::new(
            range.row_count() as usize,
            range.col_count() as usize,
        ))
    }

    fn name(&self, _name: &str) -> FormulaValue {
        FormulaValue::Error(CellError::Name)
    }
}

/// Evaluate a formula expression
pub fn evaluate(expr: &FormulaExpr, ctx: &dyn EvaluationContext) -> FormulaValue {
    match expr {
        // === Literals ===
        FormulaExpr::Number(n) => FormulaValue::Number(*n),
        FormulaExpr::Text(s) => FormulaValue::text(s),
        FormulaExpr::Boolean(b) => FormulaValue::Boolean(*b),
        FormulaExpr::Error(e) => FormulaValue::Error(*e),
        FormulaExpr::Missing => FormulaValue::Empty,

        // === References ===
        FormulaExpr::CellRef(cell_ref) => ctx.cell(cell_ref),
        FormulaExpr::RangeRef(range_ref) => ctx.range(range_ref),
        FormulaExpr::NameRef(name) => ctx.name(name),

        // === Operators ===
        FormulaExpr::BinaryOp { op, left, right } => evaluate_binary_op(*op, left, right, ctx),
        FormulaExpr::UnaryOp { op, operand } => evaluate_unary_op(*op, operand, ctx),

        // === Functions ===
        FormulaExpr::Function { name, args } => evaluate_function(name, args, ctx),

        // === Arrays ===
        FormulaExpr::Array(rows) => FormulaValue::Array(
            rows.iter()
                .map(|row| row.iter().map(|expr| evaluate(expr, ctx).into_scalar()).collect())
                .collect(),
        ),
    }
}

/// Evaluate a binary operation
fn evaluate_binary_op(
    op: BinaryOperator,
    left: &FormulaExpr,
    right: &FormulaExpr,
    ctx: &dyn EvaluationContext,
) -> FormulaValue {
    let left_val = evaluate(left, ctx).into_scalar();
    let right_val = evaluate(right, ctx).into_scalar();

    // Propagate errors, left operand first
    if let Some(e) = left_val.error() {
        return FormulaValue::Error(e);
    }
    if let Some(e) = right_val.error() {
        return FormulaValue::Error(e);
    }

    if op.is_comparison() {
        let ordering = compare_values(&left_val, &right_val);
        let result = match op {
            BinaryOperator::Equal => ordering == Ordering::Equal,
            BinaryOperator::NotEqual => ordering != Ordering::Equal,
            BinaryOperator::LessThan => ordering == Ordering::Less,
            BinaryOperator::LessEqual => ordering != Ordering::Greater,
            BinaryOperator::GreaterThan => ordering == Ordering::Greater,
            _ => ordering != Ordering::Less,
        };
        return FormulaValue::Boolean(result);
    }

    if op == BinaryOperator::Concat {
        return FormulaValue::text(left_val.to_text() + &right_val.to_text());
    }

    let (l, r) = match (left_val.to_number(), right_val.to_number()) {
        (Ok(l), Ok(r)) => (l, r),
        (Err(e), _) | (_, Err(e)) => return FormulaValue::Error(e),
    };

    let result = match op {
        BinaryOperator::Add => numeric::add(l, r),
        BinaryOperator::Subtract => numeric::sub(l, r),
        BinaryOperator::Multiply => numeric::mul(l, r),
        BinaryOperator::Divide => numeric::div(l, r),
        _ => numeric::pow(l, r),
    };
    result.into()
}

/// Evaluate a unary operation
fn evaluate_unary_op(
    op: UnaryOperator,
    operand: &FormulaExpr,
    ctx: &dyn EvaluationContext,
) -> FormulaValue {
    let n = match evaluate(operand, ctx).into_scalar().to_number() {
        Ok(n) => n,
        Err(e) => return FormulaValue::Error(e),
    };

    match op {
        UnaryOperator::Negate => FormulaValue::Number(-n),
        UnaryOperator::Plus => FormulaValue::Number(n),
        UnaryOperator::Percent => numeric::div(n, Decimal::ONE_HUNDRED).into(),
    }
}

/// Evaluate a function call
///
/// Unknown names and wrong arities normally never get here, because
/// [`validate_functions`] rejects them when the workbook is compiled.
fn evaluate_function(name: &str, args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FormulaValue {
    let Some(func) = registry().get(name) else {
        return FormulaValue::Error(CellError::Name);
    };

    if !func.accepts(args.len()) {
        return FormulaValue::Error(CellError::Value);
    }

    let result = match func.kind {
        FunctionKind::Eager(implementation) => {
            let values: Vec<FormulaValue> = args.iter().map(|arg| evaluate(arg, ctx)).collect();
            implementation(&values)
        }
        FunctionKind::Lazy(implementation) => implementation(args, ctx),
    };
    result.unwrap_or_else(FormulaValue::Error)
}

/// Check that every function in the expression exists and gets a legal
/// number of arguments
pub fn validate_functions(expr: &FormulaExpr) -> FormulaResult<()> {
    let mut problem = None;
    expr.walk(&mut |node| {
        if problem.is_some() {
            return;
        }
        let FormulaExpr::Function { name, args } = node else {
            return;
        };
        match registry().get(name) {
            None => problem = Some(FormulaError::UnknownFunction(name.clone())),
            Some(func) if !func.accepts(args.len()) => {
                problem = Some(FormulaError::ArgumentCount {
                    function: name.clone(),
                    expected: func.arity_description(),
                    actual: args.len(),
                });
            }
            Some(_) => {}
        }
    });
    problem.map_or(Ok(()), Err)
}


#[cfg(test)]
mod tests {
    use super::testing::{eval, num, MapContext};
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_evaluate_literals() {
        assert_eq!(eval("=42"), num(dec!(42)));
        assert_eq!(eval("=\"Hello\""), FormulaValue::text("Hello"));
        assert_eq!(eval("=TRUE"), FormulaValue::Boolean(true));
        assert_eq!(eval("=#N/A"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_evaluate_arithmetic() {
        assert_eq!(eval("=1+2"), num(dec!(3)));
        assert_eq!(eval("=10-3"), num(dec!(7)));
        assert_eq!(eval("=4*5"), num(dec!(20)));
        assert_eq!(eval("=20/4"), num(dec!(5)));
        assert_eq!(eval("=2^10"), num(dec!(1024)));
        assert_eq!(eval("=0.1+0.2"), num(dec!(0.3)));
    }

    #[test]
    fn test_evaluate_precedence() {
        assert_eq!(eval("=1+2*3"), num(dec!(7)));
        assert_eq!(eval("=(1+2)*3"), num(dec!(9)));
        assert_eq!(eval("=2+3*4-5"), num(dec!(9)));
        assert_eq!(eval("=-2^2"), num(dec!(4)));
        assert_eq!(eval("=2^3^2"), num(dec!(512)));
    }

    #[test]
    fn test_evaluate_unary() {
        assert_eq!(eval("=-5"), num(dec!(-5)));
        assert_eq!(eval("=50%"), num(dec!(0.5)));
        assert_eq!(eval("=--5"), num(dec!(5)));
        assert_eq!(eval("=+\"3\""), num(dec!(3)));
    }

    #[test]
    fn test_evaluate_errors() {
        assert_eq!(eval("=1/0"), FormulaValue::Error(CellError::Div0));
        assert_eq!(eval("=\"abc\"+1"), FormulaValue::Error(CellError::Value));
        assert_eq!(eval("=#REF!+1/0"), FormulaValue::Error(CellError::Ref));
        assert_eq!(eval("=(1/0)&\"x\""), FormulaValue::Error(CellError::Div0));
    }

    #[test]
    fn test_evaluate_comparison() {
        assert_eq!(eval("=1<2"), FormulaValue::Boolean(true));
        assert_eq!(eval("=1>2"), FormulaValue::Boolean(false));
        assert_eq!(eval("=5=5"), FormulaValue::Boolean(true));
        assert_eq!(eval("=5<>5"), FormulaValue::Boolean(false));
        assert_eq!(eval("=\"abc\"=\"ABC\""), FormulaValue::Boolean(true));
        assert_eq!(eval("=\"b\">\"a\""), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=0"), FormulaValue::Boolean(true));
        assert_eq!(eval("=A1=\"\""), FormulaValue::Boolean(true));
    }

    #[test]
    fn test_evaluate_concatenation() {
        assert_eq!(eval("=\"Hello \"&\"World\""), FormulaValue::text("Hello World"));
        assert_eq!(eval("=\"Total: \"&2.50"), FormulaValue::text("Total: 2.5"));
        assert_eq!(eval("=1&2"), FormulaValue::text("12"));
        assert_eq!(eval("=TRUE&\"\""), FormulaValue::text("TRUE"));
    }

    #[test]
    fn test_cell_and_range_references() {
        let ctx = MapContext::new()
            .with("A1", dec!(10))
            .with("A2", dec!(20))
            .with("Rates!B2", dec!(3.50));
        assert_eq!(ctx.eval("=A1+A2"), num(dec!(30)));
        assert_eq!(ctx.eval("=$A$1*Rates!B2"), num(dec!(35)));
        assert_eq!(ctx.eval("=A3"), FormulaValue::Empty);
        assert_eq!(ctx.eval("=A3+1"), num(dec!(1)));
        assert_eq!(ctx.eval("=SUM(A1:A3)"), num(dec!(30)));
    }

    #[test]
    fn test_defined_names() {
        let ctx = MapContext::new()
            .with("Inputs!B2", dec!(1200))
            .with_name("SidingSqft", "=Inputs!$B$2");
        assert_eq!(ctx.eval("=sidingsqft*2"), num(dec!(2400)));
        assert_eq!(ctx.eval("=Missing"), FormulaValue::Error(CellError::Name));
    }

    #[test]
    fn test_unknown_function_and_arity_at_runtime() {
        let ast = crate::parse_formula("=NOPE(1)").unwrap();
        assert_eq!(evaluate(&ast, &EmptyContext), FormulaValue::Error(CellError::Name));

        let ast = crate::parse_formula("=ABS(1,2)").unwrap();
        assert_eq!(evaluate(&ast, &EmptyContext), FormulaValue::Error(CellError::Value));
    }

    #[test]
    fn test_validate_functions() {
        let ok = crate::parse_formula("=IF(A1>0,ROUND(A1,2),SUM(B1:B3))").unwrap();
        assert!(validate_functions(&ok).is_ok());

        let unknown = crate::parse_formula("=IF(A1,PMT(1,2,3),0)").unwrap();
        assert!(matches!(
            validate_functions(&unknown),
            Err(FormulaError::UnknownFunction(name)) if name == "PMT"
        ));

        let arity = crate::parse_formula("=ROUND(A1)").unwrap();
        match validate_functions(&arity) {
            Err(FormulaError::ArgumentCount { function, expected, actual }) => {
                assert_eq!(function, "ROUND");
                assert_eq!(expected, "2");
                assert_eq!(actual, 1);
            }
            other => panic!("expected ArgumentCount, got {other:?}"),
        }
    }

    #[test]
    fn test_array_constants() {
        assert_eq!(
            eval("={1,2;3,4}"),
            FormulaValue::Array(vec![vec![num(dec!(1)), num(dec!(2))], vec![num(dec!(3)), num(dec!(4))]])
        );
        assert_eq!(eval("=SUM({1,2;3,4})"), num(dec!(10)));
    }
}
