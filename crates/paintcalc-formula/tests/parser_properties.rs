//! Property tests for the parser and evaluator

use paintcalc_formula::{evaluate, parse_formula, EmptyContext, FormulaExpr, FormulaValue};
use proptest::prelude::*;
use rust_decimal::Decimal;

proptest! {
    /// Arbitrary input never panics; it parses or reports a positioned error
    #[test]
    fn parser_never_panics(input in "\\PC{0,40}") {
        if let Err(err) = parse_formula(&input) {
            let _ = err.to_string();
        }
    }

    /// Formula-shaped noise: operators, references, calls and literals
    #[test]
    fn evaluation_never_panics(input in "=[A-C1-3+*/^&:(),<>=\"$%!{};0-9. ]{0,30}|=(SUM|IF|ROUND|VLOOKUP|MID)\\([A-C1-3,0-9\"]{0,12}\\)") {
        if let Ok(expr) = parse_formula(&input) {
            let _ = evaluate(&expr, &EmptyContext);
        }
    }

    #[test]
    fn integer_literals_round_trip(n in -1_000_000_000i64..1_000_000_000i64) {
        let expr = parse_formula(&n.to_string()).unwrap();
        let value = evaluate(&expr, &EmptyContext);
        prop_assert_eq!(value, FormulaValue::Number(Decimal::from(n)));
    }

    /// Addition is exact for two-place decimals
    #[test]
    fn cents_add_exactly(a in 0i64..10_000_000, b in 0i64..10_000_000) {
        let (x, y) = (Decimal::new(a, 2), Decimal::new(b, 2));
        let expr = parse_formula(&format!("={x}+{y}")).unwrap();
        prop_assert_eq!(evaluate(&expr, &EmptyContext), FormulaValue::Number(x + y));
    }

    #[test]
    fn parse_is_deterministic(input in "=[A-C1-3+*/(),0-9 ]{1,20}") {
        let first: Result<FormulaExpr, _> = parse_formula(&input);
        prop_assert_eq!(first, parse_formula(&input));
    }
}
