//! Statistical functions

use super::criteria::{for_each_match, CriteriaMatcher};
use super::{collect_numbers, FunctionResult};
use crate::numeric::{add, div};
use crate::value::FormulaValue;
use paintcalc_core::{CellError, Decimal};

fn mean(numbers: &[Decimal]) -> FunctionResult {
    if numbers.is_empty() {
        return Err(CellError::Div0);
    }
    let mut total = Decimal::ZERO;
    for n in numbers {
        total = add(total, *n)?;
    }
    Ok(FormulaValue::Number(div(total, Decimal::from(numbers.len()))?))
}

/// AVERAGE(number1, [number2], ...)
pub fn fn_average(args: &[FormulaValue]) -> FunctionResult {
    mean(&collect_numbers(args)?)
}

/// MIN(number1, [number2], ...): zero when there are no numbers
pub fn fn_min(args: &[FormulaValue]) -> FunctionResult {
    let min = collect_numbers(args)?.into_iter().min().unwrap_or(Decimal::ZERO);
    Ok(FormulaValue::Number(min))
}

/// MAX(number1, [number2], ...): zero when there are no numbers
pub fn fn_max(args: &[FormulaValue]) -> FunctionResult {
    let max = collect_numbers(args)?.into_iter().max().unwrap_or(Decimal::ZERO);
    Ok(FormulaValue::Number(max))
}

/// COUNT(value1, [value2], ...): cells holding numbers; errors are not counted
pub fn fn_count(args: &[FormulaValue]) -> FunctionResult {
    let count = args
        .iter()
        .flat_map(FormulaValue::flat)
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// COUNTA(value1, [value2], ...): every non-empty value, errors included
pub fn fn_counta(args: &[FormulaValue]) -> FunctionResult {
    let count = args
        .iter()
        .flat_map(FormulaValue::flat)
        .filter(|v| !v.is_empty())
        .count();
    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// COUNTBLANK(range): empty cells and empty text
pub fn fn_countblank(args: &[FormulaValue]) -> FunctionResult {
    let blank = args[0]
        .flat()
        .filter(|v| match v {
            FormulaValue::Empty => true,
            FormulaValue::Text(s) => s.is_empty(),
            _ => false,
        })
        .count() as u64;
    Ok(FormulaValue::Number(Decimal::from(blank + args[0].skipped_blanks())))
}

/// COUNTIF(range, criteria)
pub fn fn_countif(args: &[FormulaValue]) -> FunctionResult {
    let matcher = CriteriaMatcher::new(&args[1]);
    let mut count = args[0].flat().filter(|v| matcher.matches(v)).count() as u64;
    if matcher.matches(&FormulaValue::Empty) {
        count += args[0].skipped_blanks();
    }
    Ok(FormulaValue::Number(Decimal::from(count)))
}

/// AVERAGEIF(range, criteria, [average_range])
pub fn fn_averageif(args: &[FormulaValue]) -> FunctionResult {
    let matcher = CriteriaMatcher::new(&args[1]);
    let range = &args[0];
    let average_range = args.get(2).unwrap_or(range);

    let mut numbers = Vec::new();
    for_each_match(range, &matcher, average_range, |value| {
        match value {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
        Ok(())
    })?;
    mean(&numbers)
}

#[cfg(test)]
mod tests {
    use crate::evaluator::testing::{eval, num, MapContext};
    use crate::value::FormulaValue;
    use paintcalc_core::CellError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn walls() -> MapContext {
        MapContext::new()
            .with("A1", "north")
            .with("A2", "south")
            .with("A3", "north")
            .with("A4", "")
            .with("B1", dec!(110))
            .with("B2", dec!(90))
            .with("B3", dec!(130))
            .with("B4", CellError::Na)
    }

    #[test]
    fn test_average() {
        assert_eq!(eval("=AVERAGE(1, 2, 3, 4)"), num(dec!(2.5)));
        assert_eq!(walls().eval("=AVERAGE(B1:B3)"), num(dec!(110)));
        assert_eq!(eval("=AVERAGE(\"x\")"), FormulaValue::Error(CellError::Div0));
        assert_eq!(walls().eval("=AVERAGE(B1:B4)"), FormulaValue::Error(CellError::Na));
    }

    #[test]
    fn test_min_max() {
        assert_eq!(walls().eval("=MIN(B1:B3)"), num(dec!(90)));
        assert_eq!(walls().eval("=MAX(B1:B3, 200)"), num(dec!(200)));
        assert_eq!(walls().eval("=MAX(A1:A3)"), num(dec!(0)));
        assert_eq!(eval("=MIN(-2.5, 1)"), num(dec!(-2.5)));
    }

    #[test]
    fn test_counts() {
        let ctx = walls();
        assert_eq!(ctx.eval("=COUNT(A1:B4)"), num(dec!(3)));
        assert_eq!(ctx.eval("=COUNTA(A1:B4)"), num(dec!(8)));
        assert_eq!(ctx.eval("=COUNTBLANK(A1:A5)"), num(dec!(2)));
    }

    #[test]
    fn test_countif_and_averageif() {
        let ctx = walls();
        assert_eq!(ctx.eval("=COUNTIF(A1:A3, \"north\")"), num(dec!(2)));
        assert_eq!(ctx.eval("=COUNTIF(B1:B3, \">=100\")"), num(dec!(2)));
        assert_eq!(ctx.eval("=AVERAGEIF(A1:A3, \"north\", B1:B3)"), num(dec!(120)));
        assert_eq!(
            ctx.eval("=AVERAGEIF(A1:A3, \"east\", B1:B3)"),
            FormulaValue::Error(CellError::Div0)
        );
    }
}
