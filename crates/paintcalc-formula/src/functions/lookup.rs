//! Lookup functions
//!
//! Keys compare with spreadsheet coercion: numeric text matches numbers,
//! booleans count as 0/1 and text compares case-insensitively. Approximate
//! modes assume the searched vector is sorted and binary-search it.

use super::criteria::wildcard_match;
use super::{opt_bool, opt_integer, FunctionResult};
use crate::ast::FormulaExpr;
use crate::evaluator::{evaluate, EvaluationContext};
use crate::value::{compare_text, parse_number, FormulaValue, BLANK};
use paintcalc_core::{CellError, Decimal};
use std::cmp::Ordering;

/// How a key is located in a vector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// Greatest value <= key in an ascending vector
    Ascending,
    /// The first equal value
    Exact,
    /// Smallest value >= key in a descending vector
    Descending,
}

impl MatchMode {
    fn from_match_type(match_type: i64) -> Self {
        match match_type.cmp(&0) {
            Ordering::Greater => MatchMode::Ascending,
            Ordering::Equal => MatchMode::Exact,
            Ordering::Less => MatchMode::Descending,
        }
    }
}

fn lookup_number(v: &FormulaValue) -> Option<Decimal> {
    match v {
        FormulaValue::Number(n) => Some(*n),
        FormulaValue::Boolean(b) => Some(if *b { Decimal::ONE } else { Decimal::ZERO }),
        FormulaValue::Text(s) => parse_number(s.as_str()),
        _ => None,
    }
}

/// Ordering of `candidate` relative to `key`, or None when they cannot be compared
fn lookup_compare(key: &FormulaValue, candidate: &FormulaValue) -> Option<Ordering> {
    match (key, candidate) {
        (FormulaValue::Text(k), FormulaValue::Text(c)) => Some(compare_text(c.as_str(), k.as_str())),
        _ => Some(lookup_number(candidate)?.cmp(&lookup_number(key)?)),
    }
}

fn lookup_key(value: &FormulaValue) -> Result<FormulaValue, CellError> {
    match value.clone().into_scalar() {
        FormulaValue::Error(e) => Err(e),
        FormulaValue::Array(_) | FormulaValue::Range(_) => Err(CellError::Value),
        FormulaValue::Empty => Err(CellError::Na),
        key => Ok(key),
    }
}

/// 0-based position of `key` in `vector`
fn find_position(key: &FormulaValue, vector: &[&FormulaValue], mode: MatchMode) -> Result<usize, CellError> {
    match mode {
        MatchMode::Exact => {
            let pattern = match key {
                FormulaValue::Text(s) if s.as_str().contains(['*', '?']) => Some(s.as_str().to_lowercase()),
                _ => None,
            };
            vector
                .iter()
                .position(|candidate| match (&pattern, candidate) {
                    (Some(p), FormulaValue::Text(c)) => wildcard_match(p, &c.as_str().to_lowercase()),
                    _ => lookup_compare(key, candidate) == Some(Ordering::Equal),
                })
                .ok_or(CellError::Na)
        }
        MatchMode::Ascending => {
            // Cells that cannot be compared do not stop the search
            let end = vector.partition_point(|candidate| {
                lookup_compare(key, candidate).map_or(true, |o| o != Ordering::Greater)
            });
            last_comparable(key, vector, end)
        }
        MatchMode::Descending => {
            let end = vector.partition_point(|candidate| {
                lookup_compare(key, candidate).map_or(true, |o| o != Ordering::Less)
            });
            last_comparable(key, vector, end)
        }
    }
}

fn last_comparable(key: &FormulaValue, vector: &[&FormulaValue], end: usize) -> Result<usize, CellError> {
    (0..end)
        .rev()
        .find(|&i| lookup_compare(key, vector[i]).is_some())
        .ok_or(CellError::Na)
}

/// Table argument, read in place; a scalar is a 1x1 table
///
/// Search vectors stop at the last non-blank cell: a blank never equals a
/// key and is skipped by the approximate modes, so the rest of a whole-column
/// reference cannot change a result.
struct Table<'v> {
    value: &'v FormulaValue,
    height: usize,
    width: usize,
}

impl<'v> Table<'v> {
    fn new(value: &'v FormulaValue) -> Result<Self, CellError> {
        if let FormulaValue::Error(e) = value {
            return Err(*e);
        }
        let (height, width) = value.dimensions();
        Ok(Self { value, height, width })
    }

    fn get(&self, row: usize, col: usize) -> &'v FormulaValue {
        self.value.get(row, col).unwrap_or(&BLANK)
    }

    fn column(&self, col: usize) -> Vec<&'v FormulaValue> {
        let (used, _) = self.value.used_dimensions();
        (0..used).map(|row| self.get(row, col)).collect()
    }

    fn row(&self, row: usize) -> Vec<&'v FormulaValue> {
        let (_, used) = self.value.used_dimensions();
        (0..used).map(|col| self.get(row, col)).collect()
    }

    /// Element `index` counting row by row
    fn nth(&self, index: usize) -> Option<&'v FormulaValue> {
        (index < self.height * self.width).then(|| self.get(index / self.width, index % self.width))
    }

    fn column_value(&self, col: usize) -> FormulaValue {
        match self.value {
            FormulaValue::Range(range) => FormulaValue::Range(range.column(col)),
            _ => FormulaValue::Array((0..self.height).map(|row| vec![self.get(row, col).clone()]).collect()),
        }
    }

    fn row_value(&self, row: usize) -> FormulaValue {
        match self.value {
            FormulaValue::Range(range) => FormulaValue::Range(range.row(row)),
            _ => FormulaValue::Array(vec![(0..self.width).map(|col| self.get(row, col).clone()).collect()]),
        }
    }
}

fn range_lookup_mode(args: &[FormulaValue], index: usize) -> Result<MatchMode, CellError> {
    Ok(if opt_bool(args, index, true)? {
        MatchMode::Ascending
    } else {
        MatchMode::Exact
    })
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue]) -> FunctionResult {
    let key = lookup_key(&args[0])?;
    let table = Table::new(&args[1])?;
    let col_index = args[2].to_integer()?;
    let mode = range_lookup_mode(args, 3)?;

    if col_index < 1 {
        return Err(CellError::Value);
    }
    if col_index as usize > table.width {
        return Err(CellError::Ref);
    }

    let row = find_position(&key, &table.column(0), mode)?;
    Ok(table.get(row, col_index as usize - 1).clone())
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FormulaValue]) -> FunctionResult {
    let key = lookup_key(&args[0])?;
    let table = Table::new(&args[1])?;
    let row_index = args[2].to_integer()?;
    let mode = range_lookup_mode(args, 3)?;

    if row_index < 1 {
        return Err(CellError::Value);
    }
    if row_index as usize > table.height {
        return Err(CellError::Ref);
    }

    let col = find_position(&key, &table.row(0), mode)?;
    Ok(table.get(row_index as usize - 1, col).clone())
}

/// LOOKUP(lookup_value, lookup_vector, [result_vector])
///
/// Without a result vector the last column (or row, for a wide table) of
/// the lookup table supplies the result.
pub fn fn_lookup(args: &[FormulaValue]) -> FunctionResult {
    let key = lookup_key(&args[0])?;
    let table = Table::new(&args[1])?;
    let (height, width) = (table.height, table.width);
    if height == 0 || width == 0 {
        return Err(CellError::Na);
    }

    let by_column = height >= width;
    let vector = if by_column { table.column(0) } else { table.row(0) };
    let position = find_position(&key, &vector, MatchMode::Ascending)?;

    match args.get(2) {
        Some(result) => Table::new(result)?
            .nth(position)
            .cloned()
            .ok_or(CellError::Na),
        None if by_column => Ok(table.get(position, width - 1).clone()),
        None => Ok(table.get(height - 1, position).clone()),
    }
}

/// MATCH(lookup_value, lookup_array, [match_type])
pub fn fn_match(args: &[FormulaValue]) -> FunctionResult {
    let key = lookup_key(&args[0])?;
    let table = Table::new(&args[1])?;
    let mode = MatchMode::from_match_type(opt_integer(args, 2, 1)?);

    // MATCH expects a vector (single row or single column)
    let vector = match (table.height, table.width) {
        (0, _) | (_, 0) => return Err(CellError::Na),
        (1, _) => table.row(0),
        (_, 1) => table.column(0),
        _ => return Err(CellError::Na),
    };

    let position = find_position(&key, &vector, mode)?;
    Ok(FormulaValue::Number(Decimal::from(position + 1)))
}

/// INDEX(array, row_num, [column_num])
///
/// A zero row or column selects the whole column or row.
pub fn fn_index(args: &[FormulaValue]) -> FunctionResult {
    let table = Table::new(&args[0])?;
    let (height, width) = (table.height, table.width);
    if height == 0 || width == 0 {
        return Err(CellError::Ref);
    }

    let mut row_num = args[1].to_integer()?;
    let mut col_num = opt_integer(args, 2, 0)?;
    // INDEX(row_vector, n) picks the n-th column
    if args.len() == 2 && height == 1 {
        col_num = row_num;
        row_num = 1;
    } else if args.len() == 2 {
        col_num = if width == 1 { 1 } else { 0 };
    }

    if row_num < 0 || col_num < 0 {
        return Err(CellError::Value);
    }
    let (r, c) = (row_num as usize, col_num as usize);
    if r > height || c > width {
        return Err(CellError::Ref);
    }

    Ok(match (r, c) {
        (0, 0) => table.value.clone(),
        (0, c) => table.column_value(c - 1),
        (r, 0) => table.row_value(r - 1),
        (r, c) => table.get(r - 1, c - 1).clone(),
    })
}

/// ROWS(array)
pub fn fn_rows(args: &[FormulaValue]) -> FunctionResult {
    if let Some(e) = args[0].error() {
        return Err(e);
    }
    Ok(FormulaValue::Number(Decimal::from(args[0].dimensions().0)))
}

/// COLUMNS(array)
pub fn fn_columns(args: &[FormulaValue]) -> FunctionResult {
    if let Some(e) = args[0].error() {
        return Err(e);
    }
    Ok(FormulaValue::Number(Decimal::from(args[0].dimensions().1)))
}

/// CHOOSE(index_num, value1, [value2], ...); only the chosen value is evaluated
pub fn fn_choose(args: &[FormulaExpr], ctx: &dyn EvaluationContext) -> FunctionResult {
    let index = evaluate(&args[0], ctx).into_scalar().to_integer()?;
    let choices = &args[1..];
    if index < 1 || index as usize > choices.len() {
        return Err(CellError::Value);
    }
    Ok(evaluate(&choices[index as usize - 1], ctx))
}
