//! Values produced while evaluating a formula

use paintcalc_core::{CellError, CellValue, Decimal, SharedString};
use rust_decimal::prelude::ToPrimitive;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Blank cell of a range, for lookups that hand out references
pub(crate) static BLANK: FormulaValue = FormulaValue::Empty;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(Decimal),
    Text(SharedString),
    Boolean(bool),
    Error(CellError),
    /// Rows of values from an array constant or a function result
    Array(Vec<Vec<FormulaValue>>),
    /// Cells of a referenced range; only the non-blank ones are stored
    Range(RangeValue),
    Empty,
}

/// A rectangular block of cells, stored sparsely
///
/// Memory follows the populated cells, not the area, so `A1:A1048576` costs
/// no more than the handful of cells it actually holds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeValue {
    rows: usize,
    cols: usize,
    /// Keyed by (row, col) offset, so iteration is row-major
    cells: BTreeMap<(usize, usize), FormulaValue>,
}

impl RangeValue {
    /// An all-blank range of the given shape
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: BTreeMap::new(),
        }
    }

    /// Set the cell at a 0-based offset; blanks and offsets outside the
    /// range are not stored
    pub fn insert(&mut self, row: usize, col: usize, value: FormulaValue) {
        if row < self.rows && col < self.cols && !value.is_empty() {
            self.cells.insert((row, col), value);
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn area(&self) -> u64 {
        self.rows as u64 * self.cols as u64
    }

    /// Number of non-blank cells
    pub fn populated(&self) -> usize {
        self.cells.len()
    }

    pub fn blank_count(&self) -> u64 {
        self.area() - self.cells.len() as u64
    }

    /// Cell at a 0-based offset: `None` outside the range, `Empty` for a blank
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.cells.get(&(row, col)).unwrap_or(&BLANK))
    }

    /// Non-blank cells with their offsets, row by row
    pub fn entries(&self) -> impl Iterator<Item = (usize, usize, &FormulaValue)> + '_ {
        self.cells.iter().map(|(&(row, col), value)| (row, col, value))
    }

    /// Rows and columns up to the last non-blank cell in each direction
    pub fn used_dimensions(&self) -> (usize, usize) {
        self.cells
            .keys()
            .fold((0, 0), |(rows, cols), &(r, c)| (rows.max(r + 1), cols.max(c + 1)))
    }

    /// One row as a 1 x cols range
    pub fn row(&self, row: usize) -> RangeValue {
        let mut out = RangeValue::new(1, self.cols);
        for (&(_, c), value) in self.cells.range((row, 0)..=(row, usize::MAX)) {
            out.cells.insert((0, c), value.clone());
        }
        out
    }

    /// One column as a rows x 1 range
    pub fn column(&self, col: usize) -> RangeValue {
        let mut out = RangeValue::new(self.rows, 1);
        for (&(r, c), value) in &self.cells {
            if c == col {
                out.cells.insert((r, 0), value.clone());
            }
        }
        out
    }
}

impl FormulaValue {
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        FormulaValue::Text(SharedString::new(s))
    }

    pub fn number(n: impl Into<Decimal>) -> Self {
        FormulaValue::Number(n.into())
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    /// Get the error if this is one
    pub fn error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, FormulaValue::Empty)
    }

    /// A 1x1 array collapses to its only value; other values are unchanged
    pub fn into_scalar(self) -> FormulaValue {
        match self {
            FormulaValue::Array(mut rows) if rows.len() == 1 && rows[0].len() == 1 => {
                rows[0].pop().unwrap_or(FormulaValue::Empty)
            }
            FormulaValue::Range(range) if range.dimensions() == (1, 1) => {
                range.get(0, 0).cloned().unwrap_or(FormulaValue::Empty)
            }
            other => other,
        }
    }

    /// Coerce to a number the way arithmetic operators do
    ///
    /// Booleans are 0/1, empty is 0 and numeric text is parsed. Anything
    /// else is `#VALUE!`.
    pub fn to_number(&self) -> Result<Decimal, CellError> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Boolean(b) => Ok(if *b { Decimal::ONE } else { Decimal::ZERO }),
            FormulaValue::Empty => Ok(Decimal::ZERO),
            FormulaValue::Text(s) => parse_number(s.as_str()).ok_or(CellError::Value),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Array(rows) => match rows.first().and_then(|r| r.first()) {
                Some(first) if rows.len() == 1 && rows[0].len() == 1 => first.to_number(),
                _ => Err(CellError::Value),
            },
            FormulaValue::Range(range) => match range.get(0, 0) {
                Some(first) if range.dimensions() == (1, 1) => first.to_number(),
                _ => Err(CellError::Value),
            },
        }
    }

    /// Integer argument, truncated toward zero
    pub fn to_integer(&self) -> Result<i64, CellError> {
        let n = self.to_number()?;
        n.trunc().to_i64().ok_or(CellError::Num)
    }

    /// Coerce to a boolean the way conditions do
    pub fn to_bool(&self) -> Result<bool, CellError> {
        match self {
            FormulaValue::Boolean(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(!n.is_zero()),
            FormulaValue::Empty => Ok(false),
            FormulaValue::Text(s) => {
                if s.as_str().eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.as_str().eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(CellError::Value)
                }
            }
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Array(_) | FormulaValue::Range(_) => match self.get(0, 0) {
                Some(first) => first.to_bool(),
                None => Err(CellError::Value),
            },
        }
    }

    /// Convert to display text, as `&` and the text functions see it
    pub fn to_text(&self) -> String {
        match self {
            FormulaValue::Number(n) => format_number(*n),
            FormulaValue::Text(s) => s.to_string(),
            FormulaValue::Boolean(true) => "TRUE".to_string(),
            FormulaValue::Boolean(false) => "FALSE".to_string(),
            FormulaValue::Error(e) => e.to_string(),
            FormulaValue::Empty => String::new(),
            FormulaValue::Array(_) | FormulaValue::Range(_) => self
                .get(0, 0)
                .map(FormulaValue::to_text)
                .unwrap_or_default(),
        }
    }

    /// Elements with their (row, col) offsets, row by row
    ///
    /// Arrays yield every element, ranges only their non-blank cells and a
    /// scalar yields itself at (0, 0).
    pub fn entries(&self) -> Box<dyn Iterator<Item = (usize, usize, &FormulaValue)> + '_> {
        match self {
            FormulaValue::Array(rows) => Box::new(rows.iter().enumerate().flat_map(|(r, row)| {
                row.iter().enumerate().map(move |(c, value)| (r, c, value))
            })),
            FormulaValue::Range(range) => Box::new(range.entries()),
            other => Box::new(std::iter::once((0, 0, other))),
        }
    }

    /// Every scalar in this value, in the order of [`FormulaValue::entries`]
    ///
    /// Blank cells of a range are skipped; [`FormulaValue::skipped_blanks`]
    /// counts them.
    pub fn flat(&self) -> Box<dyn Iterator<Item = &FormulaValue> + '_> {
        Box::new(self.entries().map(|(_, _, value)| value))
    }

    /// Blank cells that [`FormulaValue::flat`] does not yield
    pub fn skipped_blanks(&self) -> u64 {
        match self {
            FormulaValue::Range(range) => range.blank_count(),
            _ => 0,
        }
    }

    /// Rows and columns of this value; scalars are 1x1
    pub fn dimensions(&self) -> (usize, usize) {
        match self {
            FormulaValue::Array(rows) => (rows.len(), rows.first().map_or(0, Vec::len)),
            FormulaValue::Range(range) => range.dimensions(),
            _ => (1, 1),
        }
    }

    /// Rows and columns that can hold anything but a blank
    ///
    /// Ranges are cut at their last non-blank row and column; other values
    /// keep their full dimensions.
    pub fn used_dimensions(&self) -> (usize, usize) {
        match self {
            FormulaValue::Range(range) => range.used_dimensions(),
            other => other.dimensions(),
        }
    }

    /// Element at (row, col), both 0-based
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        match self {
            FormulaValue::Array(rows) => rows.get(row).and_then(|r| r.get(col)),
            FormulaValue::Range(range) => range.get(row, col),
            other if row == 0 && col == 0 => Some(other),
            _ => None,
        }
    }
}

/// Numbers render without trailing zeros
pub fn format_number(n: Decimal) -> String {
    n.normalize().to_string()
}

/// Parse numeric text: surrounding spaces, a leading sign and scientific
/// notation are accepted
pub fn parse_number(text: &str) -> Option<Decimal> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    Decimal::from_str(text)
        .ok()
        .or_else(|| Decimal::from_scientific(text).ok())
}

/// Compare two values for ordering
///
/// Numbers sort before text, text before booleans. Text compares
/// case-insensitively. An empty value takes the zero of the other side's
/// type (0, "" or FALSE).
pub fn compare_values(left: &FormulaValue, right: &FormulaValue) -> Ordering {
    use FormulaValue::*;

    fn rank(v: &FormulaValue) -> u8 {
        match v {
            Number(_) | Empty => 0,
            Text(_) => 1,
            Boolean(_) => 2,
            Error(_) => 3,
            Array(_) | Range(_) => 4,
        }
    }

    let empty_as = |other: &FormulaValue| match other {
        Text(_) => Text(SharedString::new("")),
        Boolean(_) => Boolean(false),
        _ => Number(Decimal::ZERO),
    };

    match (left, right) {
        (Array(_) | Range(_), _) | (_, Array(_) | Range(_)) => {
            let l = left.get(0, 0).cloned().unwrap_or(Empty);
            let r = right.get(0, 0).cloned().unwrap_or(Empty);
            if matches!(l, Array(_) | Range(_)) || matches!(r, Array(_) | Range(_)) {
                return Ordering::Equal;
            }
            compare_values(&l, &r)
        }
        (Empty, Empty) => Ordering::Equal,
        (Empty, other) => compare_values(&empty_as(other), other),
        (other, Empty) => compare_values(other, &empty_as(other)),
        (Number(l), Number(r)) => l.cmp(r),
        (Text(l), Text(r)) => compare_text(l.as_str(), r.as_str()),
        (Boolean(l), Boolean(r)) => l.cmp(r),
        (Error(l), Error(r)) => l.code().cmp(&r.code()),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Case-insensitive text ordering
pub fn compare_text(left: &str, right: &str) -> Ordering {
    left.to_lowercase().cmp(&right.to_lowercase())
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Number(n) => FormulaValue::Number(n),
            CellValue::Text(s) => FormulaValue::Text(s),
            CellValue::Boolean(b) => FormulaValue::Boolean(b),
            CellValue::Error(e) => FormulaValue::Error(e),
        }
    }
}

impl From<&CellValue> for FormulaValue {
    fn from(value: &CellValue) -> Self {
        value.clone().into()
    }
}

/// Arrays larger than 1x1 cannot live in one cell and become `#VALUE!`
impl From<FormulaValue> for CellValue {
    fn from(value: FormulaValue) -> Self {
        match value.into_scalar() {
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::Text(s) => CellValue::Text(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Array(_) | FormulaValue::Range(_) => CellValue::Error(CellError::Value),
        }
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<Decimal> for FormulaValue {
    fn from(n: Decimal) -> Self {
        FormulaValue::Number(n)
    }
}

/// `Ok(n)` is a number, `Err(e)` an error value
impl From<Result<Decimal, CellError>> for FormulaValue {
    fn from(result: Result<Decimal, CellError>) -> Self {
        match result {
            Ok(n) => FormulaValue::Number(n),
            Err(e) => FormulaValue::Error(e),
        }
    }
}
