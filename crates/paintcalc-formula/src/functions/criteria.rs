//! Criteria matching for SUMIF, COUNTIF and AVERAGEIF
//!
//! A criterion can be:
//! - A number: matches equal numbers (e.g. `5`)
//! - A text string: case-insensitive match, with `*` and `?` wildcards
//! - An operator followed by an operand: `">5"`, `"<=10"`, `"<>0"`, `"=x"`,
//!   `"<>premium"`
//! - An empty string: matches empty cells; `"<>"` matches non-empty ones

use crate::value::{compare_text, parse_number, FormulaValue, BLANK};
use paintcalc_core::{CellError, Decimal};
use std::cmp::Ordering;

/// Criteria matcher for SUMIF/COUNTIF/AVERAGEIF
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaMatcher {
    op: ComparisonOp,
    operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Number(Decimal),
    /// Lowercased text, possibly with wildcards
    Text(String),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl ComparisonOp {
    fn holds(self, ordering: Ordering) -> bool {
        match self {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterEqual => ordering != Ordering::Less,
        }
    }
}

impl CriteriaMatcher {
    /// Create a new criteria matcher from a criterion value
    pub fn new(criteria: &FormulaValue) -> Self {
        match criteria {
            FormulaValue::Number(n) => Self::equal(Operand::Number(*n)),
            FormulaValue::Boolean(b) => Self::equal(Operand::Number(if *b { Decimal::ONE } else { Decimal::ZERO })),
            FormulaValue::Text(s) => Self::parse(s.as_str()),
            FormulaValue::Array(_) | FormulaValue::Range(_) => match criteria.get(0, 0) {
                Some(first) if !matches!(first, FormulaValue::Array(_) | FormulaValue::Range(_)) => {
                    Self::new(first)
                }
                _ => Self::equal(Operand::Empty),
            },
            FormulaValue::Empty | FormulaValue::Error(_) => Self::equal(Operand::Empty),
        }
    }

    fn equal(operand: Operand) -> Self {
        Self {
            op: ComparisonOp::Equal,
            operand,
        }
    }

    fn parse(s: &str) -> Self {
        // Longer operators first
        const OPERATORS: [(&str, ComparisonOp); 6] = [
            (">=", ComparisonOp::GreaterEqual),
            ("<=", ComparisonOp::LessEqual),
            ("<>", ComparisonOp::NotEqual),
            (">", ComparisonOp::GreaterThan),
            ("<", ComparisonOp::LessThan),
            ("=", ComparisonOp::Equal),
        ];

        let (op, rest) = OPERATORS
            .iter()
            .find_map(|(symbol, op)| s.strip_prefix(symbol).map(|rest| (*op, rest)))
            .unwrap_or((ComparisonOp::Equal, s));

        let operand = if rest.is_empty() {
            Operand::Empty
        } else if let Some(n) = parse_number(rest) {
            Operand::Number(n)
        } else {
            Operand::Text(rest.to_lowercase())
        };

        Self { op, operand }
    }

    /// Check if a value matches the criteria
    pub fn matches(&self, value: &FormulaValue) -> bool {
        match &self.operand {
            // Only real numbers match a numeric criterion; the text "5" does not
            Operand::Number(criteria_num) => match value {
                FormulaValue::Number(n) => self.op.holds(n.cmp(criteria_num)),
                _ => self.op == ComparisonOp::NotEqual && !value.is_error(),
            },

            Operand::Text(pattern) => match value {
                FormulaValue::Text(s) => match self.op {
                    ComparisonOp::Equal => wildcard_match(pattern, &s.as_str().to_lowercase()),
                    ComparisonOp::NotEqual => !wildcard_match(pattern, &s.as_str().to_lowercase()),
                    op => op.holds(compare_text(s.as_str(), pattern)),
                },
                FormulaValue::Error(_) => false,
                _ => self.op == ComparisonOp::NotEqual,
            },

            Operand::Empty => {
                let blank = match value {
                    FormulaValue::Empty => true,
                    FormulaValue::Text(s) => s.is_empty(),
                    _ => false,
                };
                match self.op {
                    ComparisonOp::Equal => blank,
                    ComparisonOp::NotEqual => !blank,
                    _ => false,
                }
            }
        }
    }
}

/// Visit the cells of `values` whose counterpart in `range` meets `matcher`
///
/// `values` is read at the offsets of `range`. Blank cells of `values` add
/// nothing, so only its non-blank cells are visited.
pub(crate) fn for_each_match(
    range: &FormulaValue,
    matcher: &CriteriaMatcher,
    values: &FormulaValue,
    mut visit: impl FnMut(&FormulaValue) -> Result<(), CellError>,
) -> Result<(), CellError> {
    let (rows, cols) = range.dimensions();
    for (r, c, value) in values.entries() {
        if r >= rows || c >= cols {
            continue;
        }
        if matcher.matches(range.get(r, c).unwrap_or(&BLANK)) {
            visit(value)?;
        }
    }
    Ok(())
}

/// Match with wildcards: `*` is any run of characters, `?` exactly one;
/// `~*` and `~?` match the literal characters
pub fn wildcard_match(pattern: &str, text: &str) -> bool {
    if !pattern.contains(['*', '?', '~']) {
        return pattern == text;
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Piece {
        Literal(char),
        AnyOne,
        AnyRun,
    }

    let mut pieces = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        pieces.push(match c {
            '~' if matches!(chars.peek(), Some('*' | '?' | '~')) => {
                Piece::Literal(chars.next().unwrap_or('~'))
            }
            '*' => Piece::AnyRun,
            '?' => Piece::AnyOne,
            c => Piece::Literal(c),
        });
    }
    let text: Vec<char> = text.chars().collect();

    // Greedy scan with backtracking to the last star
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;
    while ti < text.len() {
        match pieces.get(pi) {
            Some(Piece::AnyOne) => {
                pi += 1;
                ti += 1;
            }
            Some(Piece::Literal(c)) if *c == text[ti] => {
                pi += 1;
                ti += 1;
            }
            Some(Piece::AnyRun) => {
                star = Some((pi, ti));
                pi += 1;
            }
            _ => match star {
                Some((star_pi, star_ti)) => {
                    pi = star_pi + 1;
                    ti = star_ti + 1;
                    star = Some((star_pi, star_ti + 1));
                }
                None => return false,
            },
        }
    }

    pieces[pi..].iter().all(|p| *p == Piece::AnyRun)
}
