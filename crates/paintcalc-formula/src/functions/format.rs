//! Number format codes for TEXT, FIXED and DOLLAR
//!
//! Supported codes cover what estimate sheets use: `General`, fixed places
//! (`0`, `0.00`, `0.##`), thousands grouping (`#,##0.00`), percent (`0%`)
//! and literal prefixes/suffixes (`$#,##0.00`, `0.0" sqft"`). A second
//! `;` section formats negative numbers.

use crate::numeric::round_half_away;
use crate::value::format_number;
use paintcalc_core::{CellError, Decimal};

/// One section of a format code
#[derive(Debug, Clone, PartialEq, Eq)]
struct Section {
    prefix: String,
    suffix: String,
    /// Minimum integer digits (count of `0` before the point)
    min_int_digits: usize,
    /// Decimal places that are always shown
    fixed_decimals: u32,
    /// Further decimal places shown only when non-zero
    optional_decimals: u32,
    thousands: bool,
    percent: bool,
}

/// A parsed format code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberFormat {
    positive: Option<Section>,
    negative: Option<Section>,
}

impl NumberFormat {
    /// `General`: plain number text
    pub fn general() -> Self {
        Self {
            positive: None,
            negative: None,
        }
    }

    /// Parse a format code; unsupported codes are `#VALUE!`
    pub fn parse(code: &str) -> Result<Self, CellError> {
        if code.is_empty() || code.eq_ignore_ascii_case("general") {
            return Ok(Self::general());
        }

        let mut sections = code.splitn(2, ';');
        let positive = sections.next().map(Section::parse).transpose()?;
        let negative = sections.next().map(Section::parse).transpose()?;
        Ok(Self { positive, negative })
    }

    pub fn format(&self, n: Decimal) -> Result<String, CellError> {
        let Some(positive) = &self.positive else {
            return Ok(format_number(n));
        };
        match &self.negative {
            Some(negative) if n.is_sign_negative() && !n.is_zero() => negative.render(n.abs()),
            _ => positive.render_signed(n),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Part {
    Prefix,
    Integer,
    Fraction,
    Suffix,
}

impl Section {
    fn parse(code: &str) -> Result<Self, CellError> {
        let mut section = Section {
            prefix: String::new(),
            suffix: String::new(),
            min_int_digits: 0,
            fixed_decimals: 0,
            optional_decimals: 0,
            thousands: false,
            percent: false,
        };
        let mut part = Part::Prefix;
        let mut chars = code.chars();

        while let Some(c) = chars.next() {
            match (c, part) {
                ('0' | '#', Part::Prefix | Part::Integer) => {
                    part = Part::Integer;
                    if c == '0' {
                        section.min_int_digits += 1;
                    }
                }
                (',', Part::Integer) => section.thousands = true,
                ('.', Part::Prefix | Part::Integer) => part = Part::Fraction,
                ('0', Part::Fraction) => {
                    if section.optional_decimals > 0 {
                        return Err(CellError::Value);
                    }
                    section.fixed_decimals += 1;
                }
                ('#', Part::Fraction) => section.optional_decimals += 1,
                ('0' | '#' | ',' | '.', _) => return Err(CellError::Value),
                ('"', _) => {
                    for quoted in chars.by_ref().take_while(|&q| q != '"') {
                        section.literal(&mut part, quoted);
                    }
                }
                ('\\', _) => {
                    if let Some(escaped) = chars.next() {
                        section.literal(&mut part, escaped);
                    }
                }
                ('%', _) => {
                    section.percent = true;
                    section.literal(&mut part, '%');
                }
                (c, _) => section.literal(&mut part, c),
            }
        }

        // A code needs at least one digit placeholder
        if part == Part::Prefix {
            return Err(CellError::Value);
        }
        Ok(section)
    }

    fn literal(&mut self, part: &mut Part, c: char) {
        if *part == Part::Prefix {
            self.prefix.push(c);
        } else {
            *part = Part::Suffix;
            self.suffix.push(c);
        }
    }

    fn render_signed(&self, n: Decimal) -> Result<String, CellError> {
        let body = self.render(n.abs())?;
        // The sign goes in front of any prefix: -$1,234.50
        if n.is_sign_negative() && body.chars().any(|c| c.is_ascii_digit() && c != '0') {
            Ok(format!("-{}", body))
        } else {
            Ok(body)
        }
    }

    fn render(&self, n: Decimal) -> Result<String, CellError> {
        let scaled = if self.percent {
            n.checked_mul(Decimal::ONE_HUNDRED).ok_or(CellError::Num)?
        } else {
            n
        };
        let places = self.fixed_decimals + self.optional_decimals;
        let rounded = round_half_away(scaled, places as i64)?;
        let digits = format!("{:.*}", places as usize, rounded);

        let (int_part, frac_part) = match digits.split_once('.') {
            Some((i, f)) => (i.to_string(), f.to_string()),
            None => (digits.clone(), String::new()),
        };

        let mut int_part = int_part.trim_start_matches('0').to_string();
        while int_part.len() < self.min_int_digits {
            int_part.insert(0, '0');
        }
        if self.thousands {
            int_part = group_thousands(&int_part);
        }

        let mut frac_part = frac_part;
        while frac_part.len() > self.fixed_decimals as usize && frac_part.ends_with('0') {
            frac_part.pop();
        }

        let mut out = String::with_capacity(self.prefix.len() + int_part.len() + frac_part.len() + 8);
        out.push_str(&self.prefix);
        out.push_str(&int_part);
        if !frac_part.is_empty() {
            out.push('.');
            out.push_str(&frac_part);
        }
        out.push_str(&self.suffix);
        Ok(out)
    }
}

/// Insert `,` every three digits from the right
pub fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Fixed-point text with `decimals` places, as FIXED and DOLLAR produce
///
/// Negative `decimals` round to the left of the point.
pub fn format_fixed(n: Decimal, decimals: i64, thousands: bool) -> Result<String, CellError> {
    let decimals = decimals.clamp(-28, 28);
    let rounded = round_half_away(n, decimals)?;
    let places = decimals.max(0) as usize;
    let digits = format!("{:.*}", places, rounded.abs());
    let (int_part, frac_part) = match digits.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (digits.as_str(), None),
    };

    let mut out = String::new();
    if rounded.is_sign_negative() && !rounded.is_zero() {
        out.push('-');
    }
    if thousands {
        out.push_str(&group_thousands(int_part));
    } else {
        out.push_str(int_part);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn fmt(code: &str, n: Decimal) -> String {
        NumberFormat::parse(code).and_then(|f| f.format(n)).unwrap()
    }

    #[test]
    fn test_fixed_places() {
        assert_eq!(fmt("0", dec!(2.5)), "3");
        assert_eq!(fmt("0.00", dec!(5777.777)), "5777.78");
        assert_eq!(fmt("0.00", dec!(-0.004)), "0.00");
        assert_eq!(fmt("000", dec!(7)), "007");
    }

    #[test]
    fn test_optional_places() {
        assert_eq!(fmt("0.##", dec!(2.5)), "2.5");
        assert_eq!(fmt("0.##", dec!(2)), "2");
        assert_eq!(fmt("0.0#", dec!(1.234)), "1.23");
    }

    #[test]
    fn test_thousands_and_currency() {
        assert_eq!(fmt("#,##0", dec!(1234567)), "1,234,567");
        assert_eq!(fmt("$#,##0.00", dec!(1234.5)), "$1,234.50");
        assert_eq!(fmt("$#,##0.00", dec!(-1234.5)), "-$1,234.50");
        assert_eq!(fmt("$#,##0.00;($#,##0.00)", dec!(-1234.5)), "($1,234.50)");
    }

    #[test]
    fn test_percent_and_literals() {
        assert_eq!(fmt("0%", dec!(0.45)), "45%");
        assert_eq!(fmt("0.0%", dec!(0.1234)), "12.3%");
        assert_eq!(fmt("0.0\" sqft\"", dec!(412.25)), "412.3 sqft");
    }

    #[test]
    fn test_general_and_invalid() {
        assert_eq!(fmt("General", dec!(1.50)), "1.5");
        assert_eq!(NumberFormat::parse("abc"), Err(CellError::Value));
        assert_eq!(NumberFormat::parse("0.#0"), Err(CellError::Value));
    }

    #[test]
    fn test_format_fixed() {
        assert_eq!(format_fixed(dec!(1234.567), 2, true).unwrap(), "1,234.57");
        assert_eq!(format_fixed(dec!(-1234.567), 1, false).unwrap(), "-1234.6");
        assert_eq!(format_fixed(dec!(1250), -2, true).unwrap(), "1,300");
        assert_eq!(format_fixed(dec!(0.4), 0, true).unwrap(), "0");
    }
}
