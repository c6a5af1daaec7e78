//! Defined names
//!
//! Names give meaningful labels to cells or tables so formulas can say
//! `=SidingSqft*BaseRate` instead of `=Inputs!$B$2*Rates!$B$3`.

use crate::cell::{split_sheet_prefix, CellAddress, CellRange, SheetCell};
use crate::error::{Error, Result};
use lazy_regex::regex_is_match;
use std::fmt;

/// What a defined name resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameTarget {
    /// A single cell: `Sheet1!$A$1`
    Cell(SheetCell),
    /// A rectangular range: `Rates!$A$2:$C$4`
    Range { sheet: String, range: CellRange },
}

impl NameTarget {
    /// Parse a sheet-qualified reference such as `Rates!$A$2:$C$4`
    pub fn parse(refers_to: &str) -> Result<Self> {
        let text = refers_to.trim();
        let text = text.strip_prefix('=').unwrap_or(text);
        let (sheet, rest) = split_sheet_prefix(text)?;
        let sheet = sheet.ok_or_else(|| {
            Error::InvalidName(format!("'{}' must name a sheet (Sheet!A1)", refers_to))
        })?;

        if rest.contains(':') {
            let range = CellRange::parse(rest)?;
            Ok(NameTarget::Range { sheet, range })
        } else {
            Ok(NameTarget::Cell(SheetCell::new(
                sheet,
                CellAddress::parse(rest)?,
            )))
        }
    }

    pub fn sheet(&self) -> &str {
        match self {
            NameTarget::Cell(cell) => &cell.sheet,
            NameTarget::Range { sheet, .. } => sheet,
        }
    }
}

impl fmt::Display for NameTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameTarget::Cell(cell) => write!(f, "{}", cell),
            NameTarget::Range { sheet, range } => {
                write!(f, "{}!{}", crate::cell::quote_sheet_name(sheet), range)
            }
        }
    }
}

/// A workbook-scoped defined name
///
/// Names are case-insensitive; lookups go through [`DefinedName::key`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    pub target: NameTarget,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: &str) -> Result<Self> {
        let name = name.into();
        if !Self::is_valid_name(&name) {
            return Err(Error::InvalidName(name));
        }
        let target = NameTarget::parse(refers_to)?;
        Ok(Self { name, target })
    }

    /// Uppercased lookup key
    pub fn key(&self) -> String {
        self.name.to_uppercase()
    }

    /// A name starts with a letter or underscore, continues with letters,
    /// digits, `_` or `.`, and must not read as a cell address or boolean.
    pub fn is_valid_name(name: &str) -> bool {
        if !regex_is_match!(r"^[A-Za-z_][A-Za-z0-9_.]*$", name) {
            return false;
        }
        if name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE") {
            return false;
        }
        CellAddress::parse(name).is_err()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_cell_target() {
        let name = DefinedName::new("SidingSqft", "Inputs!$B$2").unwrap();
        assert_eq!(
            name.target,
            NameTarget::Cell(SheetCell::new("Inputs", CellAddress::new(1, 1)))
        );
        assert_eq!(name.key(), "SIDINGSQFT");
    }

    #[test]
    fn test_parse_range_target() {
        let name = DefinedName::new("RateTable", "='Paint Rates'!$A$2:$C$4").unwrap();
        match &name.target {
            NameTarget::Range { sheet, range } => {
                assert_eq!(sheet, "Paint Rates");
                assert_eq!(range.row_count(), 3);
                assert_eq!(range.col_count(), 3);
            }
            other => panic!("expected range, got {other:?}"),
        }
        assert_eq!(name.target.to_string(), "'Paint Rates'!$A$2:$C$4");
    }

    #[test]
    fn test_invalid_names() {
        for bad in ["", "1abc", "A1", "xfd100", "TRUE", "has space", "dash-name"] {
            assert!(!DefinedName::is_valid_name(bad), "{bad} should be rejected");
        }
        for good in ["Rate", "_tmp", "Labor.Total", "ROOM_PREP", "ABC"] {
            assert!(DefinedName::is_valid_name(good), "{good} should be accepted");
        }
    }

    #[test]
    fn test_target_requires_sheet() {
        assert!(DefinedName::new("Rate", "$B$2").is_err());
        assert!(DefinedName::new("Rate", "Rates!B").is_err());
    }
}
