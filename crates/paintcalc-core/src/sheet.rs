//! Sheet - a named, ordered collection of cells

use crate::cell::{CellAddress, CellRange, CellValue};
use crate::error::{Error, Result};
use crate::MAX_SHEET_NAME_LEN;
use std::collections::BTreeMap;

/// What a defined cell holds before any evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    /// Literal value (number, text, boolean, error or empty)
    Value(CellValue),
    /// Formula source text, without the leading `=`
    Formula(String),
}

impl CellContent {
    pub fn is_formula(&self) -> bool {
        matches!(self, CellContent::Formula(_))
    }

    pub fn formula_text(&self) -> Option<&str> {
        match self {
            CellContent::Formula(text) => Some(text),
            CellContent::Value(_) => None,
        }
    }
}

/// A sheet in the workbook model
///
/// Cells are kept ordered by row, then column.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<CellAddress, CellContent>,
}

impl Sheet {
    /// Create an empty sheet, validating its name
    pub fn new<S: Into<String>>(name: S) -> Result<Self> {
        let name = name.into();
        Self::validate_name(&name)?;
        Ok(Self {
            name,
            cells: BTreeMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sheet names are 1-31 characters and must not contain `[]:*?/\`
    pub fn validate_name(name: &str) -> Result<()> {
        if name.trim().is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
            return Err(Error::InvalidSheetName(name.to_string()));
        }
        if name.contains(['[', ']', ':', '*', '?', '/', '\\']) || name.starts_with('\'') {
            return Err(Error::InvalidSheetName(name.to_string()));
        }
        Ok(())
    }

    /// Set a cell's content. Absolute markers on the address are ignored.
    pub fn set(&mut self, address: CellAddress, content: CellContent) {
        self.cells.insert(address.position(), content);
    }

    pub fn set_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set(addr, CellContent::Value(value.into()));
        Ok(())
    }

    /// Set a formula; a leading `=` is accepted and stripped
    pub fn set_formula(&mut self, address: &str, formula: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        let text = formula.trim();
        let text = text.strip_prefix('=').unwrap_or(text);
        self.set(addr, CellContent::Formula(text.to_string()));
        Ok(())
    }

    pub fn get(&self, address: &CellAddress) -> Option<&CellContent> {
        self.cells.get(&address.position())
    }

    /// Lookup by A1 string; unparseable addresses read as undefined
    pub fn get_str(&self, address: &str) -> Option<&CellContent> {
        CellAddress::parse(address)
            .ok()
            .and_then(|addr| self.get(&addr))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// All defined cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (&CellAddress, &CellContent)> {
        self.cells.iter()
    }

    /// Formula cells with their source text
    pub fn formula_cells(&self) -> impl Iterator<Item = (&CellAddress, &str)> {
        self.cells
            .iter()
            .filter_map(|(addr, content)| content.formula_text().map(|text| (addr, text)))
    }

    /// Defined cells inside `range`, row-major
    pub fn cells_in(&self, range: &CellRange) -> impl Iterator<Item = (&CellAddress, &CellContent)> {
        let lo = CellAddress::new(range.start.row, 0);
        let hi = CellAddress::new(range.end.row, u16::MAX);
        let range = *range;
        self.cells
            .range(lo..=hi)
            .filter(move |(addr, _)| range.contains(addr))
    }

    /// Smallest range covering every defined cell
    pub fn used_range(&self) -> Option<CellRange> {
        let mut iter = self.cells.keys();
        let first = iter.next()?;
        let (mut min_col, mut max_col) = (first.col, first.col);
        let mut max_row = first.row;
        for addr in iter {
            min_col = min_col.min(addr.col);
            max_col = max_col.max(addr.col);
            max_row = max_row.max(addr.row);
        }
        Some(CellRange::from_indices(first.row, min_col, max_row, max_col))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cells_are_row_major() {
        let mut sheet = Sheet::new("Exterior").unwrap();
        sheet.set_value("B2", 2i64).unwrap();
        sheet.set_formula("A3", "=B2*2").unwrap();
        sheet.set_value("C1", "label").unwrap();

        let order: Vec<String> = sheet.cells().map(|(a, _)| a.to_string()).collect();
        assert_eq!(order, vec!["C1", "B2", "A3"]);
        assert_eq!(sheet.get_str("A3").and_then(|c| c.formula_text()), Some("B2*2"));
        assert_eq!(sheet.get_str("$B$2"), Some(&CellContent::Value(CellValue::from(2i64))));
    }

    #[test]
    fn test_cells_in_range() {
        let mut sheet = Sheet::new("Rates").unwrap();
        for addr in ["A1", "A2", "B2", "C2", "A5", "D3"] {
            sheet.set_value(addr, 1i64).unwrap();
        }
        let range = CellRange::parse("A2:C4").unwrap();
        let inside: Vec<String> = sheet.cells_in(&range).map(|(a, _)| a.to_string()).collect();
        assert_eq!(inside, vec!["A2", "B2", "C2"]);
        assert_eq!(sheet.used_range().unwrap().to_string(), "A1:D5");
    }

    #[test]
    fn test_sheet_name_validation() {
        assert!(Sheet::new("Interior Walls").is_ok());
        for bad in ["", "   ", "a/b", "rates?", "'quoted", "this name is far too long for a sheet"] {
            assert!(Sheet::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }
}
