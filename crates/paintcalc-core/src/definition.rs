//! JSON workbook definitions
//!
//! ```json
//! {
//!   "name": "exterior-estimator",
//!   "version": "3.20",
//!   "sheets": [{ "name": "Inputs", "cells": { "B2": 0, "C2": "=B2*1.2" } }],
//!   "names": { "Sqft": "Inputs!$B$2" },
//!   "inputs": { "siding_sqft": { "cell": "Inputs!B2", "kind": "number" } },
//!   "sections": { "exterior": { "labor": "Inputs!D2", "material": "Inputs!E2" } },
//!   "outputs": { "gallons": { "cell": "Inputs!F2", "section": "exterior" } }
//! }
//! ```
//!
//! Cell values: numbers are exact decimals, strings starting with `=` are
//! formulas, a leading `'` forces text, error literals (`#N/A`) are errors,
//! booleans are booleans and `null` is an empty cell.

use crate::cell::{CellAddress, CellError, CellValue, SheetCell};
use crate::error::{Error, Result};
use crate::sheet::{CellContent, Sheet};
use crate::workbook::{InputDecl, InputKind, OutputDecl, SectionDecl, Workbook};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkbookDef {
    name: String,
    version: String,
    sheets: Vec<SheetDef>,
    #[serde(default)]
    names: BTreeMap<String, String>,
    #[serde(default)]
    inputs: BTreeMap<String, InputDef>,
    #[serde(default)]
    sections: BTreeMap<String, SectionDef>,
    #[serde(default)]
    outputs: BTreeMap<String, OutputDef>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SheetDef {
    name: String,
    #[serde(default)]
    cells: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputDef {
    cell: String,
    kind: KindDef,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum KindDef {
    Number,
    Text,
    Boolean,
    Choice(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SectionDef {
    labor: String,
    material: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct OutputDef {
    cell: String,
    #[serde(default)]
    section: Option<String>,
}

impl Workbook {
    /// Load and validate a workbook from its JSON definition
    pub fn from_json_str(json: &str) -> Result<Self> {
        let def: WorkbookDef = serde_json::from_str(json)?;
        def.into_workbook()
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let def: WorkbookDef = serde_json::from_reader(reader)?;
        def.into_workbook()
    }
}

impl WorkbookDef {
    fn into_workbook(self) -> Result<Workbook> {
        let mut workbook = Workbook::new(self.name, self.version);

        for sheet_def in self.sheets {
            let mut sheet = Sheet::new(sheet_def.name)?;
            for (address, raw) in &sheet_def.cells {
                let addr = CellAddress::parse(address)?;
                let content = cell_content(raw).map_err(|reason| Error::InvalidCellContent {
                    cell: format!("{}!{}", sheet.name(), address),
                    reason,
                })?;
                sheet.set(addr, content);
            }
            workbook.add_sheet(sheet)?;
        }

        for (name, refers_to) in &self.names {
            workbook.define_name(name, refers_to)?;
        }

        for (field, input) in self.inputs {
            let cell = SheetCell::parse(&input.cell).map_err(|e| Error::InvalidInput {
                field: field.clone(),
                reason: e.to_string(),
            })?;
            let kind = match input.kind {
                KindDef::Number => InputKind::Number,
                KindDef::Text => InputKind::Text,
                KindDef::Boolean => InputKind::Boolean,
                KindDef::Choice(options) => InputKind::Choice(options),
            };
            workbook.declare_input(&field, InputDecl { cell, kind })?;
        }

        for (name, section) in self.sections {
            let parse = |s: &str| {
                SheetCell::parse(s).map_err(|e| Error::InvalidDeclaration {
                    name: name.clone(),
                    reason: e.to_string(),
                })
            };
            let decl = SectionDecl {
                labor: parse(&section.labor)?,
                material: parse(&section.material)?,
            };
            workbook.declare_section(&name, decl)?;
        }

        for (name, output) in self.outputs {
            let cell = SheetCell::parse(&output.cell).map_err(|e| Error::InvalidDeclaration {
                name: name.clone(),
                reason: e.to_string(),
            })?;
            let decl = OutputDecl {
                cell,
                section: output.section,
            };
            workbook.declare_output(&name, decl)?;
        }

        workbook.validate()?;
        Ok(workbook)
    }
}

fn cell_content(raw: &serde_json::Value) -> std::result::Result<CellContent, String> {
    use serde_json::Value;

    let value = match raw {
        Value::Null => CellValue::Empty,
        Value::Bool(b) => CellValue::Boolean(*b),
        Value::Number(n) => CellValue::Number(parse_decimal(&n.to_string())?),
        Value::String(s) => {
            if let Some(formula) = s.strip_prefix('=') {
                return Ok(CellContent::Formula(formula.to_string()));
            }
            if let Some(text) = s.strip_prefix('\'') {
                CellValue::text(text)
            } else if let Some(err) = CellError::parse(s) {
                CellValue::Error(err)
            } else {
                CellValue::text(s)
            }
        }
        Value::Array(_) | Value::Object(_) => {
            return Err("expected a number, string, boolean or null".into())
        }
    };
    Ok(CellContent::Value(value))
}

/// Exact decimal from JSON number text (`1.2`, `-3`, `2.5e3`)
pub fn parse_decimal(text: &str) -> std::result::Result<Decimal, String> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| format!("'{}' is not representable as a decimal: {}", text, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r##"{
        "name": "demo",
        "version": "2",
        "sheets": [
            { "name": "Inputs", "cells": { "B2": 0, "B3": "standard", "B4": true } },
            { "name": "Calc", "cells": {
                "A1": "=Inputs!B2*1.2",
                "A2": 0.30,
                "A3": "'=not a formula",
                "A4": "#N/A",
                "A5": null,
                "A6": 2.5e3
            } }
        ],
        "names": { "Sqft": "Inputs!$B$2" },
        "inputs": {
            "sqft": { "cell": "Inputs!B2", "kind": "number" },
            "quality": { "cell": "Inputs!B3", "kind": { "choice": ["economy", "standard", "premium"] } }
        },
        "sections": { "exterior": { "labor": "Calc!A1", "material": "Calc!A2" } },
        "outputs": { "prep": { "cell": "Calc!A2", "section": "exterior" } }
    }"##;

    #[test]
    fn test_load_definition() {
        let wb = Workbook::from_json_str(SAMPLE).unwrap();
        assert_eq!(wb.identity(), "demo@2");
        assert_eq!(wb.sheets().len(), 2);
        assert_eq!(wb.formula_count(), 1);

        let calc = wb.sheet("Calc").unwrap();
        assert_eq!(
            calc.get_str("A1"),
            Some(&CellContent::Formula("Inputs!B2*1.2".into()))
        );
        assert_eq!(
            calc.get_str("A2"),
            Some(&CellContent::Value(CellValue::Number(dec!(0.3))))
        );
        assert_eq!(
            calc.get_str("A3"),
            Some(&CellContent::Value(CellValue::text("=not a formula")))
        );
        assert_eq!(
            calc.get_str("A4"),
            Some(&CellContent::Value(CellValue::Error(CellError::Na)))
        );
        assert_eq!(calc.get_str("A5"), Some(&CellContent::Value(CellValue::Empty)));
        assert_eq!(
            calc.get_str("A6"),
            Some(&CellContent::Value(CellValue::Number(dec!(2500))))
        );

        let quality = &wb.inputs()["quality"];
        assert_eq!(
            quality.kind,
            InputKind::Choice(vec!["economy".into(), "standard".into(), "premium".into()])
        );
        assert_eq!(wb.outputs()["prep"].section.as_deref(), Some("exterior"));
    }

    #[test]
    fn test_rejects_nested_cell_values() {
        let json = r#"{ "name": "x", "version": "1",
            "sheets": [{ "name": "S", "cells": { "A1": [1, 2] } }] }"#;
        let err = Workbook::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::InvalidCellContent { .. }), "{err}");
    }

    #[test]
    fn test_rejects_unknown_keys() {
        let json = r#"{ "name": "x", "version": "1", "sheets": [], "macros": [] }"#;
        assert!(matches!(
            Workbook::from_json_str(json),
            Err(Error::Definition(_))
        ));
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("0.45").unwrap(), dec!(0.45));
        assert_eq!(parse_decimal("1e2").unwrap(), dec!(100));
        assert!(parse_decimal("abc").is_err());
    }
}
