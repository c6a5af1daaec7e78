//! Workbook - the static model an estimate engine is compiled from

use crate::cell::SheetCell;
use crate::error::{Error, Result};
use crate::named_range::DefinedName;
use crate::sheet::{CellContent, Sheet};
use lazy_regex::regex_is_match;
use std::collections::BTreeMap;

/// Type constraint on an input field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    Number,
    Text,
    Boolean,
    /// One of a fixed set of labels, compared case-insensitively
    Choice(Vec<String>),
}

impl InputKind {
    pub fn name(&self) -> &'static str {
        match self {
            InputKind::Number => "number",
            InputKind::Text => "text",
            InputKind::Boolean => "boolean",
            InputKind::Choice(_) => "choice",
        }
    }
}

/// Binding from an external input field to the cell it seeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDecl {
    pub cell: SheetCell,
    pub kind: InputKind,
}

/// An independently priceable part of the estimate (e.g. exterior, interior)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionDecl {
    /// Cell holding the section's labor subtotal
    pub labor: SheetCell,
    /// Cell holding the section's material subtotal
    pub material: SheetCell,
}

/// A reported value surfaced in the calculation result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDecl {
    pub cell: SheetCell,
    /// Only evaluated when this section is priced
    pub section: Option<String>,
}

/// Workbook model: sheets plus the declarations that turn it into an estimator
///
/// Structural checks run as declarations are added; call [`Workbook::validate`]
/// once everything is in place to check cross references.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    name: String,
    version: String,
    sheets: Vec<Sheet>,
    names: BTreeMap<String, DefinedName>,
    inputs: BTreeMap<String, InputDecl>,
    sections: BTreeMap<String, SectionDecl>,
    outputs: BTreeMap<String, OutputDecl>,
}

impl Workbook {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// `name@version`, used to salt input fingerprints
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }

    // === Sheets ===

    pub fn add_sheet(&mut self, sheet: Sheet) -> Result<usize> {
        if self.sheet_index(sheet.name()).is_some() {
            return Err(Error::DuplicateSheetName(sheet.name().to_string()));
        }
        self.sheets.push(sheet);
        Ok(self.sheets.len() - 1)
    }

    /// Case-insensitive sheet lookup
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheet_index(name).map(|i| &self.sheets[i])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheet_index(name).map(move |i| &mut self.sheets[i])
    }

    pub fn sheet_at(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn cell(&self, cell: &SheetCell) -> Option<&CellContent> {
        self.sheet(&cell.sheet).and_then(|s| s.get(&cell.address))
    }

    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(Sheet::len).sum()
    }

    pub fn formula_count(&self) -> usize {
        self.sheets.iter().map(|s| s.formula_cells().count()).sum()
    }

    // === Defined names ===

    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        let defined = DefinedName::new(name, refers_to)?;
        let key = defined.key();
        if self.names.contains_key(&key) {
            return Err(Error::InvalidName(format!("'{}' is defined twice", name)));
        }
        self.names.insert(key, defined);
        Ok(())
    }

    /// Case-insensitive name lookup
    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.names.get(&name.to_uppercase())
    }

    pub fn defined_names(&self) -> impl Iterator<Item = &DefinedName> {
        self.names.values()
    }

    // === Estimator declarations ===

    pub fn declare_input(&mut self, field: &str, decl: InputDecl) -> Result<()> {
        if !Self::is_valid_field_name(field) {
            return Err(Error::InvalidInput {
                field: field.to_string(),
                reason: "field names are lowercase snake_case".into(),
            });
        }
        if let InputKind::Choice(options) = &decl.kind {
            if options.is_empty() {
                return Err(Error::InvalidInput {
                    field: field.to_string(),
                    reason: "choice needs at least one option".into(),
                });
            }
        }
        self.inputs.insert(field.to_string(), decl);
        Ok(())
    }

    pub fn declare_section(&mut self, name: &str, decl: SectionDecl) -> Result<()> {
        if !Self::is_valid_field_name(name) {
            return Err(Error::InvalidDeclaration {
                name: name.to_string(),
                reason: "section names are lowercase snake_case".into(),
            });
        }
        self.sections.insert(name.to_string(), decl);
        Ok(())
    }

    pub fn declare_output(&mut self, name: &str, decl: OutputDecl) -> Result<()> {
        if !Self::is_valid_field_name(name) {
            return Err(Error::InvalidDeclaration {
                name: name.to_string(),
                reason: "output names are lowercase snake_case".into(),
            });
        }
        self.outputs.insert(name.to_string(), decl);
        Ok(())
    }

    pub fn inputs(&self) -> &BTreeMap<String, InputDecl> {
        &self.inputs
    }

    pub fn sections(&self) -> &BTreeMap<String, SectionDecl> {
        &self.sections
    }

    pub fn outputs(&self) -> &BTreeMap<String, OutputDecl> {
        &self.outputs
    }

    pub fn is_valid_field_name(name: &str) -> bool {
        regex_is_match!(r"^[a-z][a-z0-9_]*$", name)
    }

    /// Check that every declaration points at an existing sheet and that
    /// inputs seed literal cells rather than formulas.
    pub fn validate(&self) -> Result<()> {
        for name in self.names.values() {
            if self.sheet(name.target.sheet()).is_none() {
                return Err(Error::InvalidName(format!(
                    "'{}' refers to unknown sheet '{}'",
                    name.name,
                    name.target.sheet()
                )));
            }
        }

        for (field, decl) in &self.inputs {
            let sheet = self.sheet(&decl.cell.sheet).ok_or_else(|| Error::InvalidInput {
                field: field.clone(),
                reason: format!("unknown sheet '{}'", decl.cell.sheet),
            })?;
            if matches!(sheet.get(&decl.cell.address), Some(CellContent::Formula(_))) {
                return Err(Error::InvalidInput {
                    field: field.clone(),
                    reason: format!("{} holds a formula", decl.cell),
                });
            }
        }

        let mut seeded: BTreeMap<&SheetCell, &str> = BTreeMap::new();
        for (field, decl) in &self.inputs {
            if let Some(other) = seeded.insert(&decl.cell, field) {
                return Err(Error::InvalidInput {
                    field: field.clone(),
                    reason: format!("{} is already bound to '{}'", decl.cell, other),
                });
            }
        }

        for (name, decl) in &self.sections {
            for cell in [&decl.labor, &decl.material] {
                if self.sheet(&cell.sheet).is_none() {
                    return Err(Error::InvalidDeclaration {
                        name: name.clone(),
                        reason: format!("unknown sheet '{}'", cell.sheet),
                    });
                }
            }
        }

        for (name, decl) in &self.outputs {
            if self.sheet(&decl.cell.sheet).is_none() {
                return Err(Error::InvalidDeclaration {
                    name: name.clone(),
                    reason: format!("unknown sheet '{}'", decl.cell.sheet),
                });
            }
            if let Some(section) = &decl.section {
                if !self.sections.contains_key(section) {
                    return Err(Error::InvalidDeclaration {
                        name: name.clone(),
                        reason: format!("unknown section '{}'", section),
                    });
                }
            }
        }

        Ok(())
    }
}
