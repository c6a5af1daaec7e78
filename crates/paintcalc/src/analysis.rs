//! Formula analysis: what kinds of formulas a workbook holds and which are
//! the most involved

use lazy_regex::regex_is_match;
use paintcalc_core::{SheetCell, Workbook};
use paintcalc_formula::parse_formula;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Formula category, by the first matching group of functions called
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FormulaCategory {
    Financial,
    Lookup,
    Statistical,
    Math,
    Logical,
    Text,
    /// Operators over numbers and references only
    Arithmetic,
    Other,
}

impl FormulaCategory {
    pub const ALL: [FormulaCategory; 8] = [
        FormulaCategory::Financial,
        FormulaCategory::Lookup,
        FormulaCategory::Statistical,
        FormulaCategory::Math,
        FormulaCategory::Logical,
        FormulaCategory::Text,
        FormulaCategory::Arithmetic,
        FormulaCategory::Other,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FormulaCategory::Financial => "Financial",
            FormulaCategory::Lookup => "Lookup",
            FormulaCategory::Statistical => "Statistical",
            FormulaCategory::Math => "Math",
            FormulaCategory::Logical => "Logical",
            FormulaCategory::Text => "Text",
            FormulaCategory::Arithmetic => "Arithmetic",
            FormulaCategory::Other => "Other",
        }
    }

    fn functions(&self) -> &'static [&'static str] {
        match self {
            FormulaCategory::Financial => &["PMT", "PV", "FV", "RATE", "NPV", "IRR"],
            FormulaCategory::Lookup => &["VLOOKUP", "HLOOKUP", "INDEX", "MATCH", "XLOOKUP"],
            FormulaCategory::Statistical => &["AVERAGE", "STDEV", "VAR", "MEDIAN", "MODE"],
            FormulaCategory::Math => &["SUM", "PRODUCT", "SQRT", "POWER", "LOG"],
            FormulaCategory::Logical => &["IF", "AND", "OR", "NOT", "XOR"],
            FormulaCategory::Text => &["CONCATENATE", "LEFT", "RIGHT", "MID", "LEN"],
            FormulaCategory::Arithmetic | FormulaCategory::Other => &[],
        }
    }
}

impl fmt::Display for FormulaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Categorize formula text (with or without the leading `=`)
pub fn categorize(formula: &str) -> FormulaCategory {
    let called: Vec<String> = match parse_formula(formula) {
        Ok(ast) => ast.function_names().into_iter().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    };

    for category in FormulaCategory::ALL {
        if category
            .functions()
            .iter()
            .any(|f| called.iter().any(|c| c.eq_ignore_ascii_case(f)))
        {
            return category;
        }
    }

    let upper = formula.to_uppercase();
    if called.is_empty() && regex_is_match!(r"^=?[+\-*/()\d\s.$A-Z!:]+$", &upper) {
        FormulaCategory::Arithmetic
    } else {
        FormulaCategory::Other
    }
}

/// One formula and how many references it makes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaSummary {
    pub cell: String,
    pub formula: String,
    pub category: FormulaCategory,
    pub references: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookAnalysis {
    pub total_formulas: usize,
    pub by_category: BTreeMap<FormulaCategory, usize>,
    pub by_sheet: BTreeMap<String, usize>,
    /// Most references first
    pub most_complex: Vec<FormulaSummary>,
    /// Formulas that do not parse, counted under `Other`
    pub parse_errors: usize,
}

/// Analyze every formula in `workbook`, keeping the `top` most complex
pub fn analyze(workbook: &Workbook, top: usize) -> WorkbookAnalysis {
    let mut summaries = Vec::new();
    let mut by_category = BTreeMap::new();
    let mut by_sheet = BTreeMap::new();
    let mut parse_errors = 0;

    for sheet in workbook.sheets() {
        let mut count = 0;
        for (address, text) in sheet.formula_cells() {
            let references = match parse_formula(text) {
                Ok(ast) => ast.reference_count(),
                Err(_) => {
                    parse_errors += 1;
                    0
                }
            };
            let category = categorize(text);
            *by_category.entry(category).or_insert(0) += 1;
            count += 1;
            summaries.push(FormulaSummary {
                cell: SheetCell::new(sheet.name(), *address).to_a1_string(),
                formula: format!("={}", text),
                category,
                references,
            });
        }
        by_sheet.insert(sheet.name().to_string(), count);
    }

    let total_formulas = summaries.len();
    // Stable: ties keep workbook order
    summaries.sort_by(|a, b| b.references.cmp(&a.references));
    summaries.truncate(top);

    tracing::debug!(formulas = total_formulas, parse_errors, "analyzed workbook");
    WorkbookAnalysis {
        total_formulas,
        by_category,
        by_sheet,
        most_complex: summaries,
        parse_errors,
    }
}
