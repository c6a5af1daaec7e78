//! Built-in spreadsheet functions
//!
//! Most functions are *eager*: the evaluator computes every argument first.
//! Conditionals are *lazy*: they receive the argument expressions and
//! evaluate only the branch they take.

pub mod criteria;
pub mod format;
pub mod info;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod statistical;
pub mod text;

use crate::ast::FormulaExpr;
use crate::evaluator::EvaluationContext;
use crate::value::FormulaValue;
use ahash::AHashMap;
use paintcalc_core::{CellError, Decimal};
use std::sync::OnceLock;

/// What a function produces; `Err` is an error value, not a failure
pub type FunctionResult = Result<FormulaValue, CellError>;

/// Function over evaluated arguments
pub type EagerFn = fn(&[FormulaValue]) -> FunctionResult;

/// Function over unevaluated arguments
pub type LazyFn = fn(&[FormulaExpr], &dyn EvaluationContext) -> FunctionResult;

#[derive(Clone, Copy)]
pub enum FunctionKind {
    Eager(EagerFn),
    Lazy(LazyFn),
}

/// Function definition
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    pub kind: FunctionKind,
}

impl FunctionDef {
    const fn eager(name: &'static str, min_args: usize, max_args: Option<usize>, f: EagerFn) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Eager(f),
        }
    }

    const fn lazy(name: &'static str, min_args: usize, max_args: Option<usize>, f: LazyFn) -> Self {
        Self {
            name,
            min_args,
            max_args,
            kind: FunctionKind::Lazy(f),
        }
    }

    /// Whether `count` arguments is a legal call
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }

    /// Human-readable arity, e.g. `2`, `1 to 3` or `at least 1`
    pub fn arity_description(&self) -> String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {}", self.min_args, max),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// Function registry
pub struct FunctionRegistry {
    functions: AHashMap<&'static str, FunctionDef>,
}

/// The built-in registry, created on first use
pub fn registry() -> &'static FunctionRegistry {
    static REGISTRY: OnceLock<FunctionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(FunctionRegistry::new)
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self {
            functions: AHashMap::new(),
        };

        registry.register_logical_functions();
        registry.register_lookup_functions();
        registry.register_text_functions();
        registry.register_math_functions();
        registry.register_statistical_functions();
        registry.register_info_functions();

        registry
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions
            .get(name)
            .or_else(|| self.functions.get(name.to_ascii_uppercase().as_str()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Register a function
    pub fn register(&mut self, def: FunctionDef) {
        self.functions.insert(def.name, def);
    }

    fn register_all(&mut self, defs: impl IntoIterator<Item = FunctionDef>) {
        for def in defs {
            self.register(def);
        }
    }

    fn register_logical_functions(&mut self) {
        use logical::*;
        self.register_all([
            FunctionDef::lazy("IF", 2, Some(3), fn_if),
            FunctionDef::lazy("IFS", 2, None, fn_ifs),
            FunctionDef::lazy("IFERROR", 2, Some(2), fn_iferror),
            FunctionDef::lazy("IFNA", 2, Some(2), fn_ifna),
            FunctionDef::lazy("SWITCH", 3, None, fn_switch),
            FunctionDef::lazy("AND", 1, None, fn_and),
            FunctionDef::lazy("OR", 1, None, fn_or),
            FunctionDef::eager("NOT", 1, Some(1), fn_not),
            FunctionDef::eager("XOR", 1, None, fn_xor),
            FunctionDef::eager("TRUE", 0, Some(0), fn_true),
            FunctionDef::eager("FALSE", 0, Some(0), fn_false),
        ]);
    }

    fn register_lookup_functions(&mut self) {
        use lookup::*;
        self.register_all([
            FunctionDef::lazy("CHOOSE", 2, None, fn_choose),
            FunctionDef::eager("VLOOKUP", 3, Some(4), fn_vlookup),
            FunctionDef::eager("HLOOKUP", 3, Some(4), fn_hlookup),
            FunctionDef::eager("LOOKUP", 2, Some(3), fn_lookup),
            FunctionDef::eager("MATCH", 2, Some(3), fn_match),
            FunctionDef::eager("INDEX", 2, Some(3), fn_index),
            FunctionDef::eager("ROWS", 1, Some(1), fn_rows),
            FunctionDef::eager("COLUMNS", 1, Some(1), fn_columns),
        ]);
    }

    fn register_text_functions(&mut self) {
        use text::*;
        self.register_all([
            FunctionDef::eager("CONCAT", 1, None, fn_concat),
            FunctionDef::eager("CONCATENATE", 1, None, fn_concat),
            FunctionDef::eager("UPPER", 1, Some(1), fn_upper),
            FunctionDef::eager("LOWER", 1, Some(1), fn_lower),
            FunctionDef::eager("PROPER", 1, Some(1), fn_proper),
            FunctionDef::eager("LEFT", 1, Some(2), fn_left),
            FunctionDef::eager("RIGHT", 1, Some(2), fn_right),
            FunctionDef::eager("MID", 3, Some(3), fn_mid),
            FunctionDef::eager("LEN", 1, Some(1), fn_len),
            FunctionDef::eager("TRIM", 1, Some(1), fn_trim),
            FunctionDef::eager("FIND", 2, Some(3), fn_find),
            FunctionDef::eager("SEARCH", 2, Some(3), fn_search),
            FunctionDef::eager("SUBSTITUTE", 3, Some(4), fn_substitute),
            FunctionDef::eager("REPT", 2, Some(2), fn_rept),
            FunctionDef::eager("EXACT", 2, Some(2), fn_exact),
            FunctionDef::eager("VALUE", 1, Some(1), fn_value),
            FunctionDef::eager("TEXT", 2, Some(2), fn_text),
            FunctionDef::eager("FIXED", 1, Some(3), fn_fixed),
            FunctionDef::eager("DOLLAR", 1, Some(2), fn_dollar),
        ]);
    }

    fn register_math_functions(&mut self) {
        use math::*;
        self.register_all([
            FunctionDef::eager("SUM", 1, None, fn_sum),
            FunctionDef::eager("PRODUCT", 1, None, fn_product),
            FunctionDef::eager("SUMPRODUCT", 1, None, fn_sumproduct),
            FunctionDef::eager("SUMIF", 2, Some(3), fn_sumif),
            FunctionDef::eager("ROUND", 2, Some(2), fn_round),
            FunctionDef::eager("ROUNDUP", 2, Some(2), fn_roundup),
            FunctionDef::eager("ROUNDDOWN", 2, Some(2), fn_rounddown),
            FunctionDef::eager("CEILING", 1, Some(2), fn_ceiling),
            FunctionDef::eager("FLOOR", 1, Some(2), fn_floor),
            FunctionDef::eager("MROUND", 2, Some(2), fn_mround),
            FunctionDef::eager("INT", 1, Some(1), fn_int),
            FunctionDef::eager("TRUNC", 1, Some(2), fn_trunc),
            FunctionDef::eager("ABS", 1, Some(1), fn_abs),
            FunctionDef::eager("SIGN", 1, Some(1), fn_sign),
            FunctionDef::eager("MOD", 2, Some(2), fn_mod),
            FunctionDef::eager("POWER", 2, Some(2), fn_power),
            FunctionDef::eager("SQRT", 1, Some(1), fn_sqrt),
            FunctionDef::eager("LN", 1, Some(1), fn_ln),
            FunctionDef::eager("LOG", 1, Some(2), fn_log),
            FunctionDef::eager("LOG10", 1, Some(1), fn_log10),
            FunctionDef::eager("EXP", 1, Some(1), fn_exp),
            FunctionDef::eager("PI", 0, Some(0), fn_pi),
        ]);
    }

    fn register_statistical_functions(&mut self) {
        use statistical::*;
        self.register_all([
            FunctionDef::eager("AVERAGE", 1, None, fn_average),
            FunctionDef::eager("MIN", 1, None, fn_min),
            FunctionDef::eager("MAX", 1, None, fn_max),
            FunctionDef::eager("COUNT", 1, None, fn_count),
            FunctionDef::eager("COUNTA", 1, None, fn_counta),
            FunctionDef::eager("COUNTBLANK", 1, Some(1), fn_countblank),
            FunctionDef::eager("COUNTIF", 2, Some(2), fn_countif),
            FunctionDef::eager("AVERAGEIF", 2, Some(3), fn_averageif),
        ]);
    }

    fn register_info_functions(&mut self) {
        use info::*;
        self.register_all([
            FunctionDef::eager("ISBLANK", 1, Some(1), fn_isblank),
            FunctionDef::eager("ISNUMBER", 1, Some(1), fn_isnumber),
            FunctionDef::eager("ISTEXT", 1, Some(1), fn_istext),
            FunctionDef::eager("ISERROR", 1, Some(1), fn_iserror),
            FunctionDef::eager("ISNA", 1, Some(1), fn_isna),
            FunctionDef::eager("ISLOGICAL", 1, Some(1), fn_islogical),
            FunctionDef::eager("NA", 0, Some(0), fn_na),
        ]);
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// === Argument helpers shared by the families ===

/// Optional numeric argument; only an absent argument takes the default
pub(crate) fn opt_number(args: &[FormulaValue], index: usize, default: Decimal) -> Result<Decimal, CellError> {
    args.get(index).map_or(Ok(default), FormulaValue::to_number)
}

/// Optional integer argument, truncated toward zero
pub(crate) fn opt_integer(args: &[FormulaValue], index: usize, default: i64) -> Result<i64, CellError> {
    args.get(index).map_or(Ok(default), FormulaValue::to_integer)
}

pub(crate) fn opt_bool(args: &[FormulaValue], index: usize, default: bool) -> Result<bool, CellError> {
    args.get(index).map_or(Ok(default), FormulaValue::to_bool)
}

/// Text view of an argument; errors pass through
pub(crate) fn text_arg(value: &FormulaValue) -> Result<String, CellError> {
    match value.error() {
        Some(e) => Err(e),
        None => Ok(value.to_text()),
    }
}

/// Every number in the arguments, for aggregate functions
///
/// Text, booleans and empty values are skipped; the first error wins.
pub(crate) fn collect_numbers(args: &[FormulaValue]) -> Result<Vec<Decimal>, CellError> {
    let mut numbers = Vec::new();
    for value in args.iter().flat_map(FormulaValue::flat) {
        match value {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(numbers)
}
