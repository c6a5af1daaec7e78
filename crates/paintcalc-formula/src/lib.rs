//! # paintcalc-formula
//!
//! Formula support for the paintcalc estimate engine.
//!
//! This crate provides:
//! - Formula parsing (text → AST) with positioned [`ParseError`]s
//! - Expression evaluation over exact decimals with spreadsheet coercion
//! - Built-in spreadsheet functions (conditional, lookup, text, aggregate, info)
//! - A dependency graph with cycle detection and topological ordering
//!
//! ## Example
//!
//! ```rust
//! use paintcalc_formula::{evaluate, parse_formula, EmptyContext, FormulaValue};
//!
//! let ast = parse_formula("=ROUND(2000*1.3/0.45, 2)").unwrap();
//! let value = evaluate(&ast, &EmptyContext);
//! assert_eq!(value.to_text(), "5777.78");
//! ```

pub mod ast;
pub mod dependency;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod numeric;
pub mod parser;
pub mod value;

pub use ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
pub use dependency::{CellKey, DependencyGraph};
pub use error::{FormulaError, FormulaResult, ParseError};
pub use evaluator::{evaluate, validate_functions, EmptyContext, EvaluationContext};
pub use parser::parse_formula;
pub use value::{FormulaValue, RangeValue};
