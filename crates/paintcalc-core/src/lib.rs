//! # paintcalc-core
//!
//! Core data structures for the paintcalc estimate engine.
//!
//! This crate provides the static workbook model the engine is compiled from:
//! - [`CellValue`] and [`CellError`] - literal and computed cell values
//! - [`CellAddress`], [`CellRange`] and [`SheetCell`] - cell addressing
//! - [`Sheet`] and [`CellContent`] - the cells of one sheet (literals or formula text)
//! - [`Workbook`] - sheets plus defined names, input bindings, priced sections and
//!   reported outputs, loaded from a versioned JSON definition
//!
//! ## Example
//!
//! ```rust
//! use paintcalc_core::{CellContent, Workbook};
//!
//! let workbook = Workbook::from_json_str(r#"{
//!     "name": "demo",
//!     "version": "1",
//!     "sheets": [{ "name": "Inputs", "cells": { "A1": 2, "A2": "=A1*3" } }]
//! }"#).unwrap();
//!
//! let sheet = workbook.sheet("Inputs").unwrap();
//! assert_eq!(sheet.len(), 2);
//! assert!(matches!(sheet.get_str("A2"), Some(CellContent::Formula(_))));
//! ```

pub mod cell;
pub mod definition;
pub mod error;
pub mod named_range;
pub mod sheet;
pub mod workbook;

// Re-exports for convenience
pub use cell::{CellAddress, CellError, CellRange, CellValue, SharedString, SheetCell};
pub use error::{Error, Result};
pub use named_range::{DefinedName, NameTarget};
pub use sheet::{CellContent, Sheet};
pub use workbook::{InputDecl, InputKind, OutputDecl, SectionDecl, Workbook};

/// Re-exported so downstream crates agree on one decimal type
pub use rust_decimal::Decimal;

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
