//! # paintcalc
//!
//! Paint estimate calculation engine.
//!
//! A versioned estimator workbook is compiled once into a dependency graph
//! and then evaluated per request against the customer's inputs. The priced
//! sections are summed and turned into Good/Better/Best tier prices.
//!
//! ## Features
//!
//! - Compile-time checks: unparseable formulas, unknown functions, dangling
//!   references and circular references are rejected before any request
//! - Per-request evaluation of only the cells the selected sections need
//! - Cell errors (`#DIV/0!`, `#N/A`, ...) stay in their cells unless a
//!   price depends on them
//! - Exact decimal pricing with a configurable markup
//! - An async result cache that runs one computation per distinct input
//!
//! ## Example
//!
//! ```rust
//! use paintcalc::prelude::*;
//! use std::sync::Arc;
//!
//! let workbook = Workbook::from_json_str(r#"{
//!     "name": "demo", "version": "1",
//!     "sheets": [{ "name": "Calc", "cells": { "A1": 0, "A2": "=A1/2" } }],
//!     "inputs": { "labor": { "cell": "Calc!A1", "kind": "number" } },
//!     "sections": { "exterior": { "labor": "Calc!A1", "material": "Calc!A2" } }
//! }"#).unwrap();
//!
//! let compiled = CompiledWorkbook::compile(workbook).unwrap();
//! let engine = Engine::with_defaults(Arc::new(compiled));
//!
//! let result = engine.calculate(&EstimateInput::new().with("labor", 2000)).unwrap();
//! assert_eq!(result.final_price(PricingTier::Good).to_string(), "6666.67");
//! ```

pub mod analysis;
pub mod cache;
pub mod calculation;
pub mod compile;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod input;
pub mod prelude;
pub mod pricing;
pub mod result;
pub mod service;

pub use analysis::{analyze, categorize, FormulaCategory, FormulaSummary, WorkbookAnalysis};
pub use cache::{CacheStats, CacheStore, ResultCache};
pub use calculation::{CalculationStats, EvaluationPass};
pub use compile::{CellId, CompiledWorkbook, WorkbookStats};
pub use config::{CacheConfig, EngineConfig, TierMultipliers};
pub use engine::Engine;
pub use error::{
    BuildError, BuildResult, CacheError, ConfigError, EngineError, GraphCycleError, Result,
};
pub use fingerprint::Fingerprint;
pub use input::{EstimateInput, InputValue, INPUT_VERSION};
pub use pricing::{PricingCalculator, PricingTier, TierPrice, TierPrices};
pub use result::{CalculationResult, SectionTotals, WorkbookInfo};
pub use service::EstimateService;

pub use paintcalc_core::{CellError, CellValue, Decimal, SheetCell, Workbook};
