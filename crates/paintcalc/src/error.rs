//! Error types for the paintcalc engine

use paintcalc_core::CellError;
use paintcalc_formula::FormulaError;
use std::path::PathBuf;
use thiserror::Error;

/// Result of compiling a workbook
pub type BuildResult<T> = std::result::Result<T, BuildError>;

/// Result of a calculation request
pub type Result<T> = std::result::Result<T, EngineError>;

/// A circular chain of cells found while building the dependency graph
///
/// The first cell is repeated at the end of `path`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Circular reference: {}", path.join(" -> "))]
pub struct GraphCycleError {
    pub path: Vec<String>,
}

/// Errors that stop a workbook from being compiled
#[derive(Debug, Error)]
pub enum BuildError {
    /// The workbook model itself is invalid
    #[error(transparent)]
    Workbook(#[from] paintcalc_core::Error),

    /// A formula failed to parse, calls an unknown function or references
    /// something that does not exist
    #[error("Formula error in {cell}: {source}")]
    Formula {
        cell: String,
        #[source]
        source: FormulaError,
    },

    #[error(transparent)]
    Cycle(#[from] GraphCycleError),
}

/// Errors returned by a calculation request
///
/// Value-level problems inside cells are not errors here; they show up as
/// typed markers in the result. Only a price that cannot be produced is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("Unknown input field: {0}")]
    UnknownInput(String),

    #[error("Unknown section: {0}")]
    UnknownSection(String),

    #[error("Unsupported input version {version} (max supported: {max})")]
    UnsupportedInputVersion { version: u32, max: u32 },

    #[error("No sections selected for pricing")]
    NoSections,

    /// A cell required for the final price evaluated to an error or to text
    #[error("Price unavailable: {output} ({cell}) is {error}")]
    UnresolvedOutput {
        output: String,
        cell: String,
        error: CellError,
    },

    /// Tier arithmetic overflowed the decimal range
    #[error("Price overflow in tier {tier}")]
    PriceOverflow { tier: String },

    /// The computation task panicked or was cancelled
    #[error("Calculation task failed: {0}")]
    Join(String),
}

/// Invalid engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Markup divisor must be greater than zero, got {0}")]
    InvalidDivisor(rust_decimal::Decimal),

    #[error("Multiplier for tier {tier} must not be negative, got {value}")]
    NegativeMultiplier {
        tier: String,
        value: rust_decimal::Decimal,
    },

    #[error("Tier multipliers must not decrease from good to best")]
    DecreasingMultipliers,

    #[error("Price scale {0} is out of range (max 28)")]
    InvalidPriceScale(u32),

    #[error("Cache TTL must be greater than zero when the cache is enabled")]
    InvalidTtl,

    #[error("Invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to read configuration '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of an external cache store
///
/// These are logged and recovered from; a request never fails because of one.
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Cache store read failed: {0}")]
    Load(String),

    #[error("Cache store write failed: {0}")]
    Save(String),
}
