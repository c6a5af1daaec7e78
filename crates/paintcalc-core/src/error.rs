//! Error types for paintcalc-core

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or loading a workbook model
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Invalid sheet name
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid defined name
    #[error("Invalid defined name: {0}")]
    InvalidName(String),

    /// Cell content in the definition could not be interpreted
    #[error("Invalid content for cell {cell}: {reason}")]
    InvalidCellContent { cell: String, reason: String },

    /// Input binding declaration is malformed
    #[error("Invalid input declaration '{field}': {reason}")]
    InvalidInput { field: String, reason: String },

    /// Section or output declaration is malformed
    #[error("Invalid declaration '{name}': {reason}")]
    InvalidDeclaration { name: String, reason: String },

    /// Workbook definition is not valid JSON for the expected shape
    #[error("Invalid workbook definition: {0}")]
    Definition(#[from] serde_json::Error),
}
