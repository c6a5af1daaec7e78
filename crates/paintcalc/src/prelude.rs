//! Prelude module - common imports for paintcalc users
//!
//! ```rust
//! use paintcalc::prelude::*;
//! ```

pub use crate::{
    // Errors
    BuildError,
    CalculationResult,
    CellError,
    CellValue,
    CompiledWorkbook,
    Decimal,
    // Main types
    Engine,
    EngineConfig,
    EngineError,
    EstimateInput,
    EstimateService,
    Fingerprint,
    InputValue,
    PricingTier,
    TierPrice,
    Workbook,
};
