//! Calculation results

use crate::calculation::CalculationStats;
use crate::fingerprint::Fingerprint;
use crate::pricing::{PricingTier, TierPrices};
use paintcalc_core::{CellValue, Decimal};
use serde::Serialize;
use std::collections::BTreeMap;

/// Identifies the workbook a result was computed with
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkbookInfo {
    pub name: String,
    pub version: String,
}

/// Labor and material subtotals of one priced section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SectionTotals {
    pub labor: Decimal,
    pub material: Decimal,
}

/// Immutable snapshot of one estimate
///
/// Cell errors in `outputs` and `cells` serialize as `{"error": "#DIV/0!"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationResult {
    pub fingerprint: Fingerprint,
    pub workbook: WorkbookInfo,
    pub tiers: TierPrices,
    pub labor_cost: Decimal,
    pub material_cost: Decimal,
    pub sections: BTreeMap<String, SectionTotals>,
    pub outputs: BTreeMap<String, CellValue>,
    /// Every evaluated cell, keyed `Sheet!A1`
    pub cells: BTreeMap<String, CellValue>,
    pub stats: CalculationStats,
}

impl CalculationResult {
    pub fn final_price(&self, tier: PricingTier) -> Decimal {
        self.tiers.get(tier).final_price
    }

    pub fn output(&self, name: &str) -> Option<&CellValue> {
        self.outputs.get(name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
