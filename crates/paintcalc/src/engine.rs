//! The synchronous estimate engine

use crate::calculation::EvaluationPass;
use crate::compile::{CellId, CompiledWorkbook};
use crate::config::EngineConfig;
use crate::error::{ConfigError, EngineError, Result};
use crate::fingerprint::Fingerprint;
use crate::input::{bind, EstimateInput, InputValue};
use crate::pricing::PricingCalculator;
use crate::result::{CalculationResult, SectionTotals, WorkbookInfo};
use paintcalc_core::{CellError, CellValue, Decimal, SheetCell};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Evaluates estimates against one compiled workbook
///
/// Cheap to share: the compiled workbook sits behind an `Arc` and every
/// request evaluates into its own pass.
#[derive(Debug)]
pub struct Engine {
    compiled: Arc<CompiledWorkbook>,
    config: EngineConfig,
    pricing: PricingCalculator,
}

impl Engine {
    pub fn new(
        compiled: Arc<CompiledWorkbook>,
        config: EngineConfig,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        let pricing = PricingCalculator::new(&config);
        Ok(Self {
            compiled,
            config,
            pricing,
        })
    }

    /// Engine with the default configuration
    pub fn with_defaults(compiled: Arc<CompiledWorkbook>) -> Self {
        let config = EngineConfig::default();
        let pricing = PricingCalculator::new(&config);
        Self {
            compiled,
            config,
            pricing,
        }
    }

    pub fn compiled(&self) -> &Arc<CompiledWorkbook> {
        &self.compiled
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fingerprint of `input` with each declared field in its bound form
    ///
    /// Values that seed the same cell value share a fingerprint, so
    /// `" PREMIUM"` and `"premium"` hit the same cache entry. Fields that
    /// do not bind are hashed as given.
    pub fn fingerprint(&self, input: &EstimateInput) -> Fingerprint {
        let workbook = self.compiled.workbook();
        let mut canonical = input.clone();
        for (field, value) in canonical.fields.iter_mut() {
            let Some(decl) = workbook.inputs().get(field) else {
                continue;
            };
            match bind(decl, value) {
                CellValue::Number(n) => *value = InputValue::Number(n),
                CellValue::Text(s) => *value = InputValue::Text(s.as_str().to_string()),
                CellValue::Boolean(b) => *value = InputValue::Bool(b),
                CellValue::Empty | CellValue::Error(_) => {}
            }
        }
        Fingerprint::compute(&workbook.identity(), &canonical)
    }

    /// Evaluate `input` and price the selected sections
    pub fn calculate(&self, input: &EstimateInput) -> Result<CalculationResult> {
        let workbook = self.compiled.workbook();

        if input.version == 0 || input.version > self.config.max_input_version {
            return Err(EngineError::UnsupportedInputVersion {
                version: input.version,
                max: self.config.max_input_version,
            });
        }
        let sections = self.selected_sections(input)?;

        let mut pass = EvaluationPass::new(&self.compiled);
        for (field, value) in &input.fields {
            let decl = workbook
                .inputs()
                .get(field)
                .ok_or_else(|| EngineError::UnknownInput(field.clone()))?;
            let bound = bind(decl, value);
            if let CellValue::Error(error) = &bound {
                tracing::warn!(
                    field = %field,
                    kind = decl.kind.name(),
                    error = %error,
                    "input does not fit its declared kind"
                );
            }
            pass.seed(self.id(field, &decl.cell)?, bound);
        }

        // Section subtotals plus the outputs that belong to a priced section
        // or to none
        let mut targets = Vec::new();
        for name in &sections {
            let decl = &workbook.sections()[*name];
            targets.push(self.id(&format!("{}.labor", name), &decl.labor)?);
            targets.push(self.id(&format!("{}.material", name), &decl.material)?);
        }
        let outputs: Vec<(&String, CellId)> = workbook
            .outputs()
            .iter()
            .filter(|(_, decl)| {
                decl.section
                    .as_deref()
                    .map_or(true, |section| sections.contains(&section))
            })
            .map(|(name, decl)| self.id(name, &decl.cell).map(|id| (name, id)))
            .collect::<Result<_>>()?;
        targets.extend(outputs.iter().map(|(_, id)| *id));

        let stats = pass.run(&targets);

        let mut totals = BTreeMap::new();
        let (mut labor_cost, mut material_cost) = (Decimal::ZERO, Decimal::ZERO);
        for name in &sections {
            let decl = &workbook.sections()[*name];
            let section = SectionTotals {
                labor: self.price_input(&pass, &format!("{}.labor", name), &decl.labor)?,
                material: self.price_input(&pass, &format!("{}.material", name), &decl.material)?,
            };
            let overflow = || EngineError::PriceOverflow {
                tier: "all".to_string(),
            };
            labor_cost = labor_cost.checked_add(section.labor).ok_or_else(overflow)?;
            material_cost = material_cost
                .checked_add(section.material)
                .ok_or_else(overflow)?;
            totals.insert(name.to_string(), section);
        }

        let tiers = self.pricing.price_all(labor_cost, material_cost)?;

        let result = CalculationResult {
            fingerprint: self.fingerprint(input),
            workbook: WorkbookInfo {
                name: workbook.name().to_string(),
                version: workbook.version().to_string(),
            },
            tiers,
            labor_cost: labor_cost.normalize(),
            material_cost: material_cost.normalize(),
            sections: totals,
            outputs: outputs
                .iter()
                .map(|(name, id)| (name.to_string(), pass.value(*id)))
                .collect(),
            cells: pass
                .evaluated()
                .iter()
                .map(|id| (self.compiled.cell_name(*id), pass.value(*id)))
                .collect(),
            stats,
        };

        tracing::debug!(
            fingerprint = %result.fingerprint,
            sections = sections.len(),
            final_price = %result.tiers.best.final_price,
            "estimate calculated"
        );
        Ok(result)
    }

    /// Requested sections, defaulting to every section
    fn selected_sections<'a>(&'a self, input: &'a EstimateInput) -> Result<Vec<&'a str>> {
        let declared = self.compiled.workbook().sections();
        let selected: Vec<&str> = match &input.sections {
            None => declared.keys().map(String::as_str).collect(),
            Some(requested) => {
                let mut selected = Vec::new();
                for name in requested {
                    let (key, _) = declared
                        .get_key_value(name)
                        .ok_or_else(|| EngineError::UnknownSection(name.clone()))?;
                    if !selected.contains(&key.as_str()) {
                        selected.push(key.as_str());
                    }
                }
                selected.sort_unstable();
                selected
            }
        };
        if selected.is_empty() {
            return Err(EngineError::NoSections);
        }
        Ok(selected)
    }

    /// Compiled id of the cell behind `output` (a field, section total or
    /// declared output)
    fn id(&self, output: &str, cell: &SheetCell) -> Result<CellId> {
        // Declared cells are always compiled; a miss means the workbook
        // changed under the engine
        self.compiled.cell_id(cell).ok_or_else(|| EngineError::UnresolvedOutput {
            output: output.to_string(),
            cell: cell.to_a1_string(),
            error: CellError::Ref,
        })
    }

    /// A value the price depends on: a number, or empty as zero
    fn price_input(
        &self,
        pass: &EvaluationPass<'_>,
        output: &str,
        cell: &SheetCell,
    ) -> Result<Decimal> {
        let unresolved = |error| EngineError::UnresolvedOutput {
            output: output.to_string(),
            cell: cell.to_a1_string(),
            error,
        };
        match pass.value(self.id(output, cell)?) {
            CellValue::Number(n) => Ok(n),
            CellValue::Empty => Ok(Decimal::ZERO),
            CellValue::Error(error) => Err(unresolved(error)),
            CellValue::Text(_) | CellValue::Boolean(_) => Err(unresolved(CellError::Value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PricingTier;
    use paintcalc_core::Workbook;
    use pretty_assertions::{assert_eq, assert_ne};
    use rust_decimal_macros::dec;

    const WORKBOOK: &str = r#"{
        "name": "two-section", "version": "1",
        "sheets": [
            { "name": "Inputs", "cells": { "B1": 0, "B2": 0, "B3": "standard" } },
            { "name": "Calc", "cells": {
                "A1": "=Inputs!B1",
                "A2": "=Inputs!B1/2",
                "B1": "=Inputs!B2*10",
                "B2": "=1/0",
                "C1": "=IF(Inputs!B3=\"premium\", \"yes\", \"no\")"
            } }
        ],
        "inputs": {
            "exterior_labor": { "cell": "Inputs!B1", "kind": "number" },
            "interior_rooms": { "cell": "Inputs!B2", "kind": "number" },
            "paint_quality": { "cell": "Inputs!B3", "kind": { "choice": ["standard", "premium"] } }
        },
        "sections": {
            "exterior": { "labor": "Calc!A1", "material": "Calc!A2" },
            "interior": { "labor": "Calc!B1", "material": "Calc!B2" }
        },
        "outputs": {
            "premium": { "cell": "Calc!C1" },
            "interior_material": { "cell": "Calc!B2", "section": "interior" }
        }
    }"#;

    fn engine() -> Engine {
        let compiled = CompiledWorkbook::compile(Workbook::from_json_str(WORKBOOK).unwrap()).unwrap();
        Engine::with_defaults(Arc::new(compiled))
    }

    fn exterior(labor: i64) -> EstimateInput {
        EstimateInput::new()
            .with("exterior_labor", labor)
            .with_sections(["exterior"])
    }

    #[test]
    fn test_prices_selected_sections() {
        let result = engine().calculate(&exterior(2000)).unwrap();
        assert_eq!(result.labor_cost, dec!(2000));
        assert_eq!(result.material_cost, dec!(1000));
        assert_eq!(result.final_price(PricingTier::Good), dec!(6666.67));
        assert_eq!(result.final_price(PricingTier::Better), dec!(8666.67));
        assert_eq!(result.final_price(PricingTier::Best), dec!(10666.67));
        assert_eq!(result.sections.len(), 1);
    }

    #[test]
    fn test_excluded_section_errors_are_contained() {
        let result = engine().calculate(&exterior(100)).unwrap();
        // The interior section divides by zero but is never evaluated
        assert!(!result.cells.contains_key("Calc!B2"));
        assert!(!result.outputs.contains_key("interior_material"));
        assert_eq!(result.output("premium"), Some(&CellValue::text("no")));
    }

    #[test]
    fn test_error_in_priced_section_is_unresolved() {
        let err = engine().calculate(&EstimateInput::new()).unwrap_err();
        assert_eq!(
            err,
            EngineError::UnresolvedOutput {
                output: "interior.material".into(),
                cell: "Calc!B2".into(),
                error: CellError::Div0,
            }
        );
    }

    #[test]
    fn test_input_kind_mismatch_is_unresolved() {
        let input = EstimateInput::new()
            .with("exterior_labor", "lots")
            .with_sections(["exterior"]);
        let err = engine().calculate(&input).unwrap_err();
        assert!(matches!(
            err,
            EngineError::UnresolvedOutput { error: CellError::Value, ref output, .. } if output == "exterior.labor"
        ));
    }

    #[test]
    fn test_choice_inputs_are_canonical() {
        let input = exterior(10).with("paint_quality", "PREMIUM");
        let result = engine().calculate(&input).unwrap();
        assert_eq!(result.output("premium"), Some(&CellValue::text("yes")));
        assert_eq!(result.cells["Inputs!B3"], CellValue::text("premium"));
    }

    #[test]
    fn test_equivalent_choice_spellings_share_a_fingerprint() {
        let engine = engine();
        let canonical = engine.fingerprint(&exterior(10).with("paint_quality", "premium"));
        assert_eq!(
            engine.fingerprint(&exterior(10).with("paint_quality", " PREMIUM")),
            canonical
        );
        assert_eq!(
            engine.calculate(&exterior(10).with("paint_quality", " PREMIUM")).unwrap().fingerprint,
            canonical
        );

        assert_ne!(engine.fingerprint(&exterior(10).with("paint_quality", "standard")), canonical);
        // Unbindable values keep their own spelling
        assert_ne!(
            engine.fingerprint(&exterior(10).with("paint_quality", "gold")),
            engine.fingerprint(&exterior(10).with("paint_quality", "GOLD"))
        );
    }

    #[test]
    fn test_missing_cell_names_its_output() {
        let engine = engine();
        let err = engine
            .id("exterior.labor", &SheetCell::parse("Calc!Z99").unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::UnresolvedOutput {
                output: "exterior.labor".into(),
                cell: "Calc!Z99".into(),
                error: CellError::Ref,
            }
        );
    }

    #[test]
    fn test_rejects_bad_requests() {
        let engine = engine();
        assert_eq!(
            engine.calculate(&exterior(1).with("ladders", 2)).unwrap_err(),
            EngineError::UnknownInput("ladders".into())
        );
        assert_eq!(
            engine
                .calculate(&EstimateInput::new().with_sections(["garage"]))
                .unwrap_err(),
            EngineError::UnknownSection("garage".into())
        );
        assert_eq!(
            engine
                .calculate(&EstimateInput::new().with_sections(Vec::<String>::new()))
                .unwrap_err(),
            EngineError::NoSections
        );

        let mut future = exterior(1);
        future.version = 2;
        assert_eq!(
            engine.calculate(&future).unwrap_err(),
            EngineError::UnsupportedInputVersion { version: 2, max: 1 }
        );
    }

    #[test]
    fn test_repeated_calculation_is_identical() {
        let engine = engine();
        let input = exterior(1234).with("paint_quality", "standard");
        let first = engine.calculate(&input).unwrap();
        let second = engine.calculate(&input).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let compiled = engine().compiled().clone();
        let config = EngineConfig {
            markup_divisor: Decimal::ZERO,
            ..EngineConfig::default()
        };
        assert!(matches!(
            Engine::new(compiled, config),
            Err(ConfigError::InvalidDivisor(_))
        ));
    }
}
