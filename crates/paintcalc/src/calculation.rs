//! A single evaluation pass over a compiled workbook
//!
//! A pass owns its value map. Nothing it computes outlives the request, so
//! values from one set of inputs can never leak into another.

use crate::compile::{CellId, CellSource, CompiledWorkbook, ResolvedName};
use paintcalc_core::{CellAddress, CellError, CellRange, CellValue, Decimal};
use paintcalc_formula::{
    evaluate, CellReference, EvaluationContext, FormulaValue, RangeReference, RangeValue,
};
use serde::Serialize;
use std::time::Instant;

/// Statistics from an evaluation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CalculationStats {
    /// Cells given a value, literals and seeded inputs included
    pub cells_evaluated: usize,
    /// Formula cells evaluated
    pub formulas_evaluated: usize,
    /// Cells that ended up holding an error value
    pub errors: usize,
}

/// Values for one set of input bindings
pub struct EvaluationPass<'a> {
    compiled: &'a CompiledWorkbook,
    values: Vec<Option<CellValue>>,
    evaluated: Vec<CellId>,
}

impl<'a> EvaluationPass<'a> {
    pub fn new(compiled: &'a CompiledWorkbook) -> Self {
        Self {
            compiled,
            values: vec![None; compiled.cells().len()],
            evaluated: Vec::new(),
        }
    }

    /// Fix an input cell's value before the pass runs
    pub fn seed(&mut self, id: CellId, value: CellValue) {
        self.values[id.index()] = Some(value);
    }

    /// Evaluate every cell the targets depend on, each exactly once
    pub fn run(&mut self, targets: &[CellId]) -> CalculationStats {
        let started = Instant::now();
        let order = self.compiled.evaluation_order(targets);
        let mut stats = CalculationStats::default();

        for id in order {
            let value = match (&self.values[id.index()], &self.compiled.cell(id).source) {
                (Some(seeded), _) => seeded.clone(),
                (None, CellSource::Literal(value)) => value.clone(),
                (None, CellSource::Formula { ast, .. }) => {
                    stats.formulas_evaluated += 1;
                    let ctx = CellContext {
                        pass: &*self,
                        sheet: self.compiled.cell(id).key.sheet,
                    };
                    match CellValue::from(evaluate(ast, &ctx)) {
                        // A formula that yields nothing displays as zero
                        CellValue::Empty => CellValue::Number(Decimal::ZERO),
                        value => value,
                    }
                }
            };

            tracing::trace!(cell = %self.compiled.cell_name(id), value = %value, "evaluated");
            if value.is_error() {
                stats.errors += 1;
            }
            stats.cells_evaluated += 1;
            self.values[id.index()] = Some(value);
            self.evaluated.push(id);
        }

        tracing::debug!(
            cells = stats.cells_evaluated,
            formulas = stats.formulas_evaluated,
            errors = stats.errors,
            elapsed_us = started.elapsed().as_micros() as u64,
            "evaluation pass"
        );
        stats
    }

    /// Value of a cell; cells outside the pass read as their literal or empty
    pub fn value(&self, id: CellId) -> CellValue {
        match &self.values[id.index()] {
            Some(value) => value.clone(),
            None => match &self.compiled.cell(id).source {
                CellSource::Literal(value) => value.clone(),
                CellSource::Formula { .. } => CellValue::Empty,
            },
        }
    }

    /// Cells evaluated by [`EvaluationPass::run`], in evaluation order
    pub fn evaluated(&self) -> &[CellId] {
        &self.evaluated
    }

    fn read(&self, sheet: usize, address: &CellAddress) -> FormulaValue {
        match self.compiled.cell_id_at(sheet, address) {
            Some(id) => self.value(id).into(),
            None => FormulaValue::Empty,
        }
    }

    /// Values of the compiled cells in `range`; undefined cells stay blank
    fn range_value(&self, sheet: usize, range: &CellRange) -> FormulaValue {
        let mut values = RangeValue::new(range.row_count() as usize, range.col_count() as usize);
        for (address, id) in self.compiled.cells_in(sheet, range) {
            values.insert(
                (address.row - range.start.row) as usize,
                (address.col - range.start.col) as usize,
                self.value(id).into(),
            );
        }
        FormulaValue::Range(values)
    }
}

/// References as seen from a formula on one sheet
struct CellContext<'p, 'a> {
    pass: &'p EvaluationPass<'a>,
    sheet: usize,
}

impl EvaluationContext for CellContext<'_, '_> {
    fn cell(&self, reference: &CellReference) -> FormulaValue {
        match self.pass.compiled.sheet_for(self.sheet, reference.sheet.as_deref()) {
            Some(sheet) => self.pass.read(sheet, &reference.address),
            None => FormulaValue::Error(CellError::Ref),
        }
    }

    fn range(&self, reference: &RangeReference) -> FormulaValue {
        match self.pass.compiled.sheet_for(self.sheet, reference.sheet.as_deref()) {
            Some(sheet) => self.pass.range_value(sheet, &reference.range),
            None => FormulaValue::Error(CellError::Ref),
        }
    }

    fn name(&self, name: &str) -> FormulaValue {
        match self.pass.compiled.name(name) {
            Some(ResolvedName::Cell(key)) => self.pass.read(key.sheet, &key.address()),
            Some(ResolvedName::Range { sheet, range }) => self.pass.range_value(sheet, &range),
            None => FormulaValue::Error(CellError::Name),
        }
    }
}
