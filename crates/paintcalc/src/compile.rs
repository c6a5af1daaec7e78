//! Compiling a workbook into the immutable form requests evaluate against
//!
//! Compilation parses every formula, resolves each cell, range and name
//! reference to concrete cells, builds the dependency graph over the whole
//! workbook and rejects cycles. The result is shared read-only between
//! requests.

use crate::error::{BuildError, BuildResult, GraphCycleError};
use ahash::AHashMap;
use paintcalc_core::{
    CellAddress, CellContent, CellRange, CellValue, Error, NameTarget, SheetCell, Workbook,
};
use paintcalc_formula::{
    parse_formula, validate_functions, CellKey, DependencyGraph, FormulaError, FormulaExpr,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Dense index of a cell in the compiled arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u32);

impl CellId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a compiled cell holds
#[derive(Debug, Clone)]
pub enum CellSource {
    Literal(CellValue),
    Formula { source: String, ast: FormulaExpr },
}

#[derive(Debug, Clone)]
pub struct CompiledCell {
    pub key: CellKey,
    pub source: CellSource,
}

impl CompiledCell {
    pub fn is_formula(&self) -> bool {
        matches!(self.source, CellSource::Formula { .. })
    }
}

/// A defined name resolved to a sheet index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedName {
    Cell(CellKey),
    Range { sheet: usize, range: CellRange },
}

/// Size of a compiled workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorkbookStats {
    pub sheets: usize,
    pub cells: usize,
    pub formulas: usize,
    pub edges: usize,
    pub inputs: usize,
    pub sections: usize,
    pub outputs: usize,
}

/// A workbook with parsed formulas and an acyclic dependency graph
#[derive(Debug)]
pub struct CompiledWorkbook {
    workbook: Workbook,
    cells: Vec<CompiledCell>,
    /// Per sheet: position → arena id, row-major
    lookup: Vec<BTreeMap<CellAddress, CellId>>,
    names: AHashMap<String, ResolvedName>,
    graph: DependencyGraph<CellId>,
    /// Position of each cell in a topological order of the whole graph
    rank: Vec<u32>,
    formulas: usize,
}

impl CompiledWorkbook {
    /// Parse, resolve and order every formula in `workbook`
    pub fn compile(workbook: Workbook) -> BuildResult<Self> {
        workbook.validate()?;

        let mut compiled = CompiledWorkbook {
            lookup: vec![BTreeMap::new(); workbook.sheets().len()],
            cells: Vec::with_capacity(workbook.cell_count()),
            names: AHashMap::new(),
            graph: DependencyGraph::new(),
            rank: Vec::new(),
            formulas: 0,
            workbook,
        };

        compiled.resolve_names()?;
        compiled.collect_cells()?;
        compiled.collect_declared_cells()?;
        compiled.build_graph()?;

        tracing::info!(
            workbook = %compiled.workbook.identity(),
            sheets = compiled.lookup.len(),
            cells = compiled.cells.len(),
            formulas = compiled.formulas,
            edges = compiled.graph.edge_count(),
            "compiled workbook"
        );
        Ok(compiled)
    }

    fn resolve_names(&mut self) -> BuildResult<()> {
        for defined in self.workbook.defined_names() {
            let sheet_name = defined.target.sheet();
            let sheet = self
                .workbook
                .sheet_index(sheet_name)
                .ok_or_else(|| Error::SheetNotFound(sheet_name.to_string()))?;
            let resolved = match &defined.target {
                NameTarget::Cell(cell) => ResolvedName::Cell(CellKey::from_address(sheet, &cell.address)),
                NameTarget::Range { range, .. } => ResolvedName::Range {
                    sheet,
                    range: *range,
                },
            };
            self.names.insert(defined.key(), resolved);
        }
        Ok(())
    }

    /// Phase 1: every defined cell, formulas parsed and checked
    fn collect_cells(&mut self) -> BuildResult<()> {
        let mut collected = Vec::new();
        for (sheet_idx, sheet) in self.workbook.sheets().iter().enumerate() {
            for (address, content) in sheet.cells() {
                let key = CellKey::from_address(sheet_idx, address);
                let source = match content {
                    CellContent::Value(value) => CellSource::Literal(value.clone()),
                    CellContent::Formula(text) => {
                        let formula_error = |source: FormulaError| BuildError::Formula {
                            cell: SheetCell::new(sheet.name(), *address).to_a1_string(),
                            source,
                        };
                        let ast = parse_formula(text).map_err(formula_error)?;
                        validate_functions(&ast).map_err(formula_error)?;
                        CellSource::Formula {
                            source: text.clone(),
                            ast,
                        }
                    }
                };
                collected.push(CompiledCell { key, source });
            }
        }
        for cell in collected {
            self.push(cell);
        }
        Ok(())
    }

    /// Declared input, section and output cells always exist, even when the
    /// sheet leaves them undefined
    fn collect_declared_cells(&mut self) -> BuildResult<()> {
        let declared: Vec<SheetCell> = self
            .workbook
            .inputs()
            .values()
            .map(|decl| decl.cell.clone())
            .chain(
                self.workbook
                    .sections()
                    .values()
                    .flat_map(|decl| [decl.labor.clone(), decl.material.clone()]),
            )
            .chain(self.workbook.outputs().values().map(|decl| decl.cell.clone()))
            .collect();

        for cell in declared {
            let sheet = self
                .workbook
                .sheet_index(&cell.sheet)
                .ok_or_else(|| Error::SheetNotFound(cell.sheet.clone()))?;
            if self.cell_id_at(sheet, &cell.address).is_none() {
                self.push(CompiledCell {
                    key: CellKey::from_address(sheet, &cell.address),
                    source: CellSource::Literal(CellValue::Empty),
                });
            }
        }
        Ok(())
    }

    fn push(&mut self, cell: CompiledCell) -> CellId {
        let id = CellId(self.cells.len() as u32);
        if cell.is_formula() {
            self.formulas += 1;
        }
        self.lookup[cell.key.sheet].insert(cell.key.address(), id);
        self.cells.push(cell);
        id
    }

    /// Phase 2: edges from every referenced cell to the formula reading it,
    /// then a whole-graph topological order
    fn build_graph(&mut self) -> BuildResult<()> {
        let mut graph = DependencyGraph::new();
        for index in 0..self.cells.len() {
            graph.add_node(CellId(index as u32));
        }

        for (index, cell) in self.cells.iter().enumerate() {
            let CellSource::Formula { ast, .. } = &cell.source else {
                continue;
            };
            let precedents = self.precedents(cell.key.sheet, ast).map_err(|source| {
                BuildError::Formula {
                    cell: self.cell_name(CellId(index as u32)),
                    source,
                }
            })?;
            for precedent in precedents {
                graph.add_dependency(precedent, CellId(index as u32));
            }
        }

        let order = graph.topological_order().map_err(|cycle| GraphCycleError {
            path: cycle.path.iter().map(|id| self.cell_name(*id)).collect(),
        })?;

        let mut rank = vec![0u32; self.cells.len()];
        for (position, id) in order.iter().enumerate() {
            rank[id.index()] = position as u32;
        }

        self.graph = graph;
        self.rank = rank;
        Ok(())
    }

    /// Defined cells a formula reads
    ///
    /// Undefined addresses read as empty and contribute no edge.
    fn precedents(&self, sheet: usize, ast: &FormulaExpr) -> Result<Vec<CellId>, FormulaError> {
        let mut found = Vec::new();
        let mut problem = None;

        ast.walk(&mut |node| {
            if problem.is_some() {
                return;
            }
            let resolved = match node {
                FormulaExpr::CellRef(r) => self
                    .resolve_sheet(sheet, r.sheet.as_deref())
                    .map(|s| ResolvedName::Cell(CellKey::from_address(s, &r.address))),
                FormulaExpr::RangeRef(r) => self
                    .resolve_sheet(sheet, r.sheet.as_deref())
                    .map(|s| ResolvedName::Range {
                        sheet: s,
                        range: r.range,
                    }),
                FormulaExpr::NameRef(name) => self
                    .name(name)
                    .ok_or_else(|| FormulaError::InvalidReference(format!("unknown name '{}'", name))),
                _ => return,
            };
            match resolved {
                Ok(ResolvedName::Cell(key)) => {
                    found.extend(self.cell_id_at(key.sheet, &key.address()));
                }
                Ok(ResolvedName::Range { sheet, range }) => {
                    found.extend(self.cells_in(sheet, &range).map(|(_, id)| id));
                }
                Err(e) => problem = Some(e),
            }
        });

        match problem {
            Some(e) => Err(e),
            None => Ok(found),
        }
    }

    fn resolve_sheet(&self, current: usize, sheet: Option<&str>) -> Result<usize, FormulaError> {
        match sheet {
            None => Ok(current),
            Some(name) => self
                .workbook
                .sheet_index(name)
                .ok_or_else(|| FormulaError::InvalidReference(format!("unknown sheet '{}'", name))),
        }
    }

    // === Queries ===

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    pub fn cells(&self) -> &[CompiledCell] {
        &self.cells
    }

    pub fn cell(&self, id: CellId) -> &CompiledCell {
        &self.cells[id.index()]
    }

    pub fn graph(&self) -> &DependencyGraph<CellId> {
        &self.graph
    }

    /// Sheet index for a reference made from sheet `current`
    pub fn sheet_for(&self, current: usize, sheet: Option<&str>) -> Option<usize> {
        self.resolve_sheet(current, sheet).ok()
    }

    pub fn sheet_name(&self, sheet: usize) -> &str {
        self.workbook
            .sheet_at(sheet)
            .map_or("", |sheet| sheet.name())
    }

    pub fn cell_id(&self, cell: &SheetCell) -> Option<CellId> {
        let sheet = self.workbook.sheet_index(&cell.sheet)?;
        self.cell_id_at(sheet, &cell.address)
    }

    pub fn cell_id_at(&self, sheet: usize, address: &CellAddress) -> Option<CellId> {
        self.lookup.get(sheet)?.get(&address.position()).copied()
    }

    /// Compiled cells inside `range`, row-major
    pub fn cells_in<'a>(
        &'a self,
        sheet: usize,
        range: &CellRange,
    ) -> impl Iterator<Item = (CellAddress, CellId)> + 'a {
        let lo = CellAddress::new(range.start.row, 0);
        let hi = CellAddress::new(range.end.row, u16::MAX);
        let range = *range;
        self.lookup
            .get(sheet)
            .into_iter()
            .flat_map(move |cells| cells.range(lo..=hi))
            .filter(move |(address, _)| range.contains(address))
            .map(|(address, id)| (*address, *id))
    }

    /// Case-insensitive defined-name lookup
    pub fn name(&self, name: &str) -> Option<ResolvedName> {
        self.names.get(&name.to_uppercase()).copied()
    }

    /// `Sheet!A1` label for a cell
    pub fn cell_name(&self, id: CellId) -> String {
        let key = self.cell(id).key;
        SheetCell::new(self.sheet_name(key.sheet), key.address()).to_a1_string()
    }

    /// Cells the targets need, precedents first
    pub fn evaluation_order(&self, targets: &[CellId]) -> Vec<CellId> {
        let mut order = self.graph.reachable_from(targets);
        order.sort_by_key(|id| self.rank[id.index()]);
        order
    }

    pub fn stats(&self) -> WorkbookStats {
        WorkbookStats {
            sheets: self.lookup.len(),
            cells: self.cells.len(),
            formulas: self.formulas,
            edges: self.graph.edge_count(),
            inputs: self.workbook.inputs().len(),
            sections: self.workbook.sections().len(),
            outputs: self.workbook.outputs().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compile(json: &str) -> BuildResult<CompiledWorkbook> {
        CompiledWorkbook::compile(Workbook::from_json_str(json).unwrap())
    }

    fn id(compiled: &CompiledWorkbook, cell: &str) -> CellId {
        compiled.cell_id(&SheetCell::parse(cell).unwrap()).unwrap()
    }

    const TWO_SHEETS: &str = r#"{
        "name": "demo", "version": "1",
        "sheets": [
            { "name": "Inputs", "cells": { "B2": 100, "B3": 2 } },
            { "name": "Calc", "cells": {
                "A1": "=Inputs!B2*Inputs!B3",
                "A2": "=SUM(Inputs!B1:B9)",
                "A3": "=A1+Qty",
                "A4": "=Z99"
            } }
        ],
        "names": { "Qty": "Inputs!$B$3" },
        "sections": { "walls": { "labor": "Calc!A1", "material": "Calc!F1" } }
    }"#;

    #[test]
    fn test_compile_resolves_references() {
        let compiled = compile(TWO_SHEETS).unwrap();
        let a1 = id(&compiled, "Calc!A1");
        let precedents: Vec<_> = compiled.graph().precedents(&a1).collect();
        assert_eq!(
            precedents,
            vec![id(&compiled, "Inputs!B2"), id(&compiled, "Inputs!B3")]
        );

        // Ranges depend on defined cells only
        let a2 = id(&compiled, "Calc!A2");
        assert_eq!(compiled.graph().precedents(&a2).count(), 2);

        // Names resolve to their target
        let a3 = id(&compiled, "Calc!A3");
        assert!(compiled.graph().precedents(&a3).any(|p| p == id(&compiled, "Inputs!B3")));

        // Undefined cells read as empty and add no edge
        let a4 = id(&compiled, "Calc!A4");
        assert_eq!(compiled.graph().precedents(&a4).count(), 0);
    }

    #[test]
    fn test_declared_cells_exist() {
        let compiled = compile(TWO_SHEETS).unwrap();
        let f1 = id(&compiled, "Calc!F1");
        assert!(matches!(
            compiled.cell(f1).source,
            CellSource::Literal(CellValue::Empty)
        ));
    }

    #[test]
    fn test_stats() {
        let stats = compile(TWO_SHEETS).unwrap().stats();
        assert_eq!(
            stats,
            WorkbookStats {
                sheets: 2,
                cells: 7,
                formulas: 4,
                edges: 6,
                inputs: 0,
                sections: 1,
                outputs: 0,
            }
        );
    }

    #[test]
    fn test_evaluation_order_is_partial() {
        let compiled = compile(TWO_SHEETS).unwrap();
        let a3 = id(&compiled, "Calc!A3");
        let order = compiled.evaluation_order(&[a3]);
        let names: Vec<_> = order.iter().map(|id| compiled.cell_name(*id)).collect();

        assert_eq!(names.len(), 4);
        assert_eq!(names.last().map(String::as_str), Some("Calc!A3"));
        let pos = |n: &str| names.iter().position(|x| x == n).unwrap();
        assert!(pos("Calc!A1") < pos("Calc!A3"));
        assert!(!names.contains(&"Calc!A2".to_string()));
    }

    #[test]
    fn test_rejects_cycles() {
        let err = compile(
            r#"{ "name": "loop", "version": "1", "sheets": [
                { "name": "S", "cells": { "A1": "=C1+1", "B1": "=A1", "C1": "=B1", "D1": 5 } }
            ] }"#,
        )
        .unwrap_err();

        let BuildError::Cycle(cycle) = err else {
            panic!("expected a cycle, got {err:?}");
        };
        assert_eq!(cycle.path.len(), 4);
        assert_eq!(cycle.path.first(), cycle.path.last());
        assert!(cycle.to_string().starts_with("Circular reference: S!"));
    }

    #[test]
    fn test_rejects_bad_formulas() {
        let bad = |cells: &str| {
            compile(&format!(
                r#"{{ "name": "bad", "version": "1", "sheets": [{{ "name": "S", "cells": {cells} }}] }}"#
            ))
            .unwrap_err()
        };

        assert!(matches!(
            bad(r#"{ "A1": "=1+" }"#),
            BuildError::Formula { source: FormulaError::Parse(_), .. }
        ));
        assert!(matches!(
            bad(r#"{ "A1": "=NOPE(1)" }"#),
            BuildError::Formula { source: FormulaError::UnknownFunction(_), .. }
        ));
        assert!(matches!(
            bad(r#"{ "A1": "=ROUND()" }"#),
            BuildError::Formula { source: FormulaError::ArgumentCount { .. }, .. }
        ));
        assert!(matches!(
            bad(r#"{ "A1": "=Missing!A1" }"#),
            BuildError::Formula { source: FormulaError::InvalidReference(_), .. }
        ));
        let err = bad(r#"{ "A1": "=Nowhere*2" }"#);
        assert_eq!(
            err.to_string(),
            "Formula error in S!A1: Invalid reference: unknown name 'Nowhere'"
        );
    }
}
