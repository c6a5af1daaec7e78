//! Dependency tracking for formula calculation
//!
//! Nodes are stored densely in insertion order, so every traversal below is
//! deterministic for a given build order.

use crate::error::FormulaError;
use ahash::{AHashMap, AHashSet};
use paintcalc_core::CellAddress;
use std::collections::VecDeque;
use std::hash::Hash;

/// Unique key for a cell (sheet index + position)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub sheet: usize,
    pub row: u32,
    pub col: u16,
}

impl CellKey {
    pub fn new(sheet: usize, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }

    /// Key for an address; `$` markers are ignored
    pub fn from_address(sheet: usize, addr: &CellAddress) -> Self {
        Self::new(sheet, addr.row, addr.col)
    }

    pub fn address(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

/// A circular chain of nodes, first node repeated at the end
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle<K> {
    pub path: Vec<K>,
}

impl<K> Cycle<K> {
    /// Turn the cycle into a [`FormulaError::CircularReference`], naming
    /// each node with `name`
    pub fn into_error(self, name: impl Fn(&K) -> String) -> FormulaError {
        FormulaError::CircularReference {
            path: self.path.iter().map(name).collect(),
        }
    }
}

/// Directed graph: an edge runs from a precedent to the cell that reads it
#[derive(Debug, Clone)]
pub struct DependencyGraph<K = CellKey> {
    index: AHashMap<K, usize>,
    nodes: Vec<K>,
    /// Node → nodes it reads
    precedents: Vec<Vec<usize>>,
    /// Node → nodes that read it
    dependents: Vec<Vec<usize>>,
    edges: AHashSet<(usize, usize)>,
}

impl<K> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self {
            index: AHashMap::new(),
            nodes: Vec::new(),
            precedents: Vec::new(),
            dependents: Vec::new(),
            edges: AHashSet::new(),
        }
    }
}

impl<K: Copy + Eq + Hash> DependencyGraph<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node if it is not there yet; returns its dense index
    pub fn add_node(&mut self, key: K) -> usize {
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.nodes.len();
        self.index.insert(key, i);
        self.nodes.push(key);
        self.precedents.push(Vec::new());
        self.dependents.push(Vec::new());
        i
    }

    /// Add a dependency: `dependent` reads `precedent`
    ///
    /// Duplicate edges are ignored.
    pub fn add_dependency(&mut self, precedent: K, dependent: K) {
        let p = self.add_node(precedent);
        let d = self.add_node(dependent);
        if self.edges.insert((p, d)) {
            self.dependents[p].push(d);
            self.precedents[d].push(p);
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[K] {
        &self.nodes
    }

    /// Cells the given cell reads
    pub fn precedents(&self, key: &K) -> impl Iterator<Item = K> + '_ {
        self.neighbours(key, &self.precedents)
    }

    /// Cells that read the given cell
    pub fn dependents(&self, key: &K) -> impl Iterator<Item = K> + '_ {
        self.neighbours(key, &self.dependents)
    }

    fn neighbours<'a>(&'a self, key: &K, adjacency: &'a [Vec<usize>]) -> impl Iterator<Item = K> + 'a {
        self.index
            .get(key)
            .into_iter()
            .flat_map(move |&i| adjacency[i].iter().map(move |&j| self.nodes[j]))
    }

    /// Every node, precedents before dependents (Kahn's algorithm)
    pub fn topological_order(&self) -> Result<Vec<K>, Cycle<K>> {
        let all: Vec<bool> = vec![true; self.nodes.len()];
        self.kahn(&all)
    }

    /// Nodes the targets transitively read, targets included
    pub fn reachable_from(&self, targets: &[K]) -> Vec<K> {
        let mask = self.backward_mask(targets);
        self.nodes
            .iter()
            .zip(&mask)
            .filter(|(_, keep)| **keep)
            .map(|(k, _)| *k)
            .collect()
    }

    /// Evaluation order for just the subgraph the targets need
    ///
    /// Targets that are not in the graph are ignored.
    pub fn order_for(&self, targets: &[K]) -> Result<Vec<K>, Cycle<K>> {
        let mask = self.backward_mask(targets);
        self.kahn(&mask)
    }

    fn backward_mask(&self, targets: &[K]) -> Vec<bool> {
        let mut mask = vec![false; self.nodes.len()];
        let mut stack: Vec<usize> = targets.iter().filter_map(|k| self.index.get(k).copied()).collect();
        while let Some(i) = stack.pop() {
            if mask[i] {
                continue;
            }
            mask[i] = true;
            stack.extend(self.precedents[i].iter().copied().filter(|&p| !mask[p]));
        }
        mask
    }

    fn kahn(&self, included: &[bool]) -> Result<Vec<K>, Cycle<K>> {
        let mut in_degree: Vec<usize> = (0..self.nodes.len())
            .map(|i| {
                if included[i] {
                    self.precedents[i].iter().filter(|&&p| included[p]).count()
                } else {
                    0
                }
            })
            .collect();

        let mut queue: VecDeque<usize> = (0..self.nodes.len())
            .filter(|&i| included[i] && in_degree[i] == 0)
            .collect();
        let mut order = Vec::with_capacity(queue.len());

        while let Some(i) = queue.pop_front() {
            order.push(i);
            for &d in &self.dependents[i] {
                if !included[d] {
                    continue;
                }
                in_degree[d] -= 1;
                if in_degree[d] == 0 {
                    queue.push_back(d);
                }
            }
        }

        let expected = included.iter().filter(|&&b| b).count();
        if order.len() < expected {
            return Err(self.find_cycle(included, &in_degree));
        }
        Ok(order.into_iter().map(|i| self.nodes[i]).collect())
    }

    /// Walk precedents among the nodes Kahn could not release
    ///
    /// Every such node still waits on another such node, so the walk must
    /// eventually revisit one.
    fn find_cycle(&self, included: &[bool], in_degree: &[usize]) -> Cycle<K> {
        let stuck = |i: usize| included[i] && in_degree[i] > 0;
        let mut path: Vec<usize> = Vec::new();
        let mut position: AHashMap<usize, usize> = AHashMap::new();
        let mut current = (0..self.nodes.len()).find(|&i| stuck(i));

        while let Some(i) = current {
            if let Some(&start) = position.get(&i) {
                let mut cycle: Vec<K> = path[start..].iter().map(|&j| self.nodes[j]).collect();
                cycle.push(self.nodes[i]);
                return Cycle { path: cycle };
            }
            position.insert(i, path.len());
            path.push(i);
            current = self.precedents[i].iter().copied().find(|&p| stuck(p));
        }

        // Unreachable while the in-degree bookkeeping is consistent
        Cycle {
            path: path.into_iter().map(|j| self.nodes[j]).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(col: u16) -> CellKey {
        CellKey::new(0, 0, col)
    }

    fn position_of(order: &[CellKey], k: CellKey) -> usize {
        order.iter().position(|&o| o == k).unwrap()
    }

    #[test]
    fn test_add_dependency() {
        let mut graph = DependencyGraph::new();
        let (a1, b1) = (key(0), key(1));

        graph.add_dependency(a1, b1);
        graph.add_dependency(a1, b1);

        assert!(graph.dependents(&a1).any(|c| c == b1));
        assert!(graph.precedents(&b1).any(|c| c == a1));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_topological_order() {
        // D1 = B1 + C1, B1 = A1, C1 = A1
        let mut graph = DependencyGraph::new();
        let (a, b, c, d) = (key(0), key(1), key(2), key(3));
        graph.add_dependency(b, d);
        graph.add_dependency(c, d);
        graph.add_dependency(a, b);
        graph.add_dependency(a, c);

        let order = graph.topological_order().unwrap();
        assert_eq!(order.len(), 4);
        assert!(position_of(&order, a) < position_of(&order, b));
        assert!(position_of(&order, a) < position_of(&order, c));
        assert!(position_of(&order, b) < position_of(&order, d));
        assert!(position_of(&order, c) < position_of(&order, d));
    }

    #[test]
    fn test_cycle_reports_path() {
        // A1 -> B1 -> C1 -> A1
        let mut graph = DependencyGraph::new();
        let (a, b, c) = (key(0), key(1), key(2));
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, a);

        let cycle = graph.topological_order().unwrap_err();
        assert_eq!(cycle.path.len(), 4);
        assert_eq!(cycle.path.first(), cycle.path.last());

        let err = cycle.into_error(|k| k.address().to_a1_string());
        assert!(matches!(&err, FormulaError::CircularReference { path } if path.len() == 4));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut graph = DependencyGraph::new();
        graph.add_dependency(key(0), key(0));
        let cycle = graph.topological_order().unwrap_err();
        assert_eq!(cycle.path, vec![key(0), key(0)]);
    }

    #[test]
    fn test_cycle_behind_acyclic_prefix() {
        let mut graph = DependencyGraph::new();
        let (a, b, c) = (key(0), key(1), key(2));
        graph.add_dependency(a, b);
        graph.add_dependency(b, c);
        graph.add_dependency(c, b);

        let cycle = graph.topological_order().unwrap_err();
        assert!(!cycle.path.contains(&a));
    }

    #[test]
    fn test_partial_order_for_targets() {
        // Two independent chains: A1 -> B1 and C1 -> D1
        let mut graph = DependencyGraph::new();
        let (a, b, c, d) = (key(0), key(1), key(2), key(3));
        graph.add_dependency(a, b);
        graph.add_dependency(c, d);

        assert_eq!(graph.order_for(&[b]).unwrap(), vec![a, b]);
        assert_eq!(graph.reachable_from(&[d]), vec![c, d]);
        assert_eq!(graph.order_for(&[key(9)]).unwrap(), Vec::<CellKey>::new());
    }

    #[test]
    fn test_partial_order_skips_unrelated_cycle() {
        let mut graph = DependencyGraph::new();
        let (a, b, c, d) = (key(0), key(1), key(2), key(3));
        graph.add_dependency(a, b);
        graph.add_dependency(c, d);
        graph.add_dependency(d, c);

        assert_eq!(graph.order_for(&[b]).unwrap(), vec![a, b]);
        assert!(graph.order_for(&[d]).is_err());
    }
}
