//! Heuristic dependency graph
//!
//! The graph approximates "may depend on" from the declared flags alone. It
//! is not a data or control dependency analysis.
//!
//! ## Edge Rule
//!
//! For each order-sensitive operation `a`, add an edge `a → b` to every other
//! operation `b` where `b` is also order-sensitive OR `b.name() != a.name()`.
//! Operations not flagged order-sensitive have no outgoing edges but may be
//! edge targets.
//!
//! The rule over-includes: it yields pairs that may well commute, and never
//! omits a pair with a sensitive operation on either side unless both share
//! a name and only one is flagged.
//!
//! Edges are recorded by index, so two instances sharing a name stay
//! distinct. Direction carries no meaning for the detectors; candidate pairs
//! are undirected.

use ordersense_core::OperationRef;
use std::collections::BTreeSet;

/// May-depend-on relation over an operation slice, by index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    edges: Vec<Vec<usize>>,
    sensitive: Vec<bool>,
}

impl DependencyGraph {
    /// Build the graph for `operations`
    pub fn build(operations: &[OperationRef]) -> Self {
        let sensitive: Vec<bool> = operations.iter().map(|op| op.is_order_sensitive()).collect();
        let mut edges = vec![Vec::new(); operations.len()];

        for (i, a) in operations.iter().enumerate() {
            if !sensitive[i] {
                continue;
            }
            for (j, b) in operations.iter().enumerate() {
                if i != j && (sensitive[j] || a.name() != b.name()) {
                    edges[i].push(j);
                }
            }
        }

        DependencyGraph { edges, sensitive }
    }

    /// Number of operations the graph covers
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Whether the graph covers no operations
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Indices operation `i` may depend on
    pub fn dependencies_of(&self, i: usize) -> &[usize] {
        self.edges.get(i).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Total directed edges
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Whether any edge exists
    pub fn has_edges(&self) -> bool {
        self.edges.iter().any(|e| !e.is_empty())
    }

    /// Undirected candidate pairs `(i, j)` with `i < j`, in lexicographic order
    ///
    /// With no edges at all, falls back to every pair of order-sensitive
    /// operations.
    pub fn candidate_pairs(&self) -> Vec<(usize, usize)> {
        let mut pairs = BTreeSet::new();
        for (i, deps) in self.edges.iter().enumerate() {
            for &j in deps {
                pairs.insert((i.min(j), i.max(j)));
            }
        }

        if pairs.is_empty() {
            let sensitive: Vec<usize> = (0..self.sensitive.len())
                .filter(|&i| self.sensitive[i])
                .collect();
            for (k, &i) in sensitive.iter().enumerate() {
                for &j in &sensitive[k + 1..] {
                    pairs.insert((i, j));
                }
            }
        }

        pairs.into_iter().collect()
    }
}
