use std::iter;

use hitch_core::BlockIndices;
use petgraph::{
    Direction,
    algo::toposort,
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
};

use super::Entry;

/// The blocks a consumer reads from a producer's outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub arguments: BlockIndices,
    pub derivatives: BlockIndices,
}

impl Dependency {
    /// Returns the blocks `consumer` reads from `producer`, if any.
    fn between(producer: &Entry, consumer: &Entry) -> Option<Self> {
        let arguments = consumer.in_arg().intersection(producer.out_arg());
        let derivatives = consumer.in_der().intersection(producer.out_der());
        (!arguments.is_empty() || !derivatives.is_empty()).then_some(Self {
            arguments,
            derivatives,
        })
    }
}

/// Producer-to-consumer edges between entries, with a cached evaluation order.
///
/// Node weights are entry indices; node `i` is always entry `i`.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<usize, Dependency>,
    order: Vec<usize>,
}

/// An entry that would close a cycle, reported by [`DependencyGraph::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Cycle {
    pub(super) through: usize,
}

impl DependencyGraph {
    /// Adds `candidate` as entry `entries.len()` and refreshes the order.
    ///
    /// Edges are added in both directions, since a new entry may produce
    /// blocks an earlier entry reads. If the new edges close a cycle, the
    /// graph is left unchanged.
    pub(super) fn insert(&mut self, entries: &[Entry], candidate: &Entry) -> Result<(), Cycle> {
        let index = entries.len();
        let node = self.graph.add_node(index);

        let others = entries.iter().enumerate().chain(iter::once((index, candidate)));
        for (other_index, other) in others {
            let other_node = NodeIndex::new(other_index);
            if let Some(dependency) = Dependency::between(other, candidate) {
                self.graph.add_edge(other_node, node, dependency);
            }
            if other_index == index {
                continue;
            }
            if let Some(dependency) = Dependency::between(candidate, other) {
                self.graph.add_edge(node, other_node, dependency);
            }
        }

        match toposort(&self.graph, None) {
            Ok(sorted) => {
                self.order = sorted.into_iter().map(|n| self.graph[n]).collect();
                Ok(())
            }
            Err(cycle) => {
                let through = self.graph[cycle.node_id()];
                self.graph.remove_node(node);
                Err(Cycle { through })
            }
        }
    }

    /// Entry indices in evaluation order: producers before consumers.
    #[must_use]
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    /// Returns the entries whose outputs `index` reads, with the shared blocks.
    pub fn producers(&self, index: usize) -> impl Iterator<Item = (usize, &Dependency)> + '_ {
        self.graph
            .edges_directed(NodeIndex::new(index), Direction::Incoming)
            .map(|edge| (self.graph[edge.source()], edge.weight()))
    }

    /// Returns the number of producer-to-consumer edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }
}
