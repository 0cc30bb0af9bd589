//! Bidirectional Dependency Index
//!
//! Signals and computations live in id-addressed maps. Every edge is stored
//! twice: in the signal's subscriber set and in the computation's dependency
//! set. All edge mutations go through this type so both sides change
//! together.

use std::collections::HashMap;

use super::node::{ComputationNode, SignalNode, Status};
use crate::reactive::{ComputationId, SignalId};

/// The dependency graph between signals and computations.
#[derive(Debug, Default)]
pub(crate) struct DependencyGraph {
    signals: HashMap<SignalId, SignalNode>,
    computations: HashMap<ComputationId, ComputationNode>,
}

impl DependencyGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Register a fresh signal.
    pub(crate) fn add_signal(&mut self, id: SignalId) {
        self.signals.insert(id, SignalNode::new());
    }

    /// Remove a signal and every edge touching it.
    pub(crate) fn remove_signal(&mut self, id: SignalId) {
        if let Some(node) = self.signals.remove(&id) {
            for subscriber in node.subscribers {
                if let Some(computation) = self.computations.get_mut(&subscriber) {
                    computation.dependencies.shift_remove(&id);
                }
            }
        }
    }

    /// Register a computation.
    pub(crate) fn add_computation(&mut self, id: ComputationId, node: ComputationNode) {
        self.computations.insert(id, node);
    }

    /// Remove a computation and every edge touching it.
    ///
    /// The node is handed back so the caller can drop its closures after
    /// releasing any borrow of the graph.
    pub(crate) fn remove_computation(&mut self, id: ComputationId) -> Option<ComputationNode> {
        self.release_dependencies(id);
        self.computations.remove(&id)
    }

    pub(crate) fn signal(&self, id: SignalId) -> Option<&SignalNode> {
        self.signals.get(&id)
    }

    pub(crate) fn signal_mut(&mut self, id: SignalId) -> Option<&mut SignalNode> {
        self.signals.get_mut(&id)
    }

    pub(crate) fn computation(&self, id: ComputationId) -> Option<&ComputationNode> {
        self.computations.get(&id)
    }

    pub(crate) fn computation_mut(&mut self, id: ComputationId) -> Option<&mut ComputationNode> {
        self.computations.get_mut(&id)
    }

    pub(crate) fn contains_computation(&self, id: ComputationId) -> bool {
        self.computations.contains_key(&id)
    }

    /// Add a dependency edge: `computation` reads `signal`.
    pub(crate) fn add_edge(&mut self, signal: SignalId, computation: ComputationId) {
        let (Some(signal_node), Some(computation_node)) = (
            self.signals.get_mut(&signal),
            self.computations.get_mut(&computation),
        ) else {
            return;
        };
        signal_node.subscribers.insert(computation);
        computation_node.dependencies.insert(signal);
    }

    /// Remove a dependency edge.
    pub(crate) fn remove_edge(&mut self, signal: SignalId, computation: ComputationId) {
        if let Some(node) = self.signals.get_mut(&signal) {
            node.subscribers.shift_remove(&computation);
        }
        if let Some(node) = self.computations.get_mut(&computation) {
            node.dependencies.shift_remove(&signal);
        }
    }

    /// Remove every edge from `computation` to the signals it read.
    pub(crate) fn release_dependencies(&mut self, computation: ComputationId) {
        let dependencies: Vec<SignalId> = self
            .computations
            .get(&computation)
            .map(|node| node.dependencies.iter().copied().collect())
            .unwrap_or_default();
        for signal in dependencies {
            self.remove_edge(signal, computation);
        }
    }

    /// Subscribers of `signal` in subscription order, minus `except`.
    pub(crate) fn subscribers(
        &self,
        signal: SignalId,
        except: Option<ComputationId>,
    ) -> Vec<ComputationId> {
        self.signals
            .get(&signal)
            .map(|node| {
                node.subscribers
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != except)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether every dependency of `computation` currently reports stable.
    /// Signals that no longer exist count as stable.
    pub(crate) fn dependencies_stable(&self, computation: ComputationId) -> bool {
        self.computations
            .get(&computation)
            .map(|node| {
                node.dependencies.iter().all(|signal| {
                    self.signals
                        .get(signal)
                        .map_or(true, |s| s.status == Status::Stable)
                })
            })
            .unwrap_or(true)
    }

    pub(crate) fn signal_count(&self) -> usize {
        self.signals.len()
    }

    pub(crate) fn computation_count(&self) -> usize {
        self.computations.len()
    }
}
