//! Graph Nodes
//!
//! This module defines the cells that live in the dependency graph and the
//! handles used to address them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexSet;
use smallvec::SmallVec;

use super::compute::ComputeFn;

/// Unique identifier for a graph.
///
/// Every handle minted by a graph carries this, so handles from one graph
/// are never mistaken for cells of another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct GraphId(u64);

impl GraphId {
    /// Generate a new unique graph ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// Handle to a cell owned by a [`Graph`](super::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellId {
    graph: GraphId,
    index: usize,
}

impl CellId {
    pub(crate) fn new(graph: GraphId, index: usize) -> Self {
        Self { graph, index }
    }

    pub(crate) fn graph(&self) -> GraphId {
        self.graph
    }

    /// Position of the cell in its graph's arena.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.index)
    }
}

/// Direct dependencies of a cell, in the order its compute function sees them.
pub(crate) type Dependencies = SmallVec<[CellId; 4]>;

/// The kind of cell.
pub enum NodeKind<T> {
    /// A source cell. Its value is only ever assigned from outside.
    Source,

    /// A derived cell. Its value is computed from its dependencies once a
    /// compute function has been assigned.
    Derived { compute: Option<ComputeFn<T>> },
}

impl<T> fmt::Debug for NodeKind<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Source => f.write_str("Source"),
            NodeKind::Derived { compute } => f
                .debug_struct("Derived")
                .field("has_compute", &compute.is_some())
                .finish(),
        }
    }
}

/// A cell in the dependency graph.
pub(crate) struct Node<T> {
    kind: NodeKind<T>,

    /// `None` only for a derived cell that has never been computed.
    value: Option<T>,

    /// Set while the cell's value changed during the running propagation pass.
    marked: bool,

    /// The value held before the change that set `marked`.
    previous: Option<T>,

    /// Cells this cell reads from (parents in the DAG).
    dependencies: Dependencies,

    /// Cells that list this cell as a direct dependency.
    consumers: IndexSet<CellId>,

    /// Every cell downstream of this one, flattened, in topological order.
    dependants: IndexSet<CellId>,
}

impl<T> Node<T> {
    /// Create a new source node holding `value`.
    pub(crate) fn source(value: T) -> Self {
        Self {
            kind: NodeKind::Source,
            value: Some(value),
            marked: false,
            previous: None,
            dependencies: Dependencies::new(),
            consumers: IndexSet::new(),
            dependants: IndexSet::new(),
        }
    }

    /// Create a new derived node with no compute function and no value.
    pub(crate) fn derived(dependencies: Dependencies) -> Self {
        Self {
            kind: NodeKind::Derived { compute: None },
            value: None,
            marked: false,
            previous: None,
            dependencies,
            consumers: IndexSet::new(),
            dependants: IndexSet::new(),
        }
    }

    pub(crate) fn kind(&self) -> &NodeKind<T> {
        &self.kind
    }

    pub(crate) fn is_source(&self) -> bool {
        matches!(self.kind, NodeKind::Source)
    }

    pub(crate) fn compute(&self) -> Option<&ComputeFn<T>> {
        match &self.kind {
            NodeKind::Source => None,
            NodeKind::Derived { compute } => compute.as_ref(),
        }
    }

    /// Replace the compute function. Returns `false` if `compute` is the
    /// function already installed, or if this is a source cell.
    pub(crate) fn replace_compute(&mut self, compute: ComputeFn<T>) -> bool {
        match &mut self.kind {
            NodeKind::Source => false,
            NodeKind::Derived { compute: slot } => {
                if slot.as_ref().is_some_and(|current| current.same_as(&compute)) {
                    return false;
                }
                *slot = Some(compute);
                true
            }
        }
    }

    pub(crate) fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub(crate) fn take_value(&mut self) -> Option<T> {
        self.value.take()
    }

    /// Seed the value without marking the cell as changed.
    pub(crate) fn preset(&mut self, value: T) {
        self.value = Some(value);
    }

    pub(crate) fn is_marked(&self) -> bool {
        self.marked
    }

    /// The value to hand to compute functions as "previous": the pre-change
    /// value while marked, the current value otherwise.
    pub(crate) fn previous_or_current(&self) -> Option<&T> {
        if self.marked {
            self.previous.as_ref().or(self.value.as_ref())
        } else {
            self.value.as_ref()
        }
    }

    pub(crate) fn clear_mark(&mut self) {
        self.marked = false;
        self.previous = None;
    }

    pub(crate) fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    pub(crate) fn replace_dependencies(&mut self, dependencies: Dependencies) -> Dependencies {
        std::mem::replace(&mut self.dependencies, dependencies)
    }

    pub(crate) fn consumers(&self) -> &IndexSet<CellId> {
        &self.consumers
    }

    pub(crate) fn add_consumer(&mut self, id: CellId) {
        self.consumers.insert(id);
    }

    /// Returns `false` if `id` was not a consumer.
    pub(crate) fn remove_consumer(&mut self, id: CellId) -> bool {
        self.consumers.shift_remove(&id)
    }

    pub(crate) fn dependants(&self) -> &IndexSet<CellId> {
        &self.dependants
    }

    /// Append a dependant. Returns `false` if it was already present.
    pub(crate) fn add_dependant(&mut self, id: CellId) -> bool {
        self.dependants.insert(id)
    }

    pub(crate) fn remove_dependant(&mut self, id: CellId) -> bool {
        self.dependants.shift_remove(&id)
    }

    pub(crate) fn replace_dependants(&mut self, dependants: IndexSet<CellId>) {
        self.dependants = dependants;
    }
}

impl<T: PartialEq> Node<T> {
    /// Store `value` if it differs from the current one, keeping the old
    /// value as the previous-value marker. Returns whether anything changed.
    pub(crate) fn assign(&mut self, value: T) -> bool {
        if self.value.as_ref() == Some(&value) {
            return false;
        }
        self.previous = self.value.replace(value);
        self.marked = true;
        true
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("kind", &self.kind)
            .field("value", &self.value)
            .field("marked", &self.marked)
            .field("dependencies", &self.dependencies)
            .field("dependants", &self.dependants)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(graph: GraphId, index: usize) -> CellId {
        CellId::new(graph, index)
    }

    #[test]
    fn graph_ids_are_unique() {
        assert_ne!(GraphId::new(), GraphId::new());
    }

    #[test]
    fn cell_ids_from_different_graphs_differ() {
        let a = id(GraphId::new(), 0);
        let b = id(GraphId::new(), 0);
        assert_ne!(a, b);
        assert_eq!(a.index(), b.index());
        assert_eq!(a.to_string(), "cell#0");
    }

    #[test]
    fn source_node_starts_with_value() {
        let node = Node::source(7);
        assert!(node.is_source());
        assert_eq!(node.value(), Some(&7));
        assert!(!node.is_marked());
    }

    #[test]
    fn derived_node_starts_without_value() {
        let graph = GraphId::new();
        let node: Node<i32> = Node::derived(Dependencies::from_slice(&[id(graph, 0)]));
        assert!(!node.is_source());
        assert!(node.value().is_none());
        assert!(node.compute().is_none());
        assert_eq!(node.dependencies().len(), 1);
    }

    #[test]
    fn assign_marks_only_on_change() {
        let mut node = Node::source(1);

        assert!(!node.assign(1));
        assert!(!node.is_marked());
        assert_eq!(node.previous_or_current(), Some(&1));

        assert!(node.assign(2));
        assert!(node.is_marked());
        assert_eq!(node.value(), Some(&2));
        assert_eq!(node.previous_or_current(), Some(&1));

        node.clear_mark();
        assert!(!node.is_marked());
        assert_eq!(node.previous_or_current(), Some(&2));
    }

    #[test]
    fn first_value_of_derived_node_is_its_own_previous() {
        let graph = GraphId::new();
        let mut node: Node<i32> = Node::derived(Dependencies::from_slice(&[id(graph, 0)]));

        assert!(node.assign(5));
        assert!(node.is_marked());
        assert_eq!(node.previous_or_current(), Some(&5));
    }

    #[test]
    fn replace_compute_ignores_identical_function() {
        let graph = GraphId::new();
        let mut node: Node<i32> = Node::derived(Dependencies::from_slice(&[id(graph, 0)]));
        let compute = ComputeFn::new(|current: &[i32], _: &[i32]| current[0]);

        assert!(node.replace_compute(compute.clone()));
        assert!(!node.replace_compute(compute));
        assert!(node.replace_compute(ComputeFn::new(|current: &[i32], _: &[i32]| current[0])));

        let mut source = Node::source(0);
        assert!(!source.replace_compute(ComputeFn::new(|_: &[i32], _: &[i32]| 1)));
    }

    #[test]
    fn dependant_management() {
        let graph = GraphId::new();
        let mut node = Node::source(0);
        let d1 = id(graph, 1);
        let d2 = id(graph, 2);

        assert!(node.add_dependant(d1));
        assert!(node.add_dependant(d2));
        assert!(!node.add_dependant(d1));
        assert_eq!(node.dependants().iter().copied().collect::<Vec<_>>(), vec![d1, d2]);

        assert!(node.remove_dependant(d1));
        assert!(!node.remove_dependant(d1));
        assert_eq!(node.dependants().len(), 1);
    }
}
