//! The Cell Graph
//!
//! [`Graph`] is the arena that owns every cell. External code holds
//! [`CellId`] handles and goes through the graph for every read and write.
//!
//! # Example
//!
//! ```rust
//! use cascade_core::graph::{ComputeFn, Graph};
//!
//! let mut graph = Graph::new();
//! let a = graph.source(1);
//! let b = graph.source(2);
//! let x = graph
//!     .derived([a, b], ComputeFn::new(|v: &[i32], _: &[i32]| v[0] + v[1]))
//!     .unwrap();
//!
//! assert_eq!(graph.get(x).unwrap(), &3);
//!
//! graph.set(a, 220).unwrap();
//! assert_eq!(graph.get(x).unwrap(), &222);
//! ```

use indexmap::IndexSet;
use tracing::{debug, trace};

use super::compute::ComputeFn;
use super::node::{CellId, Dependencies, GraphId, Node, NodeKind};
use super::scheduler::Propagation;
use crate::error::{GraphError, Result};

/// Arena of source and derived cells.
pub struct Graph<T> {
    id: GraphId,

    /// Removed cells leave an empty slot so stale handles stay invalid.
    nodes: Vec<Option<Node<T>>>,

    live: usize,
}

impl<T> Graph<T> {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self {
            id: GraphId::new(),
            nodes: Vec::new(),
            live: 0,
        }
    }

    /// Number of live cells.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Handles of all live cells, in creation order.
    pub fn cells(&self) -> impl Iterator<Item = CellId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| CellId::new(self.id, index))
    }

    pub fn contains(&self, id: CellId) -> bool {
        self.node(id).is_ok()
    }

    /// Create a source cell holding `value`.
    pub fn source(&mut self, value: T) -> CellId {
        let id = self.insert(Node::source(value));
        debug!(cell = %id, "created source cell");
        id
    }

    pub fn kind(&self, id: CellId) -> Result<&NodeKind<T>> {
        Ok(self.node(id)?.kind())
    }

    pub fn is_source(&self, id: CellId) -> Result<bool> {
        Ok(self.node(id)?.is_source())
    }

    pub fn is_derived(&self, id: CellId) -> Result<bool> {
        Ok(!self.node(id)?.is_source())
    }

    /// Direct dependencies of a cell, in the order its compute function reads them.
    pub fn dependencies(&self, id: CellId) -> Result<&[CellId]> {
        Ok(self.node(id)?.dependencies().as_slice())
    }

    /// Every cell downstream of `id`, in an order where each cell comes
    /// after all of its own dependencies that are also in the set.
    pub fn dependants(&self, id: CellId) -> Result<&IndexSet<CellId>> {
        Ok(self.node(id)?.dependants())
    }

    /// Whether the cell carries a previous-value marker. Only ever true
    /// while a propagation pass is running.
    pub fn is_marked(&self, id: CellId) -> Result<bool> {
        Ok(self.node(id)?.is_marked())
    }

    pub(super) fn node(&self, id: CellId) -> Result<&Node<T>> {
        if id.graph() != self.id {
            return Err(GraphError::UnknownCell(id));
        }
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(GraphError::UnknownCell(id))
    }

    pub(super) fn node_mut(&mut self, id: CellId) -> Result<&mut Node<T>> {
        if id.graph() != self.id {
            return Err(GraphError::UnknownCell(id));
        }
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownCell(id))
    }

    fn insert(&mut self, node: Node<T>) -> CellId {
        let id = CellId::new(self.id, self.nodes.len());
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    /// Remove a cell that nothing depends on. Returns its last value.
    pub fn remove(&mut self, id: CellId) -> Result<Option<T>> {
        let dependants = self.node(id)?.dependants().len();
        if dependants > 0 {
            return Err(GraphError::InUse {
                cell: id,
                dependants,
            });
        }

        self.unwire(id)?;

        let mut node = self.nodes[id.index()]
            .take()
            .ok_or(GraphError::UnknownCell(id))?;
        self.live -= 1;
        debug!(cell = %id, "removed cell");
        Ok(node.take_value())
    }
}

impl<T: Clone + PartialEq> Graph<T> {
    /// Create a derived cell over `dependencies` without a compute function.
    ///
    /// The cell has no value until [`set_compute`](Self::set_compute) is called.
    pub fn declare<I>(&mut self, dependencies: I) -> Result<CellId>
    where
        I: IntoIterator<Item = CellId>,
    {
        let dependencies: Dependencies = dependencies.into_iter().collect();
        if dependencies.is_empty() {
            return Err(GraphError::EmptyDependencies);
        }
        for &dependency in &dependencies {
            self.node(dependency)?;
        }

        let count = dependencies.len();
        let id = self.insert(Node::derived(dependencies));
        self.wire(id)?;
        debug!(cell = %id, dependencies = count, "declared derived cell");
        Ok(id)
    }

    /// Create a derived cell and compute its initial value.
    ///
    /// If the first computation fails, the cell is discarded and the error returned.
    pub fn derived<I>(&mut self, dependencies: I, compute: ComputeFn<T>) -> Result<CellId>
    where
        I: IntoIterator<Item = CellId>,
    {
        let id = self.declare(dependencies)?;
        self.install(id, compute)
    }

    /// Like [`derived`](Self::derived), but the cell holds `initial` before
    /// its compute function first runs. If the computed value equals
    /// `initial`, the cell is not considered changed.
    pub fn derived_with_initial<I>(
        &mut self,
        dependencies: I,
        initial: T,
        compute: ComputeFn<T>,
    ) -> Result<CellId>
    where
        I: IntoIterator<Item = CellId>,
    {
        let id = self.declare(dependencies)?;
        self.node_mut(id)?.preset(initial);
        self.install(id, compute)
    }

    fn install(&mut self, id: CellId, compute: ComputeFn<T>) -> Result<CellId> {
        if let Err(err) = self.set_compute(id, compute) {
            self.remove(id)?;
            return Err(err);
        }
        Ok(id)
    }

    /// Current value of a cell.
    pub fn get(&self, id: CellId) -> Result<&T> {
        self.node(id)?.value().ok_or(GraphError::Unevaluated(id))
    }

    /// Assign a new value and bring every dependant up to date.
    ///
    /// Assigning a value equal to the current one does nothing.
    pub fn set(&mut self, id: CellId, value: T) -> Result<Propagation> {
        if !self.node_mut(id)?.assign(value) {
            trace!(cell = %id, "value unchanged, nothing to propagate");
            return Ok(Propagation::default());
        }
        self.propagate(id)
    }

    /// Replace the dependencies of a derived cell, then recompute it.
    ///
    /// Fails with [`GraphError::Cycle`] if any new dependency is the cell
    /// itself or already downstream of it. The new value is computed before
    /// any edge moves, so on every error the graph is left unchanged.
    pub fn set_dependencies<I>(&mut self, id: CellId, dependencies: I) -> Result<Propagation>
    where
        I: IntoIterator<Item = CellId>,
    {
        let dependencies: Dependencies = dependencies.into_iter().collect();
        if dependencies.is_empty() {
            return Err(GraphError::EmptyDependencies);
        }

        let node = self.node(id)?;
        if node.is_source() {
            return Err(GraphError::NotDerived(id));
        }
        for &dependency in &dependencies {
            self.node(dependency)?;
            if dependency == id || node.dependants().contains(&dependency) {
                return Err(GraphError::Cycle {
                    cell: id,
                    dependency,
                });
            }
        }
        let value = match node.compute() {
            Some(compute) => Some(self.evaluate_over(id, &dependencies, compute)?),
            None => None,
        };

        self.rewire(id, dependencies)?;
        debug!(cell = %id, "rewired derived cell");
        match value {
            Some(value) => self.commit(id, value),
            None => Ok(Propagation::default()),
        }
    }

    /// Replace the compute function of a derived cell, then recompute it.
    ///
    /// Passing the function already installed (or a clone of it) does nothing.
    /// If the new function fails, the old one stays installed.
    pub fn set_compute(&mut self, id: CellId, compute: ComputeFn<T>) -> Result<Propagation> {
        let node = self.node(id)?;
        if node.is_source() {
            return Err(GraphError::NotDerived(id));
        }
        if node.compute().is_some_and(|current| current.same_as(&compute)) {
            trace!(cell = %id, "compute function unchanged");
            return Ok(Propagation::default());
        }

        let value = self.evaluate(id, &compute)?;
        self.node_mut(id)?.replace_compute(compute);
        debug!(cell = %id, "installed compute function");
        self.commit(id, value)
    }
}

impl<T> Default for Graph<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Graph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("id", &self.id)
            .field("cells", &self.live)
            .finish()
    }
}
