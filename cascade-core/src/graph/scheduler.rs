//! Edge Bookkeeping and Propagation
//!
//! Every cell keeps a flattened set of *all* cells downstream of it, in
//! topological order. Propagation therefore never recurses: a change to a
//! cell is pushed through by one linear scan of that cell's dependant set.
//!
//! # Wiring
//!
//! A newly declared derived cell is a sink, so it is appended to the
//! dependant set of each of its ancestors, walking upward and stopping at
//! any ancestor that already lists it. Appending keeps each set in
//! topological order.
//!
//! Rewiring an existing cell can move a whole subgraph, so the dependant
//! sets of every old and new ancestor are rebuilt from the direct consumer
//! edges, ordered with Kahn's algorithm.
//!
//! # Algorithm
//!
//! When a cell's value changes:
//!
//! 1. The cell keeps its old value as a previous-value marker.
//! 2. Each dependant, in order, is skipped unless one of its direct
//!    dependencies carries a marker. Otherwise it is recomputed from the
//!    current and previous values of its dependencies.
//! 3. A recomputed value that differs from the old one marks the dependant
//!    in turn. An equal value leaves it unmarked, which stops propagation
//!    along that branch.
//! 4. Markers on the cell and all its dependants are cleared.

use std::collections::{HashMap, VecDeque};

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{trace, warn};

use super::cells::Graph;
use super::compute::ComputeFn;
use super::node::{CellId, Dependencies};
use crate::error::{GraphError, Result};

/// Outcome of one propagation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Propagation {
    changed: Vec<CellId>,
    recomputed: usize,
}

impl Propagation {
    /// Cells whose value changed, in the order they changed. The cell that
    /// started the pass comes first.
    pub fn changed(&self) -> &[CellId] {
        &self.changed
    }

    /// Number of compute function invocations.
    pub fn recomputed(&self) -> usize {
        self.recomputed
    }

    /// True if nothing changed and nothing was recomputed.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty() && self.recomputed == 0
    }
}

impl<T> Graph<T> {
    /// Register a freshly declared cell with its dependencies and ancestors.
    pub(super) fn wire(&mut self, id: CellId) -> Result<()> {
        let dependencies = self.node(id)?.dependencies().clone();
        for &dependency in &dependencies {
            self.node_mut(dependency)?.add_consumer(id);
        }

        let mut stack: Vec<CellId> = dependencies.to_vec();
        while let Some(ancestor) = stack.pop() {
            let node = self.node_mut(ancestor)?;
            if node.add_dependant(id) {
                stack.extend(node.dependencies().iter().copied());
            }
        }
        Ok(())
    }

    /// Detach a cell with no dependants from its dependencies and ancestors.
    pub(super) fn unwire(&mut self, id: CellId) -> Result<()> {
        let dependencies = self.node(id)?.dependencies().clone();
        self.detach_consumer(id, &dependencies)?;

        for ancestor in self.ancestors(&dependencies)? {
            if !self.node_mut(ancestor)?.remove_dependant(id) {
                warn!(cell = %id, ancestor = %ancestor, "cell was not listed as a dependant");
            }
        }
        Ok(())
    }

    /// Point `id` at new dependencies and rebuild every affected dependant set.
    pub(super) fn rewire(&mut self, id: CellId, dependencies: Dependencies) -> Result<()> {
        let old = self.node_mut(id)?.replace_dependencies(dependencies.clone());
        let mut affected = self.ancestors(&old)?;
        self.detach_consumer(id, &old)?;

        for &dependency in &dependencies {
            self.node_mut(dependency)?.add_consumer(id);
        }
        affected.extend(self.ancestors(&dependencies)?);

        for cell in affected {
            let order = self.downstream_order(cell)?;
            self.node_mut(cell)?.replace_dependants(order);
        }
        Ok(())
    }

    fn detach_consumer(&mut self, id: CellId, dependencies: &[CellId]) -> Result<()> {
        let distinct: IndexSet<CellId> = dependencies.iter().copied().collect();
        for dependency in distinct {
            if !self.node_mut(dependency)?.remove_consumer(id) {
                warn!(cell = %id, dependency = %dependency, "cell was not a consumer of its dependency");
            }
        }
        Ok(())
    }

    /// The given cells and everything upstream of them.
    fn ancestors(&self, cells: &[CellId]) -> Result<IndexSet<CellId>> {
        let mut found = IndexSet::new();
        let mut queue: VecDeque<CellId> = cells.iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if found.insert(id) {
                queue.extend(self.node(id)?.dependencies().iter().copied());
            }
        }
        Ok(found)
    }

    /// All cells downstream of `root`, sorted so dependencies come before dependents.
    fn downstream_order(&self, root: CellId) -> Result<IndexSet<CellId>> {
        let mut closure = IndexSet::new();
        let mut queue: VecDeque<CellId> = self.node(root)?.consumers().iter().copied().collect();

        while let Some(id) = queue.pop_front() {
            if closure.insert(id) {
                queue.extend(self.node(id)?.consumers().iter().copied());
            }
        }

        // Kahn's algorithm, counting only edges within the closure
        let mut in_degree: HashMap<CellId, usize> = HashMap::with_capacity(closure.len());
        let mut ready = VecDeque::new();
        for &id in &closure {
            let degree = self
                .node(id)?
                .dependencies()
                .iter()
                .filter(|dependency| closure.contains(*dependency))
                .collect::<IndexSet<_>>()
                .len();
            in_degree.insert(id, degree);
            if degree == 0 {
                ready.push_back(id);
            }
        }

        let mut order = IndexSet::with_capacity(closure.len());
        while let Some(id) = ready.pop_front() {
            order.insert(id);
            for consumer in self.node(id)?.consumers() {
                if let Some(degree) = in_degree.get_mut(consumer) {
                    *degree = degree.saturating_sub(1);
                    if *degree == 0 {
                        ready.push_back(*consumer);
                    }
                }
            }
        }

        debug_assert_eq!(order.len(), closure.len(), "dependency cycle below {root}");
        Ok(order)
    }

    fn clear_marks(&mut self, seed: CellId, dependants: &[CellId]) {
        for &id in std::iter::once(&seed).chain(dependants) {
            if let Ok(node) = self.node_mut(id) {
                node.clear_mark();
            }
        }
    }
}

impl<T: Clone + PartialEq> Graph<T> {
    /// Push the change already assigned to `seed` through its dependants.
    pub(super) fn propagate(&mut self, seed: CellId) -> Result<Propagation> {
        let order: Vec<CellId> = self.node(seed)?.dependants().iter().copied().collect();
        trace!(cell = %seed, dependants = order.len(), "propagating change");

        let mut report = Propagation {
            changed: vec![seed],
            recomputed: 0,
        };
        let outcome = self.run_pass(&order, &mut report);

        // Markers go even if the pass failed; values already written stay.
        self.clear_marks(seed, &order);
        outcome.map(|()| report)
    }

    fn run_pass(&mut self, order: &[CellId], report: &mut Propagation) -> Result<()> {
        for &id in order {
            let Some(compute) = self.node(id)?.compute().cloned() else {
                continue;
            };
            if !self.any_dependency_marked(id)? {
                trace!(cell = %id, "inputs unchanged, skipping");
                continue;
            }

            let value = self.evaluate(id, &compute)?;
            report.recomputed += 1;

            if self.node_mut(id)?.assign(value) {
                trace!(cell = %id, "recomputed, value changed");
                report.changed.push(id);
            } else {
                trace!(cell = %id, "recomputed, value unchanged");
            }
        }
        Ok(())
    }

    fn any_dependency_marked(&self, id: CellId) -> Result<bool> {
        for &dependency in self.node(id)?.dependencies() {
            if self.node(dependency)?.is_marked() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Run `compute` over the current and previous values of `id`'s dependencies.
    pub(super) fn evaluate(&self, id: CellId, compute: &ComputeFn<T>) -> Result<T> {
        self.evaluate_over(id, self.node(id)?.dependencies(), compute)
    }

    /// Run `compute` for `id` as if it read `dependencies`. Nothing is written,
    /// so a failure here leaves the graph untouched.
    pub(super) fn evaluate_over(
        &self,
        id: CellId,
        dependencies: &[CellId],
        compute: &ComputeFn<T>,
    ) -> Result<T> {
        let mut current: SmallVec<[T; 4]> = SmallVec::with_capacity(dependencies.len());
        let mut previous: SmallVec<[T; 4]> = SmallVec::with_capacity(dependencies.len());

        for &dependency in dependencies {
            let node = self.node(dependency)?;
            let value = node.value().ok_or(GraphError::Unevaluated(dependency))?;
            current.push(value.clone());
            previous.push(node.previous_or_current().unwrap_or(value).clone());
        }

        compute.call(&current, &previous).map_err(|source| {
            warn!(cell = %id, error = %source, "compute function failed");
            GraphError::Compute { cell: id, source }
        })
    }

    /// Store a value computed outside a pass and propagate if it changed.
    pub(super) fn commit(&mut self, id: CellId, value: T) -> Result<Propagation> {
        let mut report = self.set(id, value)?;
        report.recomputed += 1;
        Ok(report)
    }
}
