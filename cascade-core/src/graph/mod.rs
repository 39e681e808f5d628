//! Dependency Graph
//!
//! This module implements the graph of source and derived cells and the
//! change propagation that keeps derived cells consistent.
//!
//! # Overview
//!
//! The dependency graph is a directed acyclic graph (DAG) where:
//!
//! - Nodes are cells: source cells hold externally assigned values, derived
//!   cells hold values computed from other cells
//! - Edges are dependencies: if A reads from B, there is an edge from B to A
//!
//! When a cell is assigned a new value, every derived cell downstream of it
//! whose inputs actually changed is recomputed exactly once, in dependency
//! order. A recomputation that yields an equal value stops propagation
//! along that branch.
//!
//! # Design Decisions
//!
//! 1. All cells live in one arena ([`Graph`]) and refer to each other by
//!    [`CellId`] handles. Edges are never ownership.
//!
//! 2. Each cell stores both its direct dependencies (ordered, they are the
//!    compute function's arguments) and the flattened set of every cell
//!    downstream of it, kept in topological order as edges change.
//!
//! 3. Compute functions see values only, never the graph, so a propagation
//!    pass cannot be re-entered from inside itself.

mod cells;
mod compute;
mod node;
mod scheduler;

pub use cells::Graph;
pub use compute::ComputeFn;
pub use node::{CellId, NodeKind};
pub use scheduler::Propagation;
