//! Cascade Core
//!
//! This crate provides a small dependency-graph engine for reactive values.
//! It implements:
//!
//! - Source cells, holding values assigned from outside
//! - Derived cells, computed from other cells
//! - Change propagation that recomputes each affected derived cell once,
//!   in dependency order, and stops along branches whose value did not change
//! - Named registries and a declarative way to define many cells at once
//!
//! Compute functions receive the current values of their dependencies
//! followed by the values those dependencies held just before the change
//! being propagated, so a derived cell can react to how its inputs moved.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: Cells, edge bookkeeping and propagation
//! - `registry`: Named cells and bulk definitions
//! - `error`: Error types shared by both
//!
//! # Example
//!
//! ```rust
//! use cascade_core::graph::{ComputeFn, Graph};
//! use cascade_core::registry::{Definition, Registry};
//!
//! let mut graph = Graph::new();
//! let r = Registry::from_definitions(
//!     &mut graph,
//!     [
//!         ("a", Definition::value(1)),
//!         ("b", Definition::value(2)),
//!         ("x", Definition::derived(["a", "b"], ComputeFn::new(|v: &[i32], _: &[i32]| v[0] + v[1]))),
//!     ],
//! )
//! .unwrap();
//!
//! let x = r.cell("x").unwrap();
//! assert_eq!(graph.get(x).unwrap(), &3);
//!
//! graph.set(r.cell("a").unwrap(), 220).unwrap();
//! assert_eq!(graph.get(x).unwrap(), &222);
//! ```

pub mod error;
pub mod graph;
pub mod registry;

pub use error::{ComputeError, GraphError, Result};
pub use graph::{CellId, ComputeFn, Graph, Propagation};
pub use registry::{Definition, DependencyRef, Registry};
