//! Registries
//!
//! This module implements named collections of cells and the declarative
//! bulk-definition form built on top of them.
//!
//! # Concepts
//!
//! ## Registries
//!
//! A [`Registry`] maps names to [`CellId`](crate::graph::CellId)s. It exists
//! so that cells can be addressed by people; it has no say in how changes
//! propagate.
//!
//! ## Definitions
//!
//! A [`Definition`] describes one named cell: either a plain initial value
//! (a source cell) or a list of dependencies plus a compute function (a
//! derived cell). Definitions are applied in order, so a derived cell must
//! come after the cells it names.

mod definition;
mod registry;

pub use definition::{Definition, DependencyRef, DerivedDefinition};
pub use registry::Registry;
