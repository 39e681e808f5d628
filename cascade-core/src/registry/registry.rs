//! Named collections of cells.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::debug;

use super::definition::{Definition, DependencyRef};
use crate::error::{GraphError, Result};
use crate::graph::{CellId, Graph};

/// Ordered mapping from names to cells.
///
/// A registry is a namespace only. Cells in different registries depend on
/// each other freely, and a cell can be in several registries or in none.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    cells: IndexMap<String, CellId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a new registry from `definitions`, in order.
    pub fn from_definitions<T, I, N>(graph: &mut Graph<T>, definitions: I) -> Result<Self>
    where
        T: Clone + PartialEq,
        I: IntoIterator<Item = (N, Definition<T>)>,
        N: Into<String>,
    {
        let mut registry = Self::new();
        registry.define(graph, definitions)?;
        Ok(registry)
    }

    /// Create the cells described by `definitions` and add them under their names.
    ///
    /// Definitions are processed in order. A dependency name must refer to a
    /// cell already in this registry, either from before the call or from
    /// an earlier definition. The first unresolved name aborts with
    /// [`GraphError::UnknownName`]; definitions before it stay in place.
    pub fn define<T, I, N>(&mut self, graph: &mut Graph<T>, definitions: I) -> Result<()>
    where
        T: Clone + PartialEq,
        I: IntoIterator<Item = (N, Definition<T>)>,
        N: Into<String>,
    {
        for (name, definition) in definitions {
            let name = name.into();
            let id = match definition {
                Definition::Value(value) => graph.source(value),
                Definition::Derived(derived) => {
                    let dependencies = derived
                        .dependencies
                        .iter()
                        .map(|dependency| self.resolve(dependency))
                        .collect::<Result<SmallVec<[CellId; 4]>>>()?;
                    match derived.initial {
                        Some(initial) => {
                            graph.derived_with_initial(dependencies, initial, derived.compute)?
                        }
                        None => graph.derived(dependencies, derived.compute)?,
                    }
                }
            };
            self.insert(name, id);
        }
        Ok(())
    }

    fn resolve(&self, dependency: &DependencyRef) -> Result<CellId> {
        match dependency {
            DependencyRef::Name(name) => self.cell(name),
            DependencyRef::Cell(id) => Ok(*id),
        }
    }

    /// Add or repoint a name. Returns the cell previously under that name.
    pub fn insert(&mut self, name: impl Into<String>, id: CellId) -> Option<CellId> {
        let name = name.into();
        let replaced = self.cells.insert(name.clone(), id);
        if let Some(old) = replaced {
            debug!(name = %name, old = %old, new = %id, "repointed registry name");
        }
        replaced
    }

    pub fn get(&self, name: &str) -> Option<CellId> {
        self.cells.get(name).copied()
    }

    /// Like [`get`](Self::get), but an unknown name is an error.
    pub fn cell(&self, name: &str) -> Result<CellId> {
        self.get(name)
            .ok_or_else(|| GraphError::UnknownName(name.to_string()))
    }

    /// Drop a name. The cell itself stays in its graph.
    pub fn remove(&mut self, name: &str) -> Option<CellId> {
        self.cells.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, CellId)> {
        self.cells.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, CellId)> for Registry {
    fn from_iter<I: IntoIterator<Item = (N, CellId)>>(iter: I) -> Self {
        let mut registry = Self::new();
        registry.extend(iter);
        registry
    }
}

impl<N: Into<String>> Extend<(N, CellId)> for Registry {
    fn extend<I: IntoIterator<Item = (N, CellId)>>(&mut self, iter: I) {
        for (name, id) in iter {
            self.insert(name, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ComputeFn;

    fn sum() -> ComputeFn<i32> {
        ComputeFn::new(|current: &[i32], _: &[i32]| current.iter().sum())
    }

    #[test]
    fn defines_sources_and_derived_cells_in_order() {
        let mut graph = Graph::new();
        let registry = Registry::from_definitions(
            &mut graph,
            [
                ("a", Definition::value(1)),
                ("b", Definition::value(2)),
                ("x", Definition::derived(["a", "b"], sum())),
            ],
        )
        .unwrap();

        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["a", "b", "x"]);
        let x = registry.cell("x").unwrap();
        assert_eq!(graph.get(x).unwrap(), &3);
        assert_eq!(
            graph.dependencies(x).unwrap(),
            &[registry.cell("a").unwrap(), registry.cell("b").unwrap()]
        );
    }

    #[test]
    fn forward_reference_fails_fast() {
        let mut graph = Graph::new();
        let mut registry = Registry::new();
        let result = registry.define(
            &mut graph,
            [
                ("a", Definition::value(1)),
                ("x", Definition::derived(["a", "later"], sum())),
                ("later", Definition::value(2)),
            ],
        );

        assert!(matches!(result, Err(GraphError::UnknownName(name)) if name == "later"));
        assert!(registry.contains("a"));
        assert!(!registry.contains("x"));
        assert!(!registry.contains("later"));
    }

    #[test]
    fn define_extends_existing_registry() {
        let mut graph = Graph::new();
        let mut registry =
            Registry::from_definitions(&mut graph, [("a", Definition::value(1))]).unwrap();

        registry
            .define(
                &mut graph,
                [
                    ("c", Definition::value(3)),
                    ("y", Definition::derived(["a", "c"], sum())),
                ],
            )
            .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(graph.get(registry.cell("y").unwrap()).unwrap(), &4);
    }

    #[test]
    fn definitions_can_reference_cells_directly() {
        let mut graph = Graph::new();
        let outside = graph.source(40);

        let registry = Registry::from_definitions(
            &mut graph,
            [
                ("a", Definition::value(2)),
                (
                    "total",
                    Definition::derived(
                        [DependencyRef::from("a"), DependencyRef::from(outside)],
                        sum(),
                    ),
                ),
            ],
        )
        .unwrap();

        assert_eq!(graph.get(registry.cell("total").unwrap()).unwrap(), &42);
    }

    #[test]
    fn insert_repoints_names() {
        let mut graph = Graph::new();
        let a = graph.source(1);
        let b = graph.source(2);

        let mut registry: Registry = [("v", a)].into_iter().collect();
        assert_eq!(registry.insert("v", b), Some(a));
        assert_eq!(registry.get("v"), Some(b));
        assert_eq!(registry.remove("v"), Some(b));
        assert!(registry.is_empty());
        assert!(graph.contains(b));
        assert!(matches!(registry.cell("v"), Err(GraphError::UnknownName(_))));
    }
}
