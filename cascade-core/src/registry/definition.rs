//! Declarative cell definitions.

use smallvec::SmallVec;

use crate::graph::{CellId, ComputeFn};

/// Reference to a dependency inside a definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyRef {
    /// A cell named in the registry being defined.
    Name(String),

    /// A cell given directly, possibly from another registry or from no registry.
    Cell(CellId),
}

impl From<&str> for DependencyRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for DependencyRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<CellId> for DependencyRef {
    fn from(id: CellId) -> Self {
        Self::Cell(id)
    }
}

/// How to build one named cell.
#[derive(Debug, Clone)]
pub enum Definition<T> {
    /// A source cell with this initial value.
    Value(T),

    /// A derived cell.
    Derived(DerivedDefinition<T>),
}

impl<T> Definition<T> {
    pub fn value(value: T) -> Self {
        Self::Value(value)
    }

    pub fn derived<I, D>(dependencies: I, compute: ComputeFn<T>) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DependencyRef>,
    {
        Self::Derived(DerivedDefinition::new(dependencies, compute))
    }
}

impl<T> From<DerivedDefinition<T>> for Definition<T> {
    fn from(definition: DerivedDefinition<T>) -> Self {
        Self::Derived(definition)
    }
}

/// A derived cell: its dependencies, compute function and optional
/// value to hold before the first computation.
#[derive(Debug, Clone)]
pub struct DerivedDefinition<T> {
    pub(crate) dependencies: SmallVec<[DependencyRef; 4]>,
    pub(crate) compute: ComputeFn<T>,
    pub(crate) initial: Option<T>,
}

impl<T> DerivedDefinition<T> {
    pub fn new<I, D>(dependencies: I, compute: ComputeFn<T>) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<DependencyRef>,
    {
        Self {
            dependencies: dependencies.into_iter().map(Into::into).collect(),
            compute,
            initial: None,
        }
    }

    /// Value the cell holds before its compute function first runs.
    pub fn with_initial(mut self, value: T) -> Self {
        self.initial = Some(value);
        self
    }

    pub fn dependencies(&self) -> &[DependencyRef] {
        &self.dependencies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_convert_to_references() {
        assert_eq!(DependencyRef::from("a"), DependencyRef::Name("a".to_string()));
        assert_eq!(
            DependencyRef::from(String::from("b")),
            DependencyRef::Name("b".to_string())
        );
    }

    #[test]
    fn derived_definition_keeps_order_and_initial() {
        let definition = DerivedDefinition::new(
            ["b", "a"],
            ComputeFn::new(|current: &[i32], _: &[i32]| current[0]),
        )
        .with_initial(9);

        assert_eq!(
            definition.dependencies(),
            &[DependencyRef::from("b"), DependencyRef::from("a")]
        );
        assert_eq!(definition.initial, Some(9));
        assert!(matches!(Definition::from(definition), Definition::Derived(_)));
    }
}
