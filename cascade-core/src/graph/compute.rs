//! Compute Functions
//!
//! A derived cell's value comes from a compute function. With `n` declared
//! dependencies the function receives two slices of length `n`: the current
//! values of the dependencies, then their values from just before the change
//! that triggered this recomputation. An unchanged dependency appears with
//! the same value in both slices.

use std::fmt;
use std::rc::Rc;

use crate::error::ComputeError;

type ComputeBody<T> = dyn Fn(&[T], &[T]) -> Result<T, ComputeError>;

/// Shared handle to a compute function.
///
/// Cloning is cheap and keeps identity: two clones are the same function as
/// far as [`Graph::set_compute`](super::Graph::set_compute) is concerned.
pub struct ComputeFn<T> {
    body: Rc<ComputeBody<T>>,
}

impl<T> ComputeFn<T> {
    /// Wrap a compute function that cannot fail.
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&[T], &[T]) -> T + 'static,
        T: 'static,
    {
        Self {
            body: Rc::new(move |current: &[T], previous: &[T]| Ok(compute(current, previous))),
        }
    }

    /// Wrap a compute function that reports failures.
    pub fn fallible<F>(compute: F) -> Self
    where
        F: Fn(&[T], &[T]) -> Result<T, ComputeError> + 'static,
    {
        Self {
            body: Rc::new(compute),
        }
    }

    /// Run the function.
    pub fn call(&self, current: &[T], previous: &[T]) -> Result<T, ComputeError> {
        (self.body)(current, previous)
    }

    /// Whether both handles point at the same function.
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.body, &other.body)
    }
}

impl<T> Clone for ComputeFn<T> {
    fn clone(&self) -> Self {
        Self {
            body: Rc::clone(&self.body),
        }
    }
}

impl<T> fmt::Debug for ComputeFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComputeFn")
            .field("ptr", &Rc::as_ptr(&self.body).cast::<()>())
            .finish()
    }
}
