use std::ops::{Index, Mul};

use crate::{cast, Float};

/// A grid of sample positions, assumed to be uniform over `[0, 1)`.
///
/// The spacing is always inferred as `1 / len`, so a grid of arbitrary sample positions is
/// integrated as if its points were evenly spread over the unit interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    /// The sample positions.
    points: Box<[T]>,
}

impl<T: Float> Grid<T> {
    /// Creates the uniform grid `x_j = j / len` for `j` in `0..len`.
    pub fn uniform(len: usize) -> Self {
        let step = T::one() / cast(len);
        Self {
            points: (0..len).map(|j| cast::<T, _>(j) * step).collect(),
        }
    }

    /// Wraps caller-supplied sample positions as a [`Grid`].
    pub fn from_samples(points: impl Into<Box<[T]>>) -> Self {
        Self {
            points: points.into(),
        }
    }

    /// The sample positions.
    pub fn points(&self) -> &[T] {
        &self.points
    }

    /// The number of sample positions.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Checks if the [`Grid`] has no sample positions.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The grid spacing `1 / len`. Infinite for an empty grid.
    pub fn dx(&self) -> T {
        T::one() / cast(self.len())
    }

    /// Integrates sampled values over the unit interval with the rectangle rule `Σ v_j·dx`.
    ///
    /// Each term is scaled before summation, and the terms are summed in iteration order.
    pub fn integrate<V>(&self, values: impl IntoIterator<Item = V>) -> V
    where
        V: num::Zero + Mul<T, Output = V>,
    {
        let dx = self.dx();
        values
            .into_iter()
            .fold(V::zero(), |acc, value| acc + value * dx)
    }
}

impl<T> Index<usize> for Grid<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.points[index]
    }
}
