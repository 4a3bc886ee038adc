#![forbid(
    missing_docs,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_asserts_for_indexing,
    clippy::missing_panics_doc
)]
//! This crate defines the common numeric types, grids, and evaluation interfaces shared by the
//! field solutions in this workspace.

/// Defines the interfaces accessible to the consumers of a field solution:
/// - Field: Evaluates a complex positive-frequency solution and its derivatives at a point.
/// - Simulator: Advances a clock over a solution and records frames of observables.
pub mod interfaces;

/// Defines the uniform [`Grid<T>`](crate::grid::Grid) on the unit interval used for both
/// quadrature and sampling.
pub mod grid;

/// This trait defines the set of floats that have nice computer properties.
pub trait Float:
    num::Float + num::traits::FloatConst + bytemuck::Pod + Send + Sync + Default + std::fmt::Debug
{
}

impl Float for f32 {}
impl Float for f64 {}

/// Converts a primitive number into `T`.
///
/// Every primitive is representable (up to rounding) by both `f32` and `f64`, so the conversion
/// only fails for exotic [`Float`] implementations, in which case the result is NaN and poisons
/// whatever it touches.
#[inline]
pub fn cast<T: Float, N: num::ToPrimitive>(value: N) -> T {
    <T as num::NumCast>::from(value).unwrap_or_else(T::nan)
}
