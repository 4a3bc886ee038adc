#![forbid(
    missing_docs,
    clippy::missing_assert_message,
    clippy::missing_docs_in_private_items,
    clippy::missing_asserts_for_indexing,
    clippy::missing_panics_doc
)]
//! Defines the massive Klein-Gordon wave on a closed interval, solved by superposition of its
//! sine eigenmodes.
//!
//! ```
//! use common::{grid::Grid, interfaces::FieldInterface};
//! use kgwave::decomposer::from_initial_data;
//!
//! let grid = Grid::<f64>::uniform(128);
//! let y0: Vec<f64> = grid.points().iter().map(|x| x * (1.0 - x)).collect();
//! let ydot0 = vec![0.0; grid.len()];
//!
//! let solution = from_initial_data(grid.points(), &y0, &ydot0, 2.0, 10).unwrap();
//! assert_eq!(solution.real_field(0.0, 1.5), 0.0);
//! ```

/// Defines [`KgError`](crate::error::KgError) and the crate [`Result`](crate::error::Result).
pub mod error;

/// Contains the system definition: the mass, the dispersion relation, and the eigenmode basis
/// of [`KleinGordon<T: Float>`](crate::system::KleinGordon).
pub mod system;

/// Defines the [`ModeSolution`](crate::solution::ModeSolution) and its implementation of
/// [`FieldInterface`](common::interfaces::FieldInterface).
pub mod solution;

/// This module defines the [`Decomposer`](crate::decomposer::Decomposer), which projects sampled
/// initial data or wavefunctions onto the eigenmodes, and its configuration.
pub mod decomposer;

/// Defines the frame sampler for our system.
pub mod simulator;
