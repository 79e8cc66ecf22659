// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Keldysh-contour is the storage and algebra layer for Kadanoff-Baym calculations
//!
//! # Overview
//! In the non-equilibrium Green's function formalism a two-time contour object `C(t, t')` is
//! built from a handful of independent components: the retarded, lesser and left-mixing
//! functions on the real-time branch and the Matsubara function on the imaginary-time branch.
//! Every other component (greater, advanced, right-mixing, negative imaginary times) follows
//! from hermitian symmetry, with a sign fixed by the particle statistics.
//!
//! Propagation schemes never touch the full two-time object at once. They build, combine and
//! exchange one *time slice* at a time: the contour function at a fixed outer time `tstp`,
//! for all compatible inner times. This crate provides
//!
//! - [`TimeSlice`], an owned and packed time slice,
//! - [`TimeSliceView`] and [`TimeSliceViewMut`], borrowed slices of either a [`TimeSlice`] or a
//!   [`HermMatrix`],
//! - [`MovingTimeSlice`], a time slice with a finite memory used for steady-state propagation,
//! - [`TimesliceExchange`], which synchronises slices between the ranks of a [`Communicator`],
//! - [`SliceArchive`], a named collection of persisted slices.
//!
//! # Usage
//! ```
//! use keldysh_contour::{ContourRead, ContourWrite, Statistics, TimeSlice};
//! use num_complex::Complex64;
//!
//! let mut slice = TimeSlice::with_statistics(2, 3, 1, Statistics::Fermion);
//! slice.set_ret(2, 0, &Complex64::new(1., 2.));
//!
//! let mut swapped = Complex64::default();
//! slice.get_ret(0, 2, &mut swapped);
//! assert_eq!(swapped, Complex64::new(-1., 2.));
//! ```

#![warn(missing_docs)]
#![allow(clippy::too_many_arguments)]

/// Precondition checks
#[macro_use]
mod validation;

/// Component accessors and the in-place algebra shared by every slice type
pub mod access;

/// The command line application, configuration and tracing setup
pub mod app;

/// Small-matrix kernels shared by every slice type
pub(crate) mod element;

/// Error handling
mod error;

/// Cross-rank exchange of time slices
pub mod exchange;

/// Time-dependent matrices used to multiply time slices
pub mod function;

/// The full two-time contour container
pub mod herm_matrix;

/// Packing of the contour components into one buffer
pub mod layout;

/// Reading and writing components through any dense matrix type
pub mod matrix;

/// The moving-window time slice
pub mod moving;

/// Persisted slice layout
pub mod persist;

/// Fermionic and bosonic statistics
mod statistics;

/// The owned time slice
pub mod timestep;

/// Borrowed time slices
pub mod view;

pub use access::{ContourRead, ContourWrite, TimestepSource};
pub use error::{ContourError, Result};
pub use exchange::{
    Communicator, ExchangeBuffer, LocalCommunicator, LocalGroup, TimesliceExchange,
};
pub use function::{ContourFunction, MovingFunction};
pub use herm_matrix::HermMatrix;
pub use layout::Layout;
pub use matrix::{ContourMatrix, Transform};
pub use moving::MovingTimeSlice;
pub use persist::{SliceArchive, TimeSliceRecord};
pub use statistics::Statistics;
pub use timestep::TimeSlice;
pub use view::{TimeSliceView, TimeSliceViewMut};
