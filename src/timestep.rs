//! # Time slices
//!
//! A [`TimeSlice`] owns the packed buffer of one outer time index of a hermitian contour
//! object. All component reads, writes and the in-place algebra come from the
//! [`ContourRead`] and [`ContourWrite`] traits, which operate on the blocks of the buffer;
//! the slice itself only manages the storage.
//!
//! ```
//! use keldysh_contour::{ContourRead, ContourWrite, TimeSlice};
//! use num_complex::Complex64;
//!
//! let mut slice = TimeSlice::new(1, 4, 1);
//! slice.set_les(0, 1, &Complex64::new(0., 0.5));
//!
//! let mut x = Complex64::default();
//! slice.get_les(1, 0, &mut x);
//! assert_eq!(x, Complex64::new(0., 0.5));
//! ```
use crate::{
    access::{ContourRead, ContourWrite, TimestepSource},
    layout::{Component, Layout},
    statistics::Statistics,
    view::{TimeSliceView, TimeSliceViewMut},
};
use num_complex::Complex64;

/// The packed storage of a contour object at one outer time `tstp`
///
/// `Clone` is a deep copy. `std::mem::take` moves the storage out and leaves an empty slice
/// behind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimeSlice {
    layout: Layout,
    statistics: Statistics,
    data: Vec<Complex64>,
}

impl TimeSlice {
    /// A zeroed fermionic slice of square `size1 x size1` matrices
    pub fn new(tstp: isize, ntau: usize, size1: usize) -> Self {
        Self::with_statistics(tstp, ntau, size1, Statistics::Fermion)
    }

    /// A zeroed slice of square `size1 x size1` matrices
    pub fn with_statistics(tstp: isize, ntau: usize, size1: usize, statistics: Statistics) -> Self {
        Self::with_shape(tstp, ntau, size1, size1, statistics)
    }

    /// A zeroed slice of `size1 x size2` matrices
    pub fn with_shape(
        tstp: isize,
        ntau: usize,
        size1: usize,
        size2: usize,
        statistics: Statistics,
    ) -> Self {
        let layout = Layout::new(tstp, ntau, size1, size2);
        Self {
            layout,
            statistics,
            data: vec![Complex64::default(); layout.len()],
        }
    }

    /// Reallocate for square `size1 x size1` matrices, discarding the contents
    pub fn resize(&mut self, tstp: isize, ntau: usize, size1: usize) {
        self.resize_with_shape(tstp, ntau, size1, size1);
    }

    /// Reallocate for `size1 x size2` matrices, discarding the contents
    pub fn resize_with_shape(&mut self, tstp: isize, ntau: usize, size1: usize, size2: usize) {
        let layout = Layout::new(tstp, ntau, size1, size2);
        tracing::debug!(
            from = ?self.layout,
            to = ?layout,
            "reallocating time slice"
        );
        self.layout = layout;
        self.data = vec![Complex64::default(); layout.len()];
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        self.data.fill(Complex64::default());
    }

    /// Change the statistics, the stored data is left untouched
    pub fn set_statistics(&mut self, statistics: Statistics) {
        self.statistics = statistics;
    }

    /// The packed buffer
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// The packed buffer, mutably
    pub fn data_mut(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    /// Borrow the slice as a view
    pub fn view(&self) -> TimeSliceView<'_> {
        TimeSliceView::packed(self.layout, self.statistics, &self.data)
    }

    /// Borrow the slice as a mutable view
    pub fn view_mut(&mut self) -> TimeSliceViewMut<'_> {
        TimeSliceViewMut::packed(self.layout, self.statistics, &mut self.data)
    }
}

impl ContourRead for TimeSlice {
    fn layout(&self) -> Layout {
        self.layout
    }

    fn statistics(&self) -> Statistics {
        self.statistics
    }

    fn block(&self, component: Component) -> &[Complex64] {
        &self.data[self.layout.block(component)]
    }
}

impl ContourWrite for TimeSlice {
    fn block_mut(&mut self, component: Component) -> &mut [Complex64] {
        let range = self.layout.block(component);
        &mut self.data[range]
    }
}

impl TimestepSource for TimeSlice {
    fn timestep_view(&self, tstp: isize) -> TimeSliceView<'_> {
        require!(
            tstp == self.layout.tstp(),
            "the slice holds tstp {}, not {}",
            self.layout.tstp(),
            tstp
        );
        self.view()
    }
}
