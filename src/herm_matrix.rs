//! # Two-time contour objects
//!
//! A [`HermMatrix`] stores a hermitian contour object on the whole time grid `0..=nt` plus
//! its Matsubara branch. Only the independent components are kept:
//!
//! - the Matsubara component `M(τ_i)`, `i = 0..=ntau`,
//! - the retarded component `R(t, t')` for `t' <= t`, stored row by row,
//! - the left-mixing component `⌈(t, τ_j)`, stored row by row,
//! - the lesser component `<(t, t')` for `t <= t'`, stored column by column.
//!
//! With this ordering the three blocks of the time slice at any `tstp` are each one
//! contiguous run of the storage, so a slice is viewed in place without copying.
use crate::{
    access::{ContourRead, ContourWrite, TimestepSource},
    layout::{Layout, MATSUBARA},
    matrix::{write_element, ContourMatrix},
    statistics::Statistics,
    timestep::TimeSlice,
    view::{TimeSliceView, TimeSliceViewMut},
};
use num_complex::Complex64;
use rayon::prelude::*;
use std::ops::Range;

/// A hermitian contour object on the time grid `-1..=nt`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HermMatrix {
    nt: isize,
    ntau: usize,
    size1: usize,
    size2: usize,
    statistics: Statistics,
    mat: Vec<Complex64>,
    ret: Vec<Complex64>,
    tv: Vec<Complex64>,
    les: Vec<Complex64>,
}

/// Index of the first matrix of row `t` of a packed triangle
fn triangle(t: usize) -> usize {
    t * (t + 1) / 2
}

impl HermMatrix {
    /// A zeroed object of `size1 x size2` matrices
    ///
    /// `nt = -1` gives an object with only the Matsubara branch.
    pub fn new(nt: isize, ntau: usize, size1: usize, size2: usize, statistics: Statistics) -> Self {
        require!(nt >= MATSUBARA, "nt must be at least -1, found {}", nt);
        let es = size1 * size2;
        let points = (nt + 1) as usize;
        Self {
            nt,
            ntau,
            size1,
            size2,
            statistics,
            mat: vec![Complex64::default(); (ntau + 1) * es],
            ret: vec![Complex64::default(); triangle(points) * es],
            tv: vec![Complex64::default(); points * (ntau + 1) * es],
            les: vec![Complex64::default(); triangle(points) * es],
        }
    }

    /// The last real-time index
    pub fn nt(&self) -> isize {
        self.nt
    }

    /// The last imaginary-time index
    pub fn ntau(&self) -> usize {
        self.ntau
    }

    /// Matrix rows
    pub fn size1(&self) -> usize {
        self.size1
    }

    /// Matrix columns
    pub fn size2(&self) -> usize {
        self.size2
    }

    /// Particle statistics
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// The sign `sig` as an integer
    pub fn sig(&self) -> i32 {
        self.statistics.sig()
    }

    fn element_size(&self) -> usize {
        self.size1 * self.size2
    }

    fn matrices(&self, first: usize, count: usize) -> Range<usize> {
        let es = self.element_size();
        first * es..(first + count) * es
    }

    fn check_time(&self, t: usize) {
        require!(
            t as isize <= self.nt,
            "time {} is outside the grid 0..={}",
            t,
            self.nt
        );
    }

    fn mat_range(&self, i: usize) -> Range<usize> {
        require!(i <= self.ntau, "tau index {} exceeds ntau {}", i, self.ntau);
        self.matrices(i, 1)
    }

    fn ret_range(&self, t: usize, t1: usize) -> Range<usize> {
        self.check_time(t);
        require!(t1 <= t, "the retarded component is stored for t' <= t, found ({}, {})", t, t1);
        self.matrices(triangle(t) + t1, 1)
    }

    fn tv_range(&self, t: usize, j: usize) -> Range<usize> {
        self.check_time(t);
        require!(j <= self.ntau, "tau index {} exceeds ntau {}", j, self.ntau);
        self.matrices(t * (self.ntau + 1) + j, 1)
    }

    fn les_range(&self, t: usize, t1: usize) -> Range<usize> {
        self.check_time(t1);
        require!(t <= t1, "the lesser component is stored for t <= t', found ({}, {})", t, t1);
        self.matrices(triangle(t1) + t, 1)
    }

    /// `M(τ_i)`, row-major
    pub fn mat(&self, i: usize) -> &[Complex64] {
        &self.mat[self.mat_range(i)]
    }

    /// `M(τ_i)`, mutably
    pub fn mat_mut(&mut self, i: usize) -> &mut [Complex64] {
        let range = self.mat_range(i);
        &mut self.mat[range]
    }

    /// `R(t, t')` for `t' <= t`, row-major
    pub fn ret(&self, t: usize, t1: usize) -> &[Complex64] {
        &self.ret[self.ret_range(t, t1)]
    }

    /// `R(t, t')`, mutably
    pub fn ret_mut(&mut self, t: usize, t1: usize) -> &mut [Complex64] {
        let range = self.ret_range(t, t1);
        &mut self.ret[range]
    }

    /// `⌈(t, τ_j)`, row-major
    pub fn tv(&self, t: usize, j: usize) -> &[Complex64] {
        &self.tv[self.tv_range(t, j)]
    }

    /// `⌈(t, τ_j)`, mutably
    pub fn tv_mut(&mut self, t: usize, j: usize) -> &mut [Complex64] {
        let range = self.tv_range(t, j);
        &mut self.tv[range]
    }

    /// `<(t, t')` for `t <= t'`, row-major
    pub fn les(&self, t: usize, t1: usize) -> &[Complex64] {
        &self.les[self.les_range(t, t1)]
    }

    /// `<(t, t')`, mutably
    pub fn les_mut(&mut self, t: usize, t1: usize) -> &mut [Complex64] {
        let range = self.les_range(t, t1);
        &mut self.les[range]
    }

    /// Overwrite `M(τ_i)` with `m`
    pub fn set_mat<M: ContourMatrix>(&mut self, i: usize, m: &M) {
        let (rows, cols) = (self.size1, self.size2);
        write_element(self.mat_mut(i), rows, cols, m);
    }

    /// Overwrite `R(t, t')` with `m`
    pub fn set_ret<M: ContourMatrix>(&mut self, t: usize, t1: usize, m: &M) {
        let (rows, cols) = (self.size1, self.size2);
        write_element(self.ret_mut(t, t1), rows, cols, m);
    }

    /// Overwrite `⌈(t, τ_j)` with `m`
    pub fn set_tv<M: ContourMatrix>(&mut self, t: usize, j: usize, m: &M) {
        let (rows, cols) = (self.size1, self.size2);
        write_element(self.tv_mut(t, j), rows, cols, m);
    }

    /// Overwrite `<(t, t')` with `m`
    pub fn set_les<M: ContourMatrix>(&mut self, t: usize, t1: usize, m: &M) {
        let (rows, cols) = (self.size1, self.size2);
        write_element(self.les_mut(t, t1), rows, cols, m);
    }

    fn layout(&self, tstp: isize) -> Layout {
        require!(
            (MATSUBARA..=self.nt).contains(&tstp),
            "tstp {} is outside the grid -1..={}",
            tstp,
            self.nt
        );
        Layout::new(tstp, self.ntau, self.size1, self.size2)
    }

    /// The storage ranges of the retarded, left-mixing and lesser blocks at `tstp >= 0`
    fn slice_ranges(&self, tstp: usize) -> [Range<usize>; 3] {
        [
            self.matrices(triangle(tstp), tstp + 1),
            self.matrices(tstp * (self.ntau + 1), self.ntau + 1),
            self.matrices(triangle(tstp), tstp + 1),
        ]
    }

    /// Mutable access to the slice at `tstp`
    pub fn timestep_view_mut(&mut self, tstp: isize) -> TimeSliceViewMut<'_> {
        let layout = self.layout(tstp);
        if layout.is_matsubara() {
            return TimeSliceViewMut::from_matsubara(layout, self.statistics, &mut self.mat);
        }
        let [ret, tv, les] = self.slice_ranges(tstp as usize);
        TimeSliceViewMut::from_blocks(
            layout,
            self.statistics,
            &mut self.ret[ret],
            &mut self.tv[tv],
            &mut self.les[les],
        )
    }

    /// Copy every slice into its own [`TimeSlice`], `tstp = -1..=nt` in order
    pub fn timeslices(&self) -> Vec<TimeSlice> {
        (MATSUBARA..=self.nt)
            .into_par_iter()
            .map(|tstp| self.timestep_view(tstp).to_timeslice())
            .collect()
    }

    /// Overwrite the slice at `tstp` with the slice of `source` at the same time
    pub fn set_timestep<S: TimestepSource + ?Sized>(&mut self, tstp: isize, source: &S) {
        self.timestep_view_mut(tstp).set_timestep(tstp, source);
    }

    /// Add `weight` times the slice of `source` at `tstp` onto the slice at `tstp`
    pub fn incr_timestep<S: TimestepSource + ?Sized>(
        &mut self,
        tstp: isize,
        source: &S,
        weight: f64,
    ) {
        self.timestep_view_mut(tstp).incr_timestep(tstp, source, weight);
    }

    /// The density matrix at `tstp`, see [`ContourRead::density_matrix_into`]
    pub fn density_matrix_into<M: ContourMatrix>(&self, tstp: isize, m: &mut M) {
        self.timestep_view(tstp).density_matrix_into(tstp, m);
    }
}

impl TimestepSource for HermMatrix {
    fn timestep_view(&self, tstp: isize) -> TimeSliceView<'_> {
        let layout = self.layout(tstp);
        if layout.is_matsubara() {
            return TimeSliceView::from_matsubara(layout, self.statistics, &self.mat);
        }
        let [ret, tv, les] = self.slice_ranges(tstp as usize);
        TimeSliceView::from_blocks(
            layout,
            self.statistics,
            &self.ret[ret],
            &self.tv[tv],
            &self.les[les],
        )
    }
}

#[cfg(test)]
mod test {
    use super::HermMatrix;
    use crate::{
        layout::MATSUBARA, ContourRead, ContourWrite, Statistics, TimeSlice, TimestepSource,
    };
    use nalgebra::DMatrix;
    use num_complex::Complex64;

    fn numbered(nt: isize, ntau: usize, size: usize) -> HermMatrix {
        let mut g = HermMatrix::new(nt, ntau, size, size, Statistics::Fermion);
        let mut n = 0.;
        let mut next = || {
            n += 1.;
            Complex64::new(n, -n * 0.5)
        };
        for x in g.mat.iter_mut() {
            *x = next();
        }
        for x in g.ret.iter_mut().chain(g.tv.iter_mut()).chain(g.les.iter_mut()) {
            *x = next();
        }
        g
    }

    #[test]
    fn slice_view_agrees_with_the_two_time_accessors() {
        let g = numbered(3, 2, 2);
        let mut m: DMatrix<Complex64> = DMatrix::zeros(0, 0);
        for tstp in 0..=3usize {
            let view = g.timestep_view(tstp as isize);
            for j in 0..=tstp {
                view.get_ret_tstp_t(j, &mut m);
                assert_eq!(m.transpose().as_slice(), g.ret(tstp, j));
                view.get_les_t_tstp(j, &mut m);
                assert_eq!(m.transpose().as_slice(), g.les(j, tstp));
            }
            for j in 0..=2 {
                view.get_tv_at(j, &mut m);
                assert_eq!(m.transpose().as_slice(), g.tv(tstp, j));
            }
        }
        let view = g.timestep_view(MATSUBARA);
        view.get_mat(1, &mut m);
        assert_eq!(m.transpose().as_slice(), g.mat(1));
    }

    #[test]
    fn parallel_slicing_covers_every_timestep() {
        let g = numbered(4, 3, 1);
        let slices = g.timeslices();
        assert_eq!(slices.len(), 6);
        for (slice, tstp) in slices.iter().zip(MATSUBARA..) {
            assert_eq!(slice.tstp(), tstp);
            assert_eq!(slice.view().to_timeslice(), g.timestep_view(tstp).to_timeslice());
        }
    }

    #[test]
    fn slice_is_written_back_into_the_container() {
        let mut g = HermMatrix::new(2, 1, 1, 1, Statistics::Fermion);
        let mut slice = TimeSlice::new(1, 1, 1);
        slice.data_mut().fill(Complex64::new(0.5, 0.5));
        g.set_timestep(1, &slice);
        g.incr_timestep(1, &slice, 1.);

        assert_eq!(g.ret(1, 0), &[Complex64::new(1., 1.)]);
        assert_eq!(g.les(0, 1), &[Complex64::new(1., 1.)]);
        assert_eq!(g.tv(1, 1), &[Complex64::new(1., 1.)]);
        assert_eq!(g.ret(2, 0), &[Complex64::default()]);
    }

    #[test]
    fn mutable_view_scales_one_timestep_only() {
        let mut g = numbered(2, 1, 1);
        let before = g.clone();
        g.timestep_view_mut(1).smul(1, 2.);
        assert_eq!(g.ret(1, 1)[0], before.ret(1, 1)[0] * 2.);
        assert_eq!(g.ret(2, 1), before.ret(2, 1));
        assert_eq!(g.les(1, 2), before.les(1, 2));
    }

    #[test]
    #[should_panic(expected = "outside the grid")]
    fn timestep_past_the_grid_is_rejected() {
        let g = HermMatrix::new(2, 1, 1, 1, Statistics::Fermion);
        let _ = g.timestep_view(3);
    }
}
