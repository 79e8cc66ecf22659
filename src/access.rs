//! # Component access and algebra
//!
//! Every slice type, owned or borrowed, stores its data in the blocks described by a
//! [`Layout`]. The accessors and the algebra are written once, against those blocks, as
//! provided methods of [`ContourRead`] and [`ContourWrite`]. A type only has to hand out its
//! blocks to take part.
//!
//! Time arguments follow the two-time convention `(i, j)` for `C(t_i, t_j)`. One of the two
//! must be the slice's own `tstp`; the other ordering is recovered from hermitian symmetry.
use crate::{
    element,
    function::ContourFunction,
    layout::{Component, Layout},
    matrix::{accumulate_element, read_element, write_element, ContourMatrix, Transform},
    statistics::Statistics,
    view::TimeSliceView,
};
use itertools::izip;
use num_complex::Complex64;

/// Anything which can present one of its time slices as a [`TimeSliceView`]
///
/// Implemented by the slice types themselves, which only present their own `tstp`, and by
/// [`HermMatrix`](crate::HermMatrix), which can present any `tstp` up to its `nt`.
pub trait TimestepSource {
    /// A borrowed view of the slice at `tstp`
    fn timestep_view(&self, tstp: isize) -> TimeSliceView<'_>;
}

/// Read access to the components of a time slice
pub trait ContourRead {
    /// The packing of the slice
    fn layout(&self) -> Layout;
    /// The particle statistics
    fn statistics(&self) -> Statistics;
    /// The stored block of `component`
    fn block(&self, component: Component) -> &[Complex64];

    /// The outer time index, `-1` for the Matsubara slice
    fn tstp(&self) -> isize {
        self.layout().tstp()
    }

    /// The index of the last imaginary-time point
    fn ntau(&self) -> usize {
        self.layout().ntau()
    }

    /// Number of matrix rows
    fn size1(&self) -> usize {
        self.layout().size1()
    }

    /// Number of matrix columns
    fn size2(&self) -> usize {
        self.layout().size2()
    }

    /// `size1 * size2`
    fn element_size(&self) -> usize {
        self.layout().element_size()
    }

    /// The statistics sign, `-1` for fermions and `+1` for bosons
    fn sig(&self) -> i32 {
        self.statistics().sig()
    }

    /// The row-major matrix at `index` of the block storing `component`
    fn matrix(&self, component: Component, index: usize) -> &[Complex64] {
        let layout = self.layout();
        let element_size = layout.element_size();
        let points = layout.points(component);
        require!(
            index < points,
            "index {} is outside the {:?} block of {} matrices",
            index,
            component,
            points
        );
        &self.block(component)[index * element_size..(index + 1) * element_size]
    }

    #[doc(hidden)]
    fn read_into<M: ContourMatrix>(
        &self,
        component: Component,
        index: usize,
        transform: Transform,
        m: &mut M,
    ) {
        read_element(
            self.matrix(component, index),
            self.size1(),
            self.size2(),
            transform,
            m,
        );
    }

    #[doc(hidden)]
    fn is_tstp(&self, i: usize) -> bool {
        self.tstp() == i as isize
    }

    /// `C^<(t_i, t_j)`, with `i` or `j` equal to `tstp`
    fn get_les<M: ContourMatrix>(&self, i: usize, j: usize, m: &mut M) {
        require!(
            self.is_tstp(i) || self.is_tstp(j),
            "one of ({}, {}) must be the slice's tstp {}",
            i,
            j,
            self.tstp()
        );
        if self.is_tstp(j) {
            self.read_into(Component::Lesser, i, Transform::Identity, m);
        } else {
            self.read_into(Component::Lesser, j, Transform::MinusAdjoint, m);
        }
    }

    /// `C^<(t_i, tstp)`
    fn get_les_t_tstp<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.read_into(Component::Lesser, i, Transform::Identity, m);
    }

    /// `C^<(tstp, t_i) = -C^<(t_i, tstp)^†`
    fn get_les_tstp_t<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.read_into(Component::Lesser, i, Transform::MinusAdjoint, m);
    }

    /// `C^R(t_i, t_j)`, with `i` or `j` equal to `tstp`
    fn get_ret<M: ContourMatrix>(&self, i: usize, j: usize, m: &mut M) {
        require!(
            self.is_tstp(i) || self.is_tstp(j),
            "one of ({}, {}) must be the slice's tstp {}",
            i,
            j,
            self.tstp()
        );
        if self.is_tstp(i) {
            self.read_into(Component::Retarded, j, Transform::Identity, m);
        } else {
            self.read_into(Component::Retarded, i, Transform::MinusAdjoint, m);
        }
    }

    /// `C^R(tstp, t_j)`
    fn get_ret_tstp_t<M: ContourMatrix>(&self, j: usize, m: &mut M) {
        self.read_into(Component::Retarded, j, Transform::Identity, m);
    }

    /// `C^R(t_i, tstp) = -C^R(tstp, t_i)^†`
    fn get_ret_t_tstp<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.read_into(Component::Retarded, i, Transform::MinusAdjoint, m);
    }

    /// `C^⌈(t_i, τ_j)` with `i = tstp`
    fn get_tv<M: ContourMatrix>(&self, i: usize, j: usize, m: &mut M) {
        require!(
            self.is_tstp(i),
            "the left-mixing component is stored at tstp {}, not {}",
            self.tstp(),
            i
        );
        self.get_tv_at(j, m);
    }

    /// `C^⌈(tstp, τ_j)`
    fn get_tv_at<M: ContourMatrix>(&self, j: usize, m: &mut M) {
        self.read_into(Component::LeftMixing, j, Transform::Identity, m);
    }

    /// `C^⌉(τ_i, t_j)` with `j = tstp`, using the slice's own statistics
    fn get_vt<M: ContourMatrix>(&self, i: usize, j: usize, m: &mut M) {
        require!(
            self.is_tstp(j),
            "the right-mixing component is derived at tstp {}, not {}",
            self.tstp(),
            j
        );
        self.get_vt_with(i, self.statistics(), m);
    }

    /// `C^⌉(τ_i, tstp)` derived with the sign of `statistics`
    ///
    /// `C^⌉(τ_i, t) = -sig C^⌈(t, τ_{ntau - i})^†`, which is `+C^⌈^†` for fermions.
    fn get_vt_with<M: ContourMatrix>(&self, i: usize, statistics: Statistics, m: &mut M) {
        require!(i <= self.ntau(), "tau index {} exceeds ntau {}", i, self.ntau());
        self.read_into(
            Component::LeftMixing,
            self.ntau() - i,
            Transform::MinusAdjoint,
            m,
        );
        if statistics.is_fermionic() {
            m.scale(Complex64::new(-1., 0.));
        }
    }

    /// `C^M(τ_i)`
    fn get_mat<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.read_into(Component::Matsubara, i, Transform::Identity, m);
    }

    /// `C^M(-τ_i) = sig C^M(β - τ_i)`, using the slice's own statistics
    fn get_matminus<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.get_matminus_with(i, self.statistics(), m);
    }

    /// `C^M(-τ_i)` derived with the sign of `statistics`
    fn get_matminus_with<M: ContourMatrix>(&self, i: usize, statistics: Statistics, m: &mut M) {
        require!(i <= self.ntau(), "tau index {} exceeds ntau {}", i, self.ntau());
        self.read_into(Component::Matsubara, self.ntau() - i, Transform::Identity, m);
        if statistics.is_fermionic() {
            m.scale(Complex64::new(-1., 0.));
        }
    }

    /// `C^>(tstp, t_i) = C^R(tstp, t_i) + C^<(tstp, t_i)`
    fn get_gtr_tstp_t<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.get_ret_tstp_t(i, m);
        accumulate_element(
            self.matrix(Component::Lesser, i),
            self.size1(),
            self.size2(),
            Transform::MinusAdjoint,
            m,
        );
    }

    /// `C^>(t_i, tstp) = C^R(t_i, tstp) + C^<(t_i, tstp)`
    fn get_gtr_t_tstp<M: ContourMatrix>(&self, i: usize, m: &mut M) {
        self.get_ret_t_tstp(i, m);
        accumulate_element(
            self.matrix(Component::Lesser, i),
            self.size1(),
            self.size2(),
            Transform::Identity,
            m,
        );
    }

    /// The `(0, 0)` entry of the density matrix at `tstp`
    ///
    /// In equilibrium this is `-C^M(β)`, out of equilibrium `i sig C^<(tstp, tstp)`.
    fn density_matrix(&self, tstp: isize) -> Complex64 {
        let mut rho = Complex64::default();
        self.density_matrix_into(tstp, &mut rho);
        rho
    }

    /// The density matrix at `tstp`, see [`ContourRead::density_matrix`]
    fn density_matrix_into<M: ContourMatrix>(&self, tstp: isize, m: &mut M) {
        require!(
            tstp == self.tstp(),
            "the density matrix of the slice at tstp {} was requested at {}",
            self.tstp(),
            tstp
        );
        if self.layout().is_matsubara() {
            self.get_mat(self.ntau(), m);
            m.scale(Complex64::new(-1., 0.));
        } else {
            self.get_les_t_tstp(tstp as usize, m);
            m.scale(Complex64::new(0., self.statistics().sign()));
        }
    }
}

/// Which side a time-dependent matrix multiplies a slice from
#[derive(Copy, Clone, Debug)]
enum Side {
    Left,
    Right,
}

impl Side {
    fn apply<'f>(
        self,
        block: &mut [Complex64],
        rows: usize,
        cols: usize,
        weight: Complex64,
        factor: impl Fn(usize) -> &'f [Complex64],
    ) {
        match self {
            Side::Left => element::left_multiply_block(block, rows, cols, weight, factor),
            Side::Right => element::right_multiply_block(block, rows, cols, weight, factor),
        }
    }
}

/// The values `F(t)`, or their adjoints, for `t = -1..=tmax`
enum Factors<'f> {
    Plain(&'f ContourFunction),
    Adjoint { data: Vec<Complex64>, size: usize },
}

impl<'f> Factors<'f> {
    fn new(function: &'f ContourFunction, tmax: isize, hermconj: bool) -> Self {
        if !hermconj {
            return Factors::Plain(function);
        }
        let size = function.size1();
        let mut data = vec![Complex64::default(); (tmax + 2) as usize * size * size];
        for (t, out) in (-1..=tmax).zip(data.chunks_exact_mut(size * size)) {
            element::adjoint(out, function.value(t), size, size);
        }
        Factors::Adjoint { data, size }
    }

    fn at(&self, t: isize) -> &[Complex64] {
        match self {
            Factors::Plain(function) => function.value(t),
            Factors::Adjoint { data, size } => {
                let start = (t + 1) as usize * size * size;
                &data[start..start + size * size]
            }
        }
    }
}

/// Write access to the components of a time slice, and the in-place algebra
pub trait ContourWrite: ContourRead {
    /// The mutable block of `component`
    fn block_mut(&mut self, component: Component) -> &mut [Complex64];

    /// The mutable row-major matrix at `index` of the block storing `component`
    fn matrix_mut(&mut self, component: Component, index: usize) -> &mut [Complex64] {
        let layout = self.layout();
        let element_size = layout.element_size();
        let points = layout.points(component);
        require!(
            index < points,
            "index {} is outside the {:?} block of {} matrices",
            index,
            component,
            points
        );
        &mut self.block_mut(component)[index * element_size..(index + 1) * element_size]
    }

    #[doc(hidden)]
    fn write_from<M: ContourMatrix>(&mut self, component: Component, index: usize, m: &M) {
        let (rows, cols) = (self.size1(), self.size2());
        write_element(self.matrix_mut(component, index), rows, cols, m);
    }

    #[doc(hidden)]
    fn check_tstp(&self, tstp: isize) {
        require!(
            tstp == self.tstp(),
            "operation addressed tstp {} on the slice at tstp {}",
            tstp,
            self.tstp()
        );
    }

    /// Zero every block stored at `tstp`
    fn set_timestep_zero(&mut self, tstp: isize) {
        self.check_tstp(tstp);
        for &component in self.layout().components() {
            self.block_mut(component).fill(Complex64::default());
        }
    }

    /// Set `C^R(t_i, t_j)` for `i = tstp` and `j <= i`
    fn set_ret<M: ContourMatrix>(&mut self, i: usize, j: usize, m: &M) {
        require!(
            self.is_tstp(i) && j <= i,
            "the retarded component is stored at ({}, j <= {}), not ({}, {})",
            self.tstp(),
            self.tstp(),
            i,
            j
        );
        self.set_ret_at(j, m);
    }

    /// Set `C^R(tstp, t_j)`
    fn set_ret_at<M: ContourMatrix>(&mut self, j: usize, m: &M) {
        self.write_from(Component::Retarded, j, m);
    }

    /// Set `C^<(t_i, t_j)` for `j = tstp` and `i <= j`
    fn set_les<M: ContourMatrix>(&mut self, i: usize, j: usize, m: &M) {
        require!(
            self.is_tstp(j) && i <= j,
            "the lesser component is stored at (i <= {}, {}), not ({}, {})",
            self.tstp(),
            self.tstp(),
            i,
            j
        );
        self.set_les_at(i, m);
    }

    /// Set `C^<(t_i, tstp)`
    fn set_les_at<M: ContourMatrix>(&mut self, i: usize, m: &M) {
        self.write_from(Component::Lesser, i, m);
    }

    /// Set `C^⌈(t_i, τ_j)` for `i = tstp`
    fn set_tv<M: ContourMatrix>(&mut self, i: usize, j: usize, m: &M) {
        require!(
            self.is_tstp(i),
            "the left-mixing component is stored at tstp {}, not {}",
            self.tstp(),
            i
        );
        self.set_tv_at(j, m);
    }

    /// Set `C^⌈(tstp, τ_j)`
    fn set_tv_at<M: ContourMatrix>(&mut self, j: usize, m: &M) {
        self.write_from(Component::LeftMixing, j, m);
    }

    /// Set `C^M(τ_i)`
    fn set_mat<M: ContourMatrix>(&mut self, i: usize, m: &M) {
        self.write_from(Component::Matsubara, i, m);
    }

    /// Replace every `C^M(τ_i)` by its hermitian part `(C^M + C^M^†) / 2`
    fn set_mat_herm(&mut self) {
        let n = self.size1();
        require!(
            n == self.size2(),
            "only square matrices have a hermitian part, found {} x {}",
            n,
            self.size2()
        );
        if n == 0 {
            return;
        }
        for x in self.block_mut(Component::Matsubara).chunks_exact_mut(n * n) {
            for r in 0..n {
                for s in r..n {
                    let value = (x[r * n + s] + x[s * n + r].conj()) * 0.5;
                    x[r * n + s] = value;
                    x[s * n + r] = value.conj();
                }
            }
        }
    }

    /// `C(tstp, t') <- weight F(tstp) C(tstp, t')`
    ///
    /// The retarded and left-mixing blocks are multiplied by `F(tstp)`, the lesser block at
    /// `t_i` by `F(t_i)`, and the Matsubara block by the equilibrium value `F(-1)`.
    fn left_multiply(&mut self, tstp: isize, function: &ContourFunction, weight: f64) {
        multiply(self, Side::Left, tstp, function, weight, false);
    }

    /// As [`ContourWrite::left_multiply`], with `F(t)^†` in place of `F(t)`
    fn left_multiply_hermconj(&mut self, tstp: isize, function: &ContourFunction, weight: f64) {
        multiply(self, Side::Left, tstp, function, weight, true);
    }

    /// `C(tstp, t') <- weight C(tstp, t') F(t')`
    ///
    /// The retarded block at `t_j` is multiplied by `F(t_j)`, the left-mixing and Matsubara
    /// blocks by `F(-1)`, and the lesser block by `F(tstp)`.
    fn right_multiply(&mut self, tstp: isize, function: &ContourFunction, weight: f64) {
        multiply(self, Side::Right, tstp, function, weight, false);
    }

    /// As [`ContourWrite::right_multiply`], with `F(t)^†` in place of `F(t)`
    fn right_multiply_hermconj(&mut self, tstp: isize, function: &ContourFunction, weight: f64) {
        multiply(self, Side::Right, tstp, function, weight, true);
    }

    /// Multiply every stored entry by `weight`
    fn smul(&mut self, tstp: isize, weight: f64) {
        self.smul_complex(tstp, Complex64::new(weight, 0.));
    }

    /// Multiply every stored entry by the complex `weight`
    fn smul_complex(&mut self, tstp: isize, weight: Complex64) {
        self.check_tstp(tstp);
        for &component in self.layout().components() {
            element::smul(self.block_mut(component), weight);
        }
    }

    /// `C <- C + weight G` where `G` is the slice of `source` at this slice's `tstp`
    fn incr<S: TimestepSource + ?Sized>(&mut self, source: &S, weight: f64) {
        self.incr_timestep(self.tstp(), source, weight);
    }

    /// `C <- C + weight G` where `G` is the slice of `source` at `tstp`
    fn incr_timestep<S: TimestepSource + ?Sized>(&mut self, tstp: isize, source: &S, weight: f64) {
        self.check_tstp(tstp);
        let other = source.timestep_view(tstp);
        require!(
            other.layout() == self.layout(),
            "cannot increment a slice laid out as {:?} by one laid out as {:?}",
            self.layout(),
            other.layout()
        );
        let weight = Complex64::new(weight, 0.);
        for &component in self.layout().components() {
            element::incr(self.block_mut(component), other.block(component), weight);
        }
    }

    /// Overwrite every block with the slice of `source` at `tstp`
    fn set_timestep<S: TimestepSource + ?Sized>(&mut self, tstp: isize, source: &S) {
        self.check_tstp(tstp);
        let other = source.timestep_view(tstp);
        require!(
            other.ntau() == self.ntau() && other.size1() == self.size1(),
            "cannot copy a slice with ntau {} and size1 {} into one with ntau {} and size1 {}",
            other.ntau(),
            other.size1(),
            self.ntau(),
            self.size1()
        );
        require!(
            other.size2() == self.size2(),
            "cannot copy {} column matrices into {} column matrices",
            other.size2(),
            self.size2()
        );
        for &component in self.layout().components() {
            self.block_mut(component)
                .copy_from_slice(other.block(component));
        }
    }

    /// Set entry `(i1, i2)` of every stored matrix to entry `(j1, j2)` of the matching matrix
    /// in the slice of `source` at `tstp`
    fn set_matrixelement<S: TimestepSource + ?Sized>(
        &mut self,
        tstp: isize,
        i1: usize,
        i2: usize,
        source: &S,
        j1: usize,
        j2: usize,
    ) {
        self.check_tstp(tstp);
        let other = source.timestep_view(tstp);
        require!(
            other.ntau() == self.ntau(),
            "cannot copy entries between slices with ntau {} and {}",
            other.ntau(),
            self.ntau()
        );
        require!(
            i1 < self.size1() && i2 < self.size2(),
            "entry ({}, {}) is outside the {} x {} target",
            i1,
            i2,
            self.size1(),
            self.size2()
        );
        require!(
            j1 < other.size1() && j2 < other.size2(),
            "entry ({}, {}) is outside the {} x {} source",
            j1,
            j2,
            other.size1(),
            other.size2()
        );
        let (es, target) = (self.element_size(), i1 * self.size2() + i2);
        let (other_es, from) = (other.element_size(), j1 * other.size2() + j2);
        for &component in self.layout().components() {
            let values = other.block(component);
            for (m, x) in self.block_mut(component).chunks_exact_mut(es).enumerate() {
                x[target] = values[m * other_es + from];
            }
        }
    }

    /// Apply [`ContourWrite::set_matrixelement`] for each `(i1[k], i2[k]) <- (j1[k], j2[k])`
    ///
    /// The index lists cover every entry of the target, so their length is `size1 * size2`.
    fn set_submatrix<S: TimestepSource + ?Sized>(
        &mut self,
        tstp: isize,
        i1: &[usize],
        i2: &[usize],
        source: &S,
        j1: &[usize],
        j2: &[usize],
    ) {
        require!(
            i1.len() == i2.len() && i1.len() == j1.len() && j1.len() == j2.len(),
            "index lists must have equal lengths"
        );
        require!(
            i1.len() == self.element_size(),
            "{} index pairs cannot cover a {} x {} matrix",
            i1.len(),
            self.size1(),
            self.size2()
        );
        for (&a1, &a2, &b1, &b2) in izip!(i1, i2, j1, j2) {
            self.set_matrixelement(tstp, a1, a2, source, b1, b2);
        }
    }

    /// Fill a scalar slice with entry `(i1, i2)` of the slice of `source` at this `tstp`
    fn get_matrixelement<S: TimestepSource + ?Sized>(&mut self, i1: usize, i2: usize, source: &S) {
        require!(
            self.element_size() == 1,
            "matrix elements are extracted into scalar slices, found {} x {}",
            self.size1(),
            self.size2()
        );
        self.set_matrixelement(self.tstp(), 0, 0, source, i1, i2);
    }
}

fn multiply<W: ContourWrite + ?Sized>(
    slice: &mut W,
    side: Side,
    tstp: isize,
    function: &ContourFunction,
    weight: f64,
    hermconj: bool,
) {
    slice.check_tstp(tstp);
    require!(
        function.nt() >= tstp,
        "function defined up to nt {} cannot multiply the slice at tstp {}",
        function.nt(),
        tstp
    );
    let (rows, cols) = (slice.size1(), slice.size2());
    let size = match side {
        Side::Left => rows,
        Side::Right => cols,
    };
    require!(
        function.size1() == size && function.size2() == size,
        "a {} x {} function cannot multiply {} x {} matrices from the {:?}",
        function.size1(),
        function.size2(),
        rows,
        cols,
        side
    );
    let factors = Factors::new(function, tstp, hermconj);
    let factors = &factors;
    let weight = Complex64::new(weight, 0.);

    if slice.layout().is_matsubara() {
        side.apply(
            slice.block_mut(Component::Matsubara),
            rows,
            cols,
            weight,
            move |_| factors.at(-1),
        );
        return;
    }
    match side {
        Side::Left => {
            side.apply(slice.block_mut(Component::Retarded), rows, cols, weight, move |_| {
                factors.at(tstp)
            });
            side.apply(slice.block_mut(Component::LeftMixing), rows, cols, weight, move |_| {
                factors.at(tstp)
            });
            side.apply(slice.block_mut(Component::Lesser), rows, cols, weight, move |m| {
                factors.at(m as isize)
            });
        }
        Side::Right => {
            side.apply(slice.block_mut(Component::Retarded), rows, cols, weight, move |m| {
                factors.at(m as isize)
            });
            side.apply(slice.block_mut(Component::LeftMixing), rows, cols, weight, move |_| {
                factors.at(-1)
            });
            side.apply(slice.block_mut(Component::Lesser), rows, cols, weight, move |_| {
                factors.at(tstp)
            });
        }
    }
}
