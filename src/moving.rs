//! # Moving-window time slices
//!
//! A [`MovingTimeSlice`] keeps the retarded and lesser components `C(t0, t0 - j)` on a window
//! of `tc + 1` past times behind the current physical time `t0`. The window has no
//! imaginary-time branch. Both blocks are packed back to back, retarded first.
//!
//! Only fermionic objects are treated consistently: the sign conventions of the window are
//! those of `sig = -1`. Bosonic statistics are accepted but flagged with a warning.
use crate::{
    element,
    function::MovingFunction,
    matrix::{accumulate_element, read_element, write_element, ContourMatrix, Transform},
    statistics::Statistics,
};
use num_complex::Complex64;

fn warn_if_bosonic(statistics: Statistics) {
    if !statistics.is_fermionic() {
        tracing::warn!(
            %statistics,
            "moving-window slices only treat fermionic signs consistently"
        );
    }
}

/// The retarded and lesser components of a contour object on a moving window
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovingTimeSlice {
    tc: usize,
    t0: isize,
    size1: usize,
    statistics: Statistics,
    data: Vec<Complex64>,
}

impl MovingTimeSlice {
    /// A zeroed window of `tc + 1` points ending at `t0`, holding `size1 x size1` matrices
    pub fn new(tc: usize, t0: isize, size1: usize, statistics: Statistics) -> Self {
        warn_if_bosonic(statistics);
        Self {
            tc,
            t0,
            size1,
            statistics,
            data: vec![Complex64::default(); 2 * (tc + 1) * size1 * size1],
        }
    }

    /// The cutoff, the window holds offsets `0..=tc`
    pub fn tc(&self) -> usize {
        self.tc
    }

    /// The physical time at the head of the window
    pub fn t0(&self) -> isize {
        self.t0
    }

    /// Matrix rows
    pub fn size1(&self) -> usize {
        self.size1
    }

    /// Matrix columns, always `size1`
    pub fn size2(&self) -> usize {
        self.size1
    }

    /// The number of complex entries in one matrix
    pub fn element_size(&self) -> usize {
        self.size1 * self.size1
    }

    /// Particle statistics
    pub fn statistics(&self) -> Statistics {
        self.statistics
    }

    /// The sign `sig` as an integer
    pub fn sig(&self) -> i32 {
        self.statistics.sig()
    }

    /// Change the statistics, bosons are flagged with a warning
    pub fn set_statistics(&mut self, statistics: Statistics) {
        warn_if_bosonic(statistics);
        self.statistics = statistics;
    }

    /// Move the head of the window to `t0`, the stored data is left untouched
    pub fn set_t0(&mut self, t0: isize) {
        self.t0 = t0;
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        self.data.fill(Complex64::default());
    }

    /// Reallocate for a window of `tc + 1` points and `size1 x size1` matrices
    pub fn resize(&mut self, tc: usize, size1: usize) {
        tracing::debug!(
            from = self.tc,
            to = tc,
            size1,
            "reallocating moving-window slice"
        );
        self.tc = tc;
        self.size1 = size1;
        self.data = vec![Complex64::default(); 2 * (tc + 1) * size1 * size1];
    }

    /// The packed buffer, retarded block first
    pub fn data(&self) -> &[Complex64] {
        &self.data
    }

    /// The packed buffer, mutably
    pub fn data_mut(&mut self) -> &mut [Complex64] {
        &mut self.data
    }

    fn check_offset(&self, j: usize) {
        require!(
            j <= self.tc,
            "offset {} is outside the window 0..={}",
            j,
            self.tc
        );
    }

    fn ret_range(&self, j: usize) -> std::ops::Range<usize> {
        self.check_offset(j);
        let es = self.element_size();
        j * es..(j + 1) * es
    }

    fn les_range(&self, j: usize) -> std::ops::Range<usize> {
        self.check_offset(j);
        let es = self.element_size();
        let start = (self.tc + 1 + j) * es;
        start..start + es
    }

    fn split_mut(&mut self) -> (&mut [Complex64], &mut [Complex64]) {
        let half = (self.tc + 1) * self.element_size();
        self.data.split_at_mut(half)
    }

    /// `C^R(t0, t0 - j)`
    pub fn get_ret<M: ContourMatrix>(&self, j: usize, m: &mut M) {
        read_element(
            &self.data[self.ret_range(j)],
            self.size1,
            self.size1,
            Transform::Identity,
            m,
        );
    }

    /// `C^<(t0, t0 - j)`
    pub fn get_les<M: ContourMatrix>(&self, j: usize, m: &mut M) {
        read_element(
            &self.data[self.les_range(j)],
            self.size1,
            self.size1,
            Transform::Identity,
            m,
        );
    }

    /// `C^>(t0, t0 - j) = C^R(t0, t0 - j) + C^<(t0, t0 - j)`
    pub fn get_gtr<M: ContourMatrix>(&self, j: usize, m: &mut M) {
        self.get_ret(j, m);
        accumulate_element(
            &self.data[self.les_range(j)],
            self.size1,
            self.size1,
            Transform::Identity,
            m,
        );
    }

    pub fn set_ret<M: ContourMatrix>(&mut self, j: usize, m: &M) {
        let range = self.ret_range(j);
        write_element(&mut self.data[range], self.size1, self.size1, m);
    }

    pub fn set_les<M: ContourMatrix>(&mut self, j: usize, m: &M) {
        let range = self.les_range(j);
        write_element(&mut self.data[range], self.size1, self.size1, m);
    }

    /// The `(0, 0)` entry of the density matrix `i sig C^<(t0, t0)`
    pub fn density_matrix(&self) -> Complex64 {
        let mut rho = Complex64::default();
        self.density_matrix_into(&mut rho);
        rho
    }

    /// The density matrix `i sig C^<(t0, t0)`
    pub fn density_matrix_into<M: ContourMatrix>(&self, m: &mut M) {
        self.get_les(0, m);
        m.scale(Complex64::new(0., self.statistics.sign()));
    }

    fn check_window(&self, other: &MovingTimeSlice) {
        require!(
            other.tc == self.tc && other.size1 == self.size1,
            "cannot combine a window with tc {} and size1 {} with one with tc {} and size1 {}",
            self.tc,
            self.size1,
            other.tc,
            other.size1
        );
    }

    /// `C <- C + alpha G`
    pub fn incr_timestep(&mut self, other: &MovingTimeSlice, alpha: Complex64) {
        self.check_window(other);
        element::incr(&mut self.data, &other.data, alpha);
    }

    /// `C <- C + weight G`
    pub fn incr(&mut self, other: &MovingTimeSlice, weight: f64) {
        self.incr_timestep(other, Complex64::new(weight, 0.));
    }

    /// `C(t0, t0 - j) <- weight F(t0) δ(t0, t0 - j) + C(t0, t0 - j)`
    ///
    /// A time-local term only touches the equal-time retarded entry `C^R(t0, t0)`, which is
    /// shifted by the head value of the function. The function window must end at `t0`.
    pub fn incr_function(&mut self, function: &MovingFunction, weight: Complex64) {
        require!(
            function.t0() == self.t0,
            "a function window ending at {} cannot shift a slice at t0 {}",
            function.t0(),
            self.t0
        );
        require!(
            function.size1() == self.size1 && function.size2() == self.size1,
            "a {} x {} function cannot shift {} x {} matrices",
            function.size1(),
            function.size2(),
            self.size1,
            self.size1
        );
        let range = self.ret_range(0);
        element::incr(&mut self.data[range], function.value(0), weight);
    }

    /// Multiply every stored entry by `weight`
    pub fn smul(&mut self, weight: f64) {
        self.smul_complex(Complex64::new(weight, 0.));
    }

    /// Multiply every stored entry by the complex `weight`
    pub fn smul_complex(&mut self, weight: Complex64) {
        element::smul(&mut self.data, weight);
    }

    fn check_function(&self, function: &MovingFunction) {
        require!(
            function.tc() >= self.tc,
            "a function on a window of {} points cannot multiply a window of {}",
            function.tc() + 1,
            self.tc + 1
        );
        require!(
            function.size1() == self.size1 && function.size2() == self.size1,
            "a {} x {} function cannot multiply {} x {} matrices",
            function.size1(),
            function.size2(),
            self.size1,
            self.size1
        );
    }

    /// The values `F(t0 - j)` or their adjoints for `j = 0..=tc`
    fn factors(&self, function: &MovingFunction, hermconj: bool) -> Vec<Complex64> {
        let es = self.element_size();
        let mut values = vec![Complex64::default(); (self.tc + 1) * es];
        for (j, out) in values.chunks_exact_mut(es.max(1)).enumerate() {
            if hermconj {
                element::adjoint(out, function.value(j), self.size1, self.size1);
            } else {
                out.copy_from_slice(function.value(j));
            }
        }
        values
    }

    fn multiply_left(&mut self, function: &MovingFunction, weight: f64, hermconj: bool) {
        self.check_function(function);
        let size = self.size1;
        let head = self.factors(function, hermconj);
        let head = &head[..size * size];
        let weight = Complex64::new(weight, 0.);
        let (ret, les) = self.split_mut();
        element::left_multiply_block(ret, size, size, weight, |_| head);
        element::left_multiply_block(les, size, size, weight, |_| head);
    }

    fn multiply_right(&mut self, function: &MovingFunction, weight: f64, hermconj: bool) {
        self.check_function(function);
        let size = self.size1;
        let es = size * size;
        let factors = self.factors(function, hermconj);
        let factors = &factors;
        let weight = Complex64::new(weight, 0.);
        let (ret, les) = self.split_mut();
        element::right_multiply_block(ret, size, size, weight, |j| &factors[j * es..(j + 1) * es]);
        element::right_multiply_block(les, size, size, weight, |j| &factors[j * es..(j + 1) * es]);
    }

    /// `C(t0, t0 - j) <- weight F(t0) C(t0, t0 - j)`
    pub fn left_multiply(&mut self, function: &MovingFunction, weight: f64) {
        self.multiply_left(function, weight, false);
    }

    /// `C(t0, t0 - j) <- weight F(t0)^† C(t0, t0 - j)`
    pub fn left_multiply_hermconj(&mut self, function: &MovingFunction, weight: f64) {
        self.multiply_left(function, weight, true);
    }

    /// `C(t0, t0 - j) <- weight C(t0, t0 - j) F(t0 - j)`
    pub fn right_multiply(&mut self, function: &MovingFunction, weight: f64) {
        self.multiply_right(function, weight, false);
    }

    /// `C(t0, t0 - j) <- weight C(t0, t0 - j) F(t0 - j)^†`
    pub fn right_multiply_hermconj(&mut self, function: &MovingFunction, weight: f64) {
        self.multiply_right(function, weight, true);
    }
}
