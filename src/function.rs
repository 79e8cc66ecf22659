//! # Time-dependent matrices
//!
//! A [`ContourFunction`] holds a matrix `F(t)` for every real-time point `t = 0..=nt` and one
//! equilibrium value at `t = -1`, which applies on the whole imaginary-time branch. Time slices
//! are multiplied by these functions from the left or the right.
//!
//! A [`MovingFunction`] is the moving-window counterpart, holding `F(t0 - i)` for `i = 0..=tc`.
use crate::matrix::{read_element, write_element, ContourMatrix, Transform};
use num_complex::Complex64;

/// A matrix-valued function on the real-time grid plus its equilibrium value
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContourFunction {
    nt: isize,
    size1: usize,
    size2: usize,
    data: Vec<Complex64>,
}

impl ContourFunction {
    /// A zero-valued function on `t = -1..=nt` with `size1 x size2` matrices
    pub fn new(nt: isize, size1: usize, size2: usize) -> Self {
        require!(nt >= -1, "nt must be at least -1, found {}", nt);
        let len = (nt + 2) as usize * size1 * size2;
        Self {
            nt,
            size1,
            size2,
            data: vec![Complex64::default(); len],
        }
    }

    /// A function equal to the `size x size` identity at every time
    pub fn identity(nt: isize, size: usize) -> Self {
        let mut function = Self::new(nt, size, size);
        if size == 0 {
            return function;
        }
        for value in function.data.chunks_exact_mut(size * size) {
            (0..size).for_each(|r| value[r * size + r] = Complex64::new(1., 0.));
        }
        function
    }

    /// The last real-time index
    pub fn nt(&self) -> isize {
        self.nt
    }

    /// Matrix rows
    pub fn size1(&self) -> usize {
        self.size1
    }

    /// Matrix columns
    pub fn size2(&self) -> usize {
        self.size2
    }

    fn range(&self, t: isize) -> std::ops::Range<usize> {
        require!(
            (-1..=self.nt).contains(&t),
            "time {} is outside the function grid -1..={}",
            t,
            self.nt
        );
        let element_size = self.size1 * self.size2;
        let start = (t + 1) as usize * element_size;
        start..start + element_size
    }

    /// The row-major matrix `F(t)`, `t = -1` is the equilibrium value
    pub fn value(&self, t: isize) -> &[Complex64] {
        &self.data[self.range(t)]
    }

    /// Read `F(t)` into `m`
    pub fn get_value<M: ContourMatrix>(&self, t: isize, m: &mut M) {
        read_element(self.value(t), self.size1, self.size2, Transform::Identity, m);
    }

    /// Overwrite `F(t)` with `m`
    pub fn set_value<M: ContourMatrix>(&mut self, t: isize, m: &M) {
        let range = self.range(t);
        write_element(&mut self.data[range], self.size1, self.size2, m);
    }
}

/// A matrix-valued function on a moving window `t0 - i`, `i = 0..=tc`
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovingFunction {
    tc: usize,
    t0: isize,
    size1: usize,
    size2: usize,
    data: Vec<Complex64>,
}

impl MovingFunction {
    /// A zero-valued function on the window of `tc + 1` times ending at `t0`
    pub fn new(tc: usize, t0: isize, size1: usize, size2: usize) -> Self {
        Self {
            tc,
            t0,
            size1,
            size2,
            data: vec![Complex64::default(); (tc + 1) * size1 * size2],
        }
    }

    /// A function equal to the `size x size` identity across the window
    pub fn identity(tc: usize, t0: isize, size: usize) -> Self {
        let mut function = Self::new(tc, t0, size, size);
        if size == 0 {
            return function;
        }
        for value in function.data.chunks_exact_mut(size * size) {
            (0..size).for_each(|r| value[r * size + r] = Complex64::new(1., 0.));
        }
        function
    }

    /// The cutoff of the window
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

    /// Matrix columns
    pub fn size2(&self) -> usize {
        self.size2
    }

    fn range(&self, i: usize) -> std::ops::Range<usize> {
        require!(i <= self.tc, "offset {} is outside the window 0..={}", i, self.tc);
        let element_size = self.size1 * self.size2;
        i * element_size..(i + 1) * element_size
    }

    /// The row-major matrix `F(t0 - i)`
    pub fn value(&self, i: usize) -> &[Complex64] {
        &self.data[self.range(i)]
    }

    /// Overwrite `F(t0 - i)` with `m`
    pub fn set_value<M: ContourMatrix>(&mut self, i: usize, m: &M) {
        let range = self.range(i);
        write_element(&mut self.data[range], self.size1, self.size2, m);
    }
}
