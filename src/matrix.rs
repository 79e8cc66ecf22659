//! # Matrix extraction
//!
//! Components of a time slice are read into, and written from, any dense matrix type which
//! implements [`ContourMatrix`]. The crate provides implementations for
//! `nalgebra::DMatrix<Complex64>` and for a bare [`Complex64`], which behaves as a `1 x 1`
//! matrix: reading into a scalar addresses only the `(0, 0)` entry of each stored matrix.
//!
//! Every named accessor reduces to one of two offset transforms. Components stored directly
//! are read with [`Transform::Identity`]; the components obtained from hermitian symmetry,
//! such as `R(t_j, tstp) = -R(tstp, t_j)^†`, are read with [`Transform::MinusAdjoint`], which
//! transposes the indices *and* negates the complex conjugate of every entry.
use nalgebra::DMatrix;
use num_complex::Complex64;

/// A dense matrix which components can be extracted into
pub trait ContourMatrix {
    /// True for scalar types, which only hold the `(0, 0)` entry of a matrix
    const SCALAR: bool = false;
    /// Resize to `rows x cols`, the contents afterwards are unspecified
    fn resize(&mut self, rows: usize, cols: usize);
    /// The number of rows and columns
    fn shape(&self) -> (usize, usize);
    /// The entry at row `r` and column `s`
    fn entry(&self, r: usize, s: usize) -> Complex64;
    /// Overwrite the entry at row `r` and column `s`
    fn set_entry(&mut self, r: usize, s: usize, value: Complex64);
    /// Multiply every entry by `factor`
    fn scale(&mut self, factor: Complex64);
}

impl ContourMatrix for DMatrix<Complex64> {
    fn resize(&mut self, rows: usize, cols: usize) {
        if (self.nrows(), self.ncols()) != (rows, cols) {
            *self = DMatrix::zeros(rows, cols);
        }
    }

    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn entry(&self, r: usize, s: usize) -> Complex64 {
        self[(r, s)]
    }

    fn set_entry(&mut self, r: usize, s: usize, value: Complex64) {
        self[(r, s)] = value;
    }

    fn scale(&mut self, factor: Complex64) {
        *self *= factor;
    }
}

impl ContourMatrix for Complex64 {
    const SCALAR: bool = true;

    fn resize(&mut self, _rows: usize, _cols: usize) {}

    fn shape(&self) -> (usize, usize) {
        (1, 1)
    }

    fn entry(&self, r: usize, s: usize) -> Complex64 {
        require!(r == 0 && s == 0, "a scalar only has the (0, 0) entry");
        *self
    }

    fn set_entry(&mut self, r: usize, s: usize, value: Complex64) {
        require!(r == 0 && s == 0, "a scalar only has the (0, 0) entry");
        *self = value;
    }

    fn scale(&mut self, factor: Complex64) {
        *self *= factor;
    }
}

/// How a stored matrix maps onto the requested component
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transform {
    /// The component is stored as is
    Identity,
    /// The component is minus the adjoint of the stored matrix
    MinusAdjoint,
}

impl Transform {
    /// The shape of the component obtained from a stored `rows x cols` matrix
    pub fn shape(self, rows: usize, cols: usize) -> (usize, usize) {
        match self {
            Transform::Identity => (rows, cols),
            Transform::MinusAdjoint => (cols, rows),
        }
    }

    /// Entry `(r, s)` of the component obtained from the stored row-major matrix `x`
    pub fn entry(self, x: &[Complex64], cols: usize, r: usize, s: usize) -> Complex64 {
        match self {
            Transform::Identity => x[r * cols + s],
            Transform::MinusAdjoint => -x[s * cols + r].conj(),
        }
    }
}

/// The shape `M` is read into, a scalar only ever receives the leading entry
fn target_shape<M: ContourMatrix>(shape: (usize, usize)) -> (usize, usize) {
    if M::SCALAR {
        (1, 1)
    } else {
        shape
    }
}

/// Read the stored `rows x cols` matrix `x` into `m`, applying `transform`
pub(crate) fn read_element<M: ContourMatrix>(
    x: &[Complex64],
    rows: usize,
    cols: usize,
    transform: Transform,
    m: &mut M,
) {
    require!(!x.is_empty(), "cannot read from a slice with empty matrices");
    let (nr, nc) = transform.shape(rows, cols);
    m.resize(nr, nc);
    let (nr, nc) = target_shape::<M>((nr, nc));
    for r in 0..nr {
        for s in 0..nc {
            m.set_entry(r, s, transform.entry(x, cols, r, s));
        }
    }
}

/// Add the stored `rows x cols` matrix `x`, after `transform`, onto `m`
///
/// `m` must already have the transformed shape.
pub(crate) fn accumulate_element<M: ContourMatrix>(
    x: &[Complex64],
    rows: usize,
    cols: usize,
    transform: Transform,
    m: &mut M,
) {
    let (nr, nc) = target_shape::<M>(transform.shape(rows, cols));
    require!(
        m.shape() == (nr, nc),
        "cannot accumulate into a {:?} matrix, expected {:?}",
        m.shape(),
        (nr, nc)
    );
    for r in 0..nr {
        for s in 0..nc {
            let value = m.entry(r, s) + transform.entry(x, cols, r, s);
            m.set_entry(r, s, value);
        }
    }
}

/// Overwrite the stored `rows x cols` matrix `x` with the contents of `m`
///
/// A scalar source writes only the `(0, 0)` entry, any other source must match the shape.
pub(crate) fn write_element<M: ContourMatrix>(x: &mut [Complex64], rows: usize, cols: usize, m: &M) {
    require!(!x.is_empty(), "cannot write to a slice with empty matrices");
    require!(
        M::SCALAR || m.shape() == (rows, cols),
        "cannot store a {:?} matrix in a slice of {} x {} matrices",
        m.shape(),
        rows,
        cols
    );
    let (nr, nc) = target_shape::<M>((rows, cols));
    for r in 0..nr {
        for s in 0..nc {
            x[r * cols + s] = m.entry(r, s);
        }
    }
}
