//! Kernels on single matrices of a packed buffer
//!
//! Matrices are row-major slices of `rows * cols` entries. The products are the inner loop of
//! every multiply on a time slice, so the scalar case, by far the most common in practice, is
//! handled without the triple loop.
use num_complex::Complex64;
use num_traits::One;

/// `out = a * b` for `a` of shape `(n, k)` and `b` of shape `(k, m)`
pub(crate) fn mult(out: &mut [Complex64], a: &[Complex64], b: &[Complex64], n: usize, k: usize, m: usize) {
    if n == 1 && k == 1 && m == 1 {
        out[0] = a[0] * b[0];
        return;
    }
    for r in 0..n {
        for s in 0..m {
            out[r * m + s] = (0..k).map(|l| a[r * k + l] * b[l * m + s]).sum();
        }
    }
}

/// `out = a^†` for `a` of shape `(n, m)`
pub(crate) fn adjoint(out: &mut [Complex64], a: &[Complex64], n: usize, m: usize) {
    for r in 0..n {
        for s in 0..m {
            out[s * n + r] = a[r * m + s].conj();
        }
    }
}

/// `x *= weight`
pub(crate) fn smul(x: &mut [Complex64], weight: Complex64) {
    x.iter_mut().for_each(|value| *value *= weight);
}

/// `x += weight * y`
pub(crate) fn incr(x: &mut [Complex64], y: &[Complex64], weight: Complex64) {
    if weight.is_one() {
        x.iter_mut().zip(y).for_each(|(value, other)| *value += other);
    } else {
        x.iter_mut()
            .zip(y)
            .for_each(|(value, other)| *value += weight * other);
    }
}

/// `x = weight * f * x` for every matrix `x` of shape `(rows, cols)` in `block`, with `f` of shape `(rows, rows)`
///
/// `factor(m)` returns the left factor for matrix `m` of the block.
pub(crate) fn left_multiply_block<'f>(
    block: &mut [Complex64],
    rows: usize,
    cols: usize,
    weight: Complex64,
    factor: impl Fn(usize) -> &'f [Complex64],
) {
    let element_size = rows * cols;
    if element_size == 0 {
        return;
    }
    let mut scratch = vec![Complex64::default(); element_size];
    for (m, x) in block.chunks_exact_mut(element_size).enumerate() {
        mult(&mut scratch, factor(m), x, rows, rows, cols);
        smul(&mut scratch, weight);
        x.copy_from_slice(&scratch);
    }
}

/// `x = weight * x * f` for every matrix `x` of shape `(rows, cols)` in `block`, with `f` of shape `(cols, cols)`
pub(crate) fn right_multiply_block<'f>(
    block: &mut [Complex64],
    rows: usize,
    cols: usize,
    weight: Complex64,
    factor: impl Fn(usize) -> &'f [Complex64],
) {
    let element_size = rows * cols;
    if element_size == 0 {
        return;
    }
    let mut scratch = vec![Complex64::default(); element_size];
    for (m, x) in block.chunks_exact_mut(element_size).enumerate() {
        mult(&mut scratch, x, factor(m), rows, cols, cols);
        smul(&mut scratch, weight);
        x.copy_from_slice(&scratch);
    }
}
