use keldysh_contour::{
    ContourFunction, ContourRead, ContourWrite, HermMatrix, MovingFunction, Statistics,
    TimeSlice, TimestepSource,
};
use matrixcompare::assert_matrix_eq;
use nalgebra::DMatrix;
use num_complex::Complex64;
use utilities::{random_function, random_moving_timeslice, random_timeslice, reference_levels};

const TOLERANCE: f64 = 1e-12;

fn zeros(size: usize) -> DMatrix<Complex64> {
    DMatrix::zeros(size, size)
}

#[test]
fn reference_greater_component_matches_the_closed_form() {
    for statistics in [Statistics::Fermion, Statistics::Boson] {
        let levels = reference_levels(3, 6, 10, statistics);
        let occupations = levels.occupations();
        let g = levels.build();
        let sign = statistics.sign();
        let view = g.timestep_view(6);

        let mut gtr = zeros(3);
        for i in 0..=6 {
            view.get_gtr_tstp_t(i, &mut gtr);
            let delta = (6 - i) as f64 * levels.dt;
            let expected = DMatrix::from_fn(3, 3, |r, s| {
                if r == s {
                    let phase = (-Complex64::i() * levels.energies[r] * delta).exp();
                    -Complex64::i() * (1. + sign * occupations[r]) * phase
                } else {
                    Complex64::default()
                }
            });
            assert_matrix_eq!(gtr, expected, comp = abs, tol = TOLERANCE);
        }
    }
}

#[test]
fn greater_component_in_both_orderings_is_hermitian_related() {
    let slice = random_timeslice(4, 3, 2, Statistics::Fermion);
    let (mut forward, mut backward) = (zeros(2), zeros(2));
    for i in 0..=4 {
        slice.get_gtr_tstp_t(i, &mut forward);
        slice.get_gtr_t_tstp(i, &mut backward);
        assert_matrix_eq!(backward, -forward.adjoint(), comp = abs, tol = TOLERANCE);
    }
}

#[test]
fn left_multiplication_uses_the_time_of_each_block() {
    let (tstp, size) = (3, 2);
    let function = random_function(tstp, size);
    let before = random_timeslice(tstp, 4, size, Statistics::Fermion);
    let mut after = before.clone();
    after.left_multiply(tstp, &function, 0.5);

    let (mut f, mut x, mut y) = (zeros(size), zeros(size), zeros(size));
    function.get_value(tstp, &mut f);
    for j in 0..=tstp as usize {
        before.get_ret_tstp_t(j, &mut x);
        after.get_ret_tstp_t(j, &mut y);
        assert_matrix_eq!(y, &f * &x * Complex64::new(0.5, 0.), comp = abs, tol = TOLERANCE);
    }
    for j in 0..=4 {
        before.get_tv_at(j, &mut x);
        after.get_tv_at(j, &mut y);
        assert_matrix_eq!(y, &f * &x * Complex64::new(0.5, 0.), comp = abs, tol = TOLERANCE);
    }
    for i in 0..=tstp as usize {
        function.get_value(i as isize, &mut f);
        before.get_les_t_tstp(i, &mut x);
        after.get_les_t_tstp(i, &mut y);
        assert_matrix_eq!(y, &f * &x * Complex64::new(0.5, 0.), comp = abs, tol = TOLERANCE);
    }
}

#[test]
fn right_hermitian_conjugate_multiplication_uses_the_adjoint() {
    let (tstp, size) = (2, 3);
    let function = random_function(tstp, size);
    let before = random_timeslice(tstp, 2, size, Statistics::Boson);
    let mut after = before.clone();
    after.right_multiply_hermconj(tstp, &function, 1.);

    let (mut f, mut x, mut y) = (zeros(size), zeros(size), zeros(size));
    for j in 0..=tstp as usize {
        function.get_value(j as isize, &mut f);
        before.get_ret_tstp_t(j, &mut x);
        after.get_ret_tstp_t(j, &mut y);
        assert_matrix_eq!(y, &x * f.adjoint(), comp = abs, tol = TOLERANCE);
    }
    function.get_value(-1, &mut f);
    for j in 0..=2 {
        before.get_tv_at(j, &mut x);
        after.get_tv_at(j, &mut y);
        assert_matrix_eq!(y, &x * f.adjoint(), comp = abs, tol = TOLERANCE);
    }
}

#[test]
fn matsubara_slice_is_multiplied_by_the_equilibrium_value() {
    let function = random_function(0, 2);
    let before = random_timeslice(-1, 5, 2, Statistics::Fermion);
    let mut after = before.clone();
    after.left_multiply(-1, &function, 1.);

    let (mut f, mut x, mut y) = (zeros(2), zeros(2), zeros(2));
    function.get_value(-1, &mut f);
    for i in 0..=5 {
        before.get_mat(i, &mut x);
        after.get_mat(i, &mut y);
        assert_matrix_eq!(y, &f * &x, comp = abs, tol = TOLERANCE);
    }
}

#[test]
fn identity_multiplication_leaves_a_slice_unchanged() {
    let mut slice = TimeSlice::with_statistics(3, 4, 2, Statistics::Fermion);
    for (n, x) in slice.data_mut().iter_mut().enumerate() {
        *x = Complex64::new(n as f64 / 4., -(n as f64) / 8.);
    }
    let before = slice.clone();
    let identity = ContourFunction::identity(3, 2);
    slice.left_multiply(3, &identity, 1.);
    slice.right_multiply_hermconj(3, &identity, 1.);
    assert_eq!(slice, before);
}

#[test]
fn slices_cut_from_a_herm_matrix_add_up() {
    let levels = reference_levels(2, 4, 6, Statistics::Fermion);
    let g = levels.build();
    let mut doubled = HermMatrix::new(4, 6, 2, 2, Statistics::Fermion);
    for tstp in -1..=4 {
        doubled.incr_timestep(tstp, &g, 2.);
    }

    for tstp in -1..=4 {
        let mut slice = g.timestep_view(tstp).to_timeslice();
        slice.smul(tstp, 2.);
        assert_eq!(doubled.timestep_view(tstp).to_timeslice(), slice);
        let (a, b) = (
            slice.density_matrix(tstp),
            doubled.timestep_view(tstp).density_matrix(tstp),
        );
        assert!((a - b).norm() < TOLERANCE);
    }
}

#[test]
fn extracted_matrix_elements_follow_the_source() {
    let source = random_timeslice(2, 3, 3, Statistics::Fermion);
    let mut scalar = TimeSlice::with_statistics(2, 3, 1, Statistics::Fermion);
    scalar.get_matrixelement(2, 1, &source);

    let (mut full, mut entry) = (zeros(3), Complex64::default());
    for j in 0..=2 {
        source.get_ret_tstp_t(j, &mut full);
        scalar.get_ret_tstp_t(j, &mut entry);
        assert_eq!(entry, full[(2, 1)]);
    }
}

#[test]
fn moving_window_multiplication_uses_the_window_head_on_the_left() {
    let (tc, size) = (3, 2);
    let before = random_moving_timeslice(tc, 7, size);
    let mut function = MovingFunction::new(tc, 7, size, size);
    for i in 0..=tc {
        let value = DMatrix::from_fn(size, size, |r, s| Complex64::new((r + 2 * s + i) as f64, 1.));
        function.set_value(i, &value);
    }
    let head = DMatrix::from_row_slice(size, size, function.value(0));

    let mut after = before.clone();
    after.left_multiply(&function, 1.);
    let (mut x, mut y) = (zeros(size), zeros(size));
    for j in 0..=tc {
        before.get_les(j, &mut x);
        after.get_les(j, &mut y);
        assert_matrix_eq!(y, &head * &x, comp = abs, tol = TOLERANCE);
    }

    let mut after = before.clone();
    after.right_multiply(&function, 1.);
    for j in 0..=tc {
        let value = DMatrix::from_row_slice(size, size, function.value(j));
        before.get_ret(j, &mut x);
        after.get_ret(j, &mut y);
        assert_matrix_eq!(y, &x * &value, comp = abs, tol = TOLERANCE);
    }
}
