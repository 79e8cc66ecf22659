use keldysh_contour::{
    app::reference::FreeLevels, ContourFunction, HermMatrix, MovingTimeSlice, Statistics,
    TimeSlice,
};
use nalgebra::DMatrix;
use num_complex::Complex64;
use rand::{thread_rng, Rng};

fn random_complex<R: Rng>(rng: &mut R) -> Complex64 {
    Complex64::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
}

/// A time slice with every stored entry drawn uniformly from the unit square
pub fn random_timeslice(
    tstp: isize,
    ntau: usize,
    size1: usize,
    statistics: Statistics,
) -> TimeSlice {
    let mut rng = thread_rng();
    let mut slice = TimeSlice::with_statistics(tstp, ntau, size1, statistics);
    slice
        .data_mut()
        .iter_mut()
        .for_each(|x| *x = random_complex(&mut rng));
    slice
}

pub fn random_moving_timeslice(tc: usize, t0: isize, size1: usize) -> MovingTimeSlice {
    let mut rng = thread_rng();
    let mut slice = MovingTimeSlice::new(tc, t0, size1, Statistics::Fermion);
    slice
        .data_mut()
        .iter_mut()
        .for_each(|x| *x = random_complex(&mut rng));
    slice
}

/// A function with a random `size x size` matrix at every time in `-1..=nt`
pub fn random_function(nt: isize, size: usize) -> ContourFunction {
    let mut rng = thread_rng();
    let mut function = ContourFunction::new(nt, size, size);
    for t in -1..=nt {
        let value = DMatrix::from_fn(size, size, |_, _| random_complex(&mut rng));
        function.set_value(t, &value);
    }
    function
}

/// Evenly spaced levels in `[-1, 1]`, tabulated at inverse temperature `beta = 5`
pub fn reference_levels(size: usize, nt: isize, ntau: usize, statistics: Statistics) -> FreeLevels {
    let energies = (0..size)
        .map(|k| {
            if size == 1 {
                0.
            } else {
                -1. + 2. * k as f64 / (size - 1) as f64
            }
        })
        .collect();
    FreeLevels {
        energies,
        beta: 5.,
        dt: 0.02,
        nt,
        ntau,
        statistics,
    }
}

pub fn reference_herm_matrix(
    size: usize,
    nt: isize,
    ntau: usize,
    statistics: Statistics,
) -> HermMatrix {
    reference_levels(size, nt, ntau, statistics).build()
}
