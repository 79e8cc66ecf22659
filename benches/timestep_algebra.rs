use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use keldysh_contour::{ContourRead, ContourWrite, Statistics, TimestepSource};
use nalgebra::DMatrix;
use num_complex::Complex64;
use utilities::{random_function, random_timeslice, reference_herm_matrix};

const TSTP: isize = 32;
const NTAU: usize = 128;

pub fn bench_left_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("left_multiply");

    for size in [1, 2, 4, 8, 16].into_iter() {
        let function = random_function(TSTP, size);
        let mut slice = random_timeslice(TSTP, NTAU, size, Statistics::Fermion);
        group.bench_with_input(BenchmarkId::new("left", size), &size, |b, _| {
            b.iter(|| slice.left_multiply(black_box(TSTP), black_box(&function), black_box(1.)))
        });
        group.bench_with_input(BenchmarkId::new("right", size), &size, |b, _| {
            b.iter(|| slice.right_multiply(black_box(TSTP), black_box(&function), black_box(1.)))
        });
    }
}

pub fn bench_incr(c: &mut Criterion) {
    let mut group = c.benchmark_group("incr");

    for size in [1, 4, 16].into_iter() {
        let source = random_timeslice(TSTP, NTAU, size, Statistics::Fermion);
        let mut slice = random_timeslice(TSTP, NTAU, size, Statistics::Fermion);
        group.bench_with_input(BenchmarkId::new("timeslice", size), &size, |b, _| {
            b.iter(|| slice.incr(black_box(&source), black_box(0.5)))
        });

        let g = reference_herm_matrix(size, TSTP, NTAU, Statistics::Fermion);
        group.bench_with_input(BenchmarkId::new("herm_matrix", size), &size, |b, _| {
            b.iter(|| slice.incr_timestep(black_box(TSTP), black_box(&g), black_box(0.5)))
        });
    }
}

pub fn bench_reads(c: &mut Criterion) {
    let mut group = c.benchmark_group("reads");

    for size in [1, 4, 16].into_iter() {
        let g = reference_herm_matrix(size, TSTP, NTAU, Statistics::Fermion);
        let view = g.timestep_view(TSTP);
        let mut m: DMatrix<Complex64> = DMatrix::zeros(size, size);
        group.bench_with_input(BenchmarkId::new("swapped_ret", size), &size, |b, _| {
            b.iter(|| {
                for j in 0..TSTP as usize {
                    view.get_ret(black_box(j), TSTP as usize, &mut m);
                }
            })
        });
        group.bench_with_input(BenchmarkId::new("vt", size), &size, |b, _| {
            b.iter(|| {
                for i in 0..=NTAU {
                    view.get_vt(black_box(i), TSTP as usize, &mut m);
                }
            })
        });
    }
}

criterion_group!(benches, bench_left_multiply, bench_incr, bench_reads);
criterion_main!(benches);
