//! # Reference contour objects
//!
//! Closed forms for a set of uncoupled levels `ε_k` in equilibrium at inverse temperature
//! `β`, with occupation `n_k = 1 / (e^{β ε_k} - sig)`:
//!
//! - `R(t, t') = -i e^{-i ε (t - t')}`
//! - `<(t, t') = -i sig n e^{-i ε (t - t')}`
//! - `⌈(t, τ) = -i sig n e^{-i ε t} e^{ε τ}`
//! - `M(τ) = -(1 + sig n) e^{-ε τ}`
//!
//! The density matrix of every slice is `diag(n_k)`, which makes these objects a convenient
//! check on the slice algebra.
use crate::{HermMatrix, Statistics};
use num_complex::Complex64;

/// Uncoupled levels on a time grid
#[derive(Clone, Debug, PartialEq)]
pub struct FreeLevels {
    /// The level energies, one per diagonal entry
    pub energies: Vec<f64>,
    /// Inverse temperature
    pub beta: f64,
    /// Real-time step
    pub dt: f64,
    /// The last real-time index
    pub nt: isize,
    /// The last imaginary-time index
    pub ntau: usize,
    /// Particle statistics of the levels
    pub statistics: Statistics,
}

impl FreeLevels {
    /// The equilibrium occupation of each level
    pub fn occupations(&self) -> Vec<f64> {
        let sign = self.statistics.sign();
        self.energies
            .iter()
            .map(|energy| 1. / ((self.beta * energy).exp() - sign))
            .collect()
    }

    fn dtau(&self) -> f64 {
        if self.ntau == 0 {
            0.
        } else {
            self.beta / self.ntau as f64
        }
    }

    /// Tabulate the levels as a diagonal [`HermMatrix`]
    pub fn build(&self) -> HermMatrix {
        let size = self.energies.len();
        let sign = self.statistics.sign();
        let occupations = self.occupations();
        let i = Complex64::i();
        let mut g = HermMatrix::new(self.nt, self.ntau, size, size, self.statistics);

        for (k, (&energy, &n)) in self.energies.iter().zip(&occupations).enumerate() {
            let diagonal = k * size + k;
            let phase = |t: f64| (-i * energy * t).exp();

            for j in 0..=self.ntau {
                let tau = j as f64 * self.dtau();
                g.mat_mut(j)[diagonal] = Complex64::new(-(1. + sign * n) * (-energy * tau).exp(), 0.);
            }
            for t in 0..(self.nt + 1) as usize {
                let time = t as f64 * self.dt;
                for t1 in 0..=t {
                    let delta = (t - t1) as f64 * self.dt;
                    g.ret_mut(t, t1)[diagonal] = -i * phase(delta);
                    // <(t1, t) = -i sig n e^{-i ε (t1 - t)}
                    g.les_mut(t1, t)[diagonal] = -i * sign * n * phase(-delta);
                }
                for j in 0..=self.ntau {
                    let tau = j as f64 * self.dtau();
                    g.tv_mut(t, j)[diagonal] = -i * sign * n * phase(time) * (energy * tau).exp();
                }
            }
        }
        tracing::debug!(nt = self.nt, ntau = self.ntau, size, "built reference levels");
        g
    }
}

#[cfg(test)]
mod test {
    use super::FreeLevels;
    use crate::{ContourRead, Statistics, TimestepSource};
    use approx::assert_relative_eq;
    use num_complex::Complex64;

    fn levels(statistics: Statistics) -> FreeLevels {
        FreeLevels {
            energies: vec![0.5, 1.25],
            beta: 2.,
            dt: 0.1,
            nt: 4,
            ntau: 8,
            statistics,
        }
    }

    #[test]
    fn density_matrix_is_the_occupation_at_every_time() {
        for statistics in [Statistics::Fermion, Statistics::Boson] {
            let levels = levels(statistics);
            let occupations = levels.occupations();
            let g = levels.build();
            for tstp in -1..=4 {
                let mut rho: nalgebra::DMatrix<Complex64> = nalgebra::DMatrix::zeros(0, 0);
                g.density_matrix_into(tstp, &mut rho);
                for (k, n) in occupations.iter().enumerate() {
                    assert_relative_eq!(rho[(k, k)].re, *n, epsilon = 1e-12);
                    assert_relative_eq!(rho[(k, k)].im, 0., epsilon = 1e-12);
                }
            }
        }
    }

    #[test]
    fn left_mixing_meets_the_lesser_component_at_the_origin() {
        let g = levels(Statistics::Fermion).build();
        let view = g.timestep_view(0);
        let (mut tv, mut les) = (Complex64::default(), Complex64::default());
        view.get_tv_at(0, &mut tv);
        view.get_les_t_tstp(0, &mut les);
        assert_relative_eq!(tv.re, les.re, epsilon = 1e-14);
        assert_relative_eq!(tv.im, les.im, epsilon = 1e-14);
    }

    #[test]
    fn matsubara_branch_is_hermitian() {
        let g = levels(Statistics::Fermion).build();
        let mut slice = g.timestep_view(-1).to_timeslice();
        let before = slice.clone();
        crate::ContourWrite::set_mat_herm(&mut slice);
        assert_eq!(slice, before);
    }
}
