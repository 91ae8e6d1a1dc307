//! Full configuration interaction by dense diagonalization.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::basis::Determinant;
use crate::error::BasisError;
use crate::hamiltonian::HamiltonianEvaluator;

/// Exact spectrum of the Hamiltonian in the N-particle determinant space.
#[derive(Clone, Debug)]
pub struct FullCi {
    determinants: Vec<Determinant>,
    eigenvalues: Vec<f64>,
    ground_state: DVector<f64>,
}

impl FullCi {
    pub fn new(hamiltonian: &HamiltonianEvaluator) -> Result<Self, BasisError> {
        let basis = hamiltonian.basis();
        let determinants = enumerate_determinants(basis.nmo(), basis.particle_number())?;
        let dim = determinants.len();

        let mut matrix = DMatrix::zeros(dim, dim);
        for (i, di) in determinants.iter().enumerate() {
            for (j, dj) in determinants.iter().enumerate().skip(i) {
                let element = hamiltonian.hmat(di, dj);
                matrix[(i, j)] = element;
                matrix[(j, i)] = element;
            }
        }

        let eigen = matrix.symmetric_eigen();
        let mut order: Vec<usize> = (0..dim).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));
        let eigenvalues: Vec<f64> = order.iter().map(|&k| eigen.eigenvalues[k]).collect();
        let ground_state = eigen.eigenvectors.column(order[0]).into_owned();

        debug!(dimension = dim, ground_energy = eigenvalues[0], "full CI solved");
        Ok(Self { determinants, eigenvalues, ground_state })
    }

    pub fn dimension(&self) -> usize {
        self.determinants.len()
    }

    /// Basis determinants in ascending bit order.
    pub fn determinants(&self) -> &[Determinant] {
        &self.determinants
    }

    /// Eigenvalues in ascending order.
    pub fn eigenvalues(&self) -> &[f64] {
        &self.eigenvalues
    }

    pub fn ground_energy(&self) -> f64 {
        self.eigenvalues[0]
    }

    /// Normalized ground-state coefficients, indexed like
    /// [`determinants`](Self::determinants).
    pub fn ground_state(&self) -> &DVector<f64> {
        &self.ground_state
    }
}

/// All `particles`-subsets of `nmo` orbitals, by ascending bit pattern.
fn enumerate_determinants(nmo: usize, particles: usize) -> Result<Vec<Determinant>, BasisError> {
    if particles > nmo {
        return Err(BasisError::ParticleNumberExceedsOrbitals { particles, nmo });
    }
    let first = Determinant::new(0..particles, nmo)?;
    if particles == 0 {
        return Ok(vec![first]);
    }

    let mut dets = Vec::new();
    let mut bits = first.bits();
    loop {
        dets.push(Determinant::from_bits(bits, nmo));
        // next larger pattern with the same popcount
        let lowest = bits & bits.wrapping_neg();
        let Some(ripple) = bits.checked_add(lowest) else {
            break;
        };
        bits = (((ripple ^ bits) >> 2) / lowest) | ripple;
        if nmo < 128 && bits >> nmo != 0 {
            break;
        }
    }
    Ok(dets)
}
