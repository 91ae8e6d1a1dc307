//! The pairing model.
//!
//! `P` doubly-degenerate levels with energies `(p - 1) δ`, each holding one
//! spin-up and one spin-down orbital, coupled by a pairing force that moves
//! time-reversed pairs between levels:
//!
//!   H = Σ_pσ (p - 1) δ a†_pσ a_pσ - (g/2) Σ_pq a†_p+ a†_p- a_q- a_q+

use serde::{Deserialize, Serialize};

use crate::basis::Orbital;

/// Orbitals of the pairing model, ordered by level then spin (+1 before -1).
///
/// The list is ascending in energy, as `SymmetryBasis::minimum_det` expects.
pub fn pairing_orbitals(p_max: usize, delta: f64) -> Vec<Orbital> {
    let mut orbitals = Vec::with_capacity(2 * p_max);
    for level in 1..=p_max as i32 {
        for spin in [1, -1] {
            orbitals.push(Orbital {
                index: orbitals.len(),
                level,
                spin,
                energy: (level - 1) as f64 * delta,
            });
        }
    }
    orbitals
}

/// Antisymmetrized pairing interaction of strength `g`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairingInteraction {
    pub strength: f64,
}

impl PairingInteraction {
    pub fn new(strength: f64) -> Self {
        Self { strength }
    }

    /// ⟨ab|V|cd⟩ with antisymmetry built in.
    ///
    /// Nonzero only when `a, b` share a level, `c, d` share a level and both
    /// pairs are spin-opposite.
    pub fn matrix_element(&self, a: &Orbital, b: &Orbital, c: &Orbital, d: &Orbital) -> f64 {
        if a.level != b.level || c.level != d.level {
            return 0.0;
        }
        if a.spin == b.spin || c.spin == d.spin {
            return 0.0;
        }
        if a.spin == c.spin && b.spin == d.spin {
            return -self.strength / 2.0;
        }
        if a.spin == d.spin && b.spin == c.spin {
            return self.strength / 2.0;
        }
        0.0
    }
}
