//! Slater-Condon matrix elements over the symmetry-partitioned basis.
//!
//! Two-body elements are precomputed once per two-body channel as a dense
//! block over channel positions. Elements between pairs of different
//! channels vanish by symmetry and are never stored.

use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::debug;

use crate::basis::{
    check_one_body_symmetry, check_two_body_symmetry, Determinant, SymmetryBasis,
};
use crate::error::BasisError;
use crate::systems::PairingInteraction;

/// Matrix elements ⟨Df|H|Di⟩ of the pairing Hamiltonian.
#[derive(Clone, Debug)]
pub struct HamiltonianEvaluator {
    basis: Arc<SymmetryBasis>,
    interaction: PairingInteraction,
    constant: f64,
    one_body: Vec<f64>,
    two_body: Vec<DMatrix<f64>>,
}

impl HamiltonianEvaluator {
    pub fn build(
        basis: Arc<SymmetryBasis>,
        interaction: PairingInteraction,
    ) -> Result<Self, BasisError> {
        let one_body = basis.orbitals().iter().map(|orb| orb.energy).collect();
        let two_body = Self::two_body_blocks(&basis, &interaction)?;
        debug!(strength = interaction.strength, blocks = two_body.len(), "hamiltonian built");
        Ok(Self {
            basis,
            interaction,
            constant: 0.0,
            one_body,
            two_body,
        })
    }

    /// Tabulate ⟨ab|V|cd⟩ for every pair of positions inside each channel.
    fn two_body_blocks(
        basis: &SymmetryBasis,
        interaction: &PairingInteraction,
    ) -> Result<Vec<DMatrix<f64>>, BasisError> {
        let mut blocks = Vec::with_capacity(basis.two_body_channels().len());
        for (channel, pairs) in basis.two_body_channels().iter().enumerate() {
            let size = pairs.len();
            let mut block = DMatrix::zeros(size, size);
            for (left, &(a, b)) in pairs.iter().enumerate() {
                let (orb_a, orb_b) = (basis.orbital(a), basis.orbital(b));
                for (right, &(c, d)) in pairs.iter().enumerate() {
                    let (orb_c, orb_d) = (basis.orbital(c), basis.orbital(d));
                    if !check_two_body_symmetry(orb_a, orb_b, orb_c, orb_d) {
                        return Err(BasisError::ChannelMismatch {
                            channel,
                            left: (a, b),
                            right: (c, d),
                        });
                    }
                    block[(left, right)] = interaction.matrix_element(orb_a, orb_b, orb_c, orb_d);
                }
            }
            blocks.push(block);
        }
        Ok(blocks)
    }

    pub fn basis(&self) -> &Arc<SymmetryBasis> {
        &self.basis
    }

    pub fn strength(&self) -> f64 {
        self.interaction.strength
    }

    /// Change the pairing strength and retabulate the two-body blocks.
    pub fn set_strength(&mut self, strength: f64) -> Result<(), BasisError> {
        let interaction = PairingInteraction::new(strength);
        self.two_body = Self::two_body_blocks(&self.basis, &interaction)?;
        self.interaction = interaction;
        Ok(())
    }

    /// Antisymmetrized ⟨ab|V|cd⟩ looked up from the channel blocks.
    ///
    /// Pairs may be given in either order; each swap flips the sign.
    pub fn find_two_body(&self, a: usize, b: usize, c: usize, d: usize) -> f64 {
        if a == b || c == d {
            return 0.0;
        }
        let mut sign = 1.0;
        if a > b {
            sign = -sign;
        }
        if c > d {
            sign = -sign;
        }
        let bra = self.basis.two_body_slot(a, b);
        let ket = self.basis.two_body_slot(c, d);
        if bra.channel != ket.channel {
            return 0.0;
        }
        sign * self.two_body[bra.channel][(bra.position, ket.position)]
    }

    /// Diagonal element ⟨D|H|D⟩.
    pub fn hmat0(&self, det: &Determinant) -> f64 {
        let occupied = det.occupied_indices();
        let mut sum = self.constant;
        for (n, &k) in occupied.iter().enumerate() {
            sum += self.one_body[k];
            for &l in &occupied[n + 1..] {
                sum += self.find_two_body(k, l, k, l);
            }
        }
        sum
    }

    /// Single excitation `a -> b` on top of the common occupation `det`.
    pub fn hmat1(&self, det: &Determinant, a: usize, b: usize) -> f64 {
        let sum: f64 = det
            .occupied_indices()
            .into_iter()
            .map(|k| self.find_two_body(b, k, a, k))
            .sum();
        phase(det.count_between(a, b)) * sum
    }

    /// Double excitation `(a, b) -> (c, d)` on top of the common occupation
    /// `det`.
    pub fn hmat2(&self, det: &Determinant, a: usize, b: usize, c: usize, d: usize) -> f64 {
        let permutations = det.count_between(a, b) + det.count_between(c, d);
        phase(permutations) * self.find_two_body(c, d, a, b)
    }

    /// ⟨Df|H|Di⟩. Zero between different particle numbers and beyond
    /// double excitations.
    pub fn hmat(&self, df: &Determinant, di: &Determinant) -> f64 {
        if df.count_occupation() != di.count_occupation() {
            return 0.0;
        }
        let diff = *df ^ *di;
        let same = *df & *di;
        match diff.count_occupation() {
            0 => self.hmat0(&same),
            2 => {
                let hole = (diff & *di).find_nth(1);
                let particle = (diff & *df).find_nth(1);
                if !check_one_body_symmetry(self.basis.orbital(hole), self.basis.orbital(particle))
                {
                    return 0.0;
                }
                self.hmat1(&same, hole, particle)
            }
            4 => {
                let holes = diff & *di;
                let particles = diff & *df;
                let (i1, i2) = (holes.find_nth(1), holes.find_nth(2));
                let (f1, f2) = (particles.find_nth(1), particles.find_nth(2));
                let orb = |i| self.basis.orbital(i);
                if !check_two_body_symmetry(orb(i1), orb(i2), orb(f1), orb(f2)) {
                    return 0.0;
                }
                self.hmat2(&same, i1, i2, f1, f2)
            }
            _ => 0.0,
        }
    }
}

/// (-1)^n
#[inline]
fn phase(n: usize) -> f64 {
    if n % 2 == 0 {
        1.0
    } else {
        -1.0
    }
}
