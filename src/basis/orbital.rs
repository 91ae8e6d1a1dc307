//! Single-particle orbitals and the symmetry keys that partition them.

use serde::{Deserialize, Serialize};

/// A single-particle orbital: identity, energy and conserved quantum numbers.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Orbital {
    /// Position of the orbital in the ordered orbital list
    pub index: usize,
    /// Shell (level) quantum number
    pub level: i32,
    /// Spin-type, +1 or -1
    pub spin: i32,
    /// Single-particle energy
    pub energy: f64,
}

/// Symmetry key of a single orbital: its spin projection.
///
/// Orbitals sharing this key may be connected by a one-body excitation.
#[inline]
pub fn one_body_symmetry_key(orb: &Orbital) -> i32 {
    orb.spin
}

/// Symmetry key of an orbital pair: the total spin projection of the pair.
#[inline]
pub fn two_body_symmetry_key(a: &Orbital, b: &Orbital) -> i32 {
    a.spin + b.spin
}

#[inline]
pub fn check_one_body_symmetry(a: &Orbital, b: &Orbital) -> bool {
    one_body_symmetry_key(a) == one_body_symmetry_key(b)
}

#[inline]
pub fn check_two_body_symmetry(a: &Orbital, b: &Orbital, c: &Orbital, d: &Orbital) -> bool {
    two_body_symmetry_key(a, b) == two_body_symmetry_key(c, d)
}
