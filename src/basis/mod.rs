//! Basis module - determinants, orbitals and the symmetry-channel partition.

mod determinant;
mod orbital;
mod symmetry;

pub use determinant::{Determinant, MAX_ORBITALS};
pub use orbital::{
    check_one_body_symmetry, check_two_body_symmetry, one_body_symmetry_key,
    two_body_symmetry_key, Orbital,
};
pub use symmetry::{ChannelSlot, DoubleExcitation, SingleExcitation, SymmetryBasis};
