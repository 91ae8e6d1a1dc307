//! Systems module - model Hamiltonians solved by the crate.

mod pairing;

pub use pairing::{pairing_orbitals, PairingInteraction};
