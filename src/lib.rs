//! Pairing FCIQMC - full configuration interaction quantum Monte Carlo in Rust
//!
//! This crate provides a bit-encoded determinant basis partitioned into
//! symmetry channels, Slater-Condon matrix elements for the pairing model,
//! an initiator FCIQMC population engine with shift control, and an exact
//! diagonalization reference.

pub mod basis;
pub mod error;
pub mod exact;
pub mod hamiltonian;
pub mod io;
pub mod sampling;
pub mod systems;

// Re-export commonly used types at crate root
pub use basis::{Determinant, Orbital, SymmetryBasis};
pub use error::{BasisError, ConfigError, FciqmcError};
pub use exact::FullCi;
pub use hamiltonian::HamiltonianEvaluator;
pub use io::{read_config, write_trace, PairingSystem, RunConfig};
pub use sampling::{FciqmcParams, Phase, PopulationEngine, Statistics, TraceSample};
pub use systems::{pairing_orbitals, PairingInteraction};
