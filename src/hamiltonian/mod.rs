//! Hamiltonian module - matrix elements between determinants.

mod evaluator;

pub use evaluator::HamiltonianEvaluator;
