//! Exact module - deterministic reference energies.

mod fci;

pub use fci::FullCi;
