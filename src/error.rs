//! Error types for basis construction, FCIQMC runs and configuration loading.
//!
//! Every variant here is fatal: it signals a configuration or programming
//! defect, never a stochastic outcome. Null excitations and symmetry-forbidden
//! matrix elements are ordinary values, not errors.

use thiserror::Error;

/// Errors raised while building determinants and the symmetry partition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BasisError {
    #[error("orbital index {index} out of range [0, {nmo})")]
    InvalidIndex { index: usize, nmo: usize },

    #[error("{nmo} orbitals requested, at most {max} fit in a determinant")]
    TooManyOrbitals { nmo: usize, max: usize },

    #[error("particle number {particles} exceeds orbital count {nmo}")]
    ParticleNumberExceedsOrbitals { particles: usize, nmo: usize },

    #[error("orbital at position {position} carries index {index}")]
    MisplacedOrbital { position: usize, index: usize },

    #[error("{kind} lookup slot {slot} assigned twice")]
    DuplicateChannelSlot { kind: &'static str, slot: usize },

    #[error("{kind} lookup slot {slot} never assigned")]
    MissingChannelSlot { kind: &'static str, slot: usize },

    #[error("two-body channel {channel}: pairs {left:?} and {right:?} do not share a symmetry key")]
    ChannelMismatch {
        channel: usize,
        left: (usize, usize),
        right: (usize, usize),
    },
}

/// Errors raised by the population engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FciqmcError {
    #[error(transparent)]
    Basis(#[from] BasisError),

    #[error("reference determinant {0} is not populated")]
    ReferenceMissing(String),

    #[error("reference determinant carries zero walkers")]
    ReferenceEmpty,

    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("population did not reach the target within {steps} warm-up generations")]
    WarmupExhausted { steps: usize },

    #[error("no time step in the search range reached the target population")]
    TimeStepSearchFailed,

    #[error("equilibration fraction must satisfy 0 < pos < 1, got {0}")]
    InvalidFraction(f64),

    #[error("statistics need at least 2 samples after equilibration, have {0}")]
    InsufficientSamples(usize),
}

/// Errors raised while loading a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
