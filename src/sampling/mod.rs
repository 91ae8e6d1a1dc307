//! Sampling module - FCIQMC population dynamics and trace statistics.

mod fciqmc;
mod stats;

pub use fciqmc::{FciqmcParams, Phase, PopulationEngine, SpawnEvent, TraceSample, Walker};
pub use stats::{autocorrelation_time, blocking_error, mean, sample_std_dev, Estimate, Statistics};
