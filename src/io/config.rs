//! YAML run configuration.
//!
//! ```yaml
//! system:
//!   p_max: 4
//!   delta: 1.0
//!   particles: 4
//!   strength: 1.0
//! fciqmc:
//!   initial_walkers: 10
//!   target_walker_number: 1000
//!   d_tau: 0.01
//!   A: 10
//!   xi: 0.1
//!   zeta: 0.01
//!   steps: 3000
//!   initiator_threshold: 1
//!   onebody_probability: 0.5
//! seed: 7
//! ```

use std::io::Write;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::basis::SymmetryBasis;
use crate::error::{BasisError, ConfigError};
use crate::hamiltonian::HamiltonianEvaluator;
use crate::sampling::{FciqmcParams, TraceSample};
use crate::systems::{pairing_orbitals, PairingInteraction};

/// Pairing model: `p_max` levels spaced by `delta`, `particles` fermions,
/// pairing strength `strength`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PairingSystem {
    pub p_max: usize,
    pub delta: f64,
    pub particles: usize,
    pub strength: f64,
}

impl PairingSystem {
    pub fn build_hamiltonian(&self) -> Result<HamiltonianEvaluator, BasisError> {
        let basis = SymmetryBasis::build(pairing_orbitals(self.p_max, self.delta), self.particles)?;
        HamiltonianEvaluator::build(Arc::new(basis), PairingInteraction::new(self.strength))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub system: PairingSystem,
    pub fciqmc: FciqmcParams,
    #[serde(default)]
    pub seed: Option<u64>,
    /// Leading fraction of the trace discarded before statistics
    #[serde(default = "default_equilibration")]
    pub equilibration: f64,
    /// Scan for a time step before the run instead of using `d_tau`
    #[serde(default)]
    pub search_time_step: bool,
    /// Skip the exact diagonalization
    #[serde(default)]
    pub skip_fci: bool,
    #[serde(default)]
    pub trace_file: Option<String>,
}

fn default_equilibration() -> f64 {
    0.5
}

pub fn read_config(filename: &str) -> Result<RunConfig, ConfigError> {
    let file = std::fs::File::open(filename)?;
    let reader = std::io::BufReader::new(file);
    let config: RunConfig = serde_yaml::from_reader(reader)?;
    Ok(config)
}

/// Write the trace as a YAML sequence of samples.
pub fn write_trace<W: Write>(writer: W, trace: &[TraceSample]) -> Result<(), ConfigError> {
    serde_yaml::to_writer(writer, trace)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const CONFIG: &str = "
system:
  p_max: 4
  delta: 1.0
  particles: 4
  strength: 0.5
fciqmc:
  initial_walkers: 20
  target_walker_number: 500
  d_tau: 0.005
  A: 5
  xi: 0.1
  zeta: 0.01
  steps: 1000
  initiator_threshold: 2
  onebody_probability: 0.3
  use_initiator: false
seed: 11
";

    #[test]
    fn test_parse_config() {
        let config: RunConfig = serde_yaml::from_str(CONFIG).unwrap();
        assert_eq!(config.system.p_max, 4);
        assert_relative_eq!(config.system.strength, 0.5);
        assert_eq!(config.fciqmc.report_interval, 5);
        assert!(!config.fciqmc.use_initiator);
        assert_relative_eq!(config.fciqmc.min_spawn_num, 0.01);
        assert_eq!(config.fciqmc.max_warmup_steps, 10_000);
        assert_eq!(config.seed, Some(11));
        assert_relative_eq!(config.equilibration, 0.5);
        assert!(!config.search_time_step);
        assert_eq!(config.trace_file, None);

        let h = config.system.build_hamiltonian().unwrap();
        assert_eq!(h.basis().nmo(), 8);
        assert_relative_eq!(h.hmat0(&h.basis().minimum_det()), 1.5);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let err = serde_yaml::from_str::<RunConfig>("system: {p_max: 4}").unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_read_config_missing_file() {
        assert!(matches!(read_config("no/such/file.yml"), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_write_trace() {
        let trace = [TraceSample { tau: 0.0, shift: 1.0, energy: 0.75, population: 1000.0 }];
        let mut out = Vec::new();
        write_trace(&mut out, &trace).unwrap();
        let parsed: Vec<TraceSample> = serde_yaml::from_slice(&out).unwrap();
        assert_eq!(parsed, trace);
    }
}
