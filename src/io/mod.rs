//! IO module - run configuration and trace output.

mod config;

pub use config::{read_config, write_trace, PairingSystem, RunConfig};
