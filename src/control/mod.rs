//! Run-time configuration of the interference model.

pub mod config;

pub use config::{PropagationConfig, SimulatorConfig, TopologyConfig, TrackerConfig};
