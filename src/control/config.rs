//! TOML configuration for the interference model.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! classic 802.11 setup: NIST error model, 1 dB antenna gains, -120 dBm signal
//! attenuation threshold, 7 dB noise figure and a log-distance channel.
//!
//! ```toml
//! [tracker]
//! error_model = "yans"
//! sat_dbm = -110.0
//!
//! [propagation]
//! exponent = 3.5
//! frequency_hz = 2.4e9
//!
//! [topology]
//! cs_threshold_dbm = -99.0
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::simulation::error_model::ErrorModelKind;
use crate::simulation::propagation::LogDistancePropagationLossModel;

/// Settings of the interference tracker.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Bit-to-packet error strategy: `nist`, `yans` or `dsss`.
    pub error_model: ErrorModelKind,
    /// Receive antenna gain in dB.
    pub rx_gain_dbm: f64,
    /// Transmit antenna gain in dB, added to every transmission's power.
    pub tx_gain_dbm: f64,
    /// Signal attenuation threshold: signals weaker than this are ignored when
    /// deciding which transmissions can interfere with each other.
    pub sat_dbm: f64,
    /// Receiver noise figure in dB.
    pub noise_figure_db: f64,
    /// Maximum number of transfers kept for PER lookups.
    pub transfer_cache_capacity: usize,
    /// How long after its end a transfer stays available for PER lookups.
    pub transfer_grace_us: u64,
    /// How long after its end an interference stays in the active set.
    pub prune_slack_us: u64,
    /// Size of the active set above which the tracker starts warning.
    pub active_set_warning_capacity: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            error_model: ErrorModelKind::Nist,
            rx_gain_dbm: 1.0,
            tx_gain_dbm: 1.0,
            sat_dbm: -120.0,
            noise_figure_db: 7.0,
            transfer_cache_capacity: 10_000,
            transfer_grace_us: 1_000,
            prune_slack_us: 1,
            active_set_warning_capacity: 1_024,
        }
    }
}

/// Parameters of the log-distance channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Path loss exponent (n).
    pub exponent: f64,
    /// Reference distance d₀ in meters.
    pub reference_distance_m: f64,
    /// Path loss at d₀ in dB. Ignored when `frequency_hz` is set.
    pub reference_loss_db: f64,
    /// Carrier frequency; when present the reference loss is the Friis loss
    /// at d₀ for this frequency.
    pub frequency_hz: Option<f64>,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self {
            exponent: LogDistancePropagationLossModel::DEFAULT_EXPONENT,
            reference_distance_m: LogDistancePropagationLossModel::DEFAULT_REFERENCE_DISTANCE,
            reference_loss_db: LogDistancePropagationLossModel::DEFAULT_REFERENCE_LOSS,
            frequency_hz: None,
        }
    }
}

impl PropagationConfig {
    pub fn build(&self) -> LogDistancePropagationLossModel {
        match self.frequency_hz {
            Some(freq) => LogDistancePropagationLossModel::for_frequency(freq, self.exponent, self.reference_distance_m),
            None => LogDistancePropagationLossModel::new(self.exponent, self.reference_distance_m, self.reference_loss_db),
        }
    }
}

/// Thresholds of the range-based topology.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Carrier-sense threshold in dBm.
    pub cs_threshold_dbm: f64,
    /// Minimum power for a frame to be received, in dBm.
    pub rx_sensitivity_dbm: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            cs_threshold_dbm: -99.0,
            rx_sensitivity_dbm: -96.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    pub tracker: TrackerConfig,
    pub propagation: PropagationConfig,
    pub topology: TopologyConfig,
}

impl SimulatorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the config.toml file
    ///
    /// # Returns
    /// * `Ok(SimulatorConfig)` if the file was read, parsed and validated
    /// * `Err(ConfigError)` describing the first problem otherwise
    pub fn load(config_path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(config_path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SimulatorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracker.transfer_cache_capacity == 0 {
            return Err(ConfigError::Invalid("tracker.transfer_cache_capacity must be positive".to_string()));
        }
        if self.tracker.active_set_warning_capacity == 0 {
            return Err(ConfigError::Invalid("tracker.active_set_warning_capacity must be positive".to_string()));
        }
        if !(self.propagation.exponent > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "propagation.exponent must be positive, got {}",
                self.propagation.exponent
            )));
        }
        if !(self.propagation.reference_distance_m > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "propagation.reference_distance_m must be positive, got {}",
                self.propagation.reference_distance_m
            )));
        }
        if let Some(freq) = self.propagation.frequency_hz {
            if !(freq > 0.0) {
                return Err(ConfigError::Invalid(format!("propagation.frequency_hz must be positive, got {}", freq)));
            }
        }
        Ok(())
    }

    /// Derive the config path from a scene file path.
    ///
    /// Replaces the scene filename with "config.toml" in the same directory.
    pub fn config_path_from_scene(scene_path: &Path) -> PathBuf {
        scene_path.parent().unwrap_or(Path::new(".")).join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SimulatorConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulatorConfig::default());
        assert_eq!(config.tracker.transfer_cache_capacity, 10_000);
        assert_eq!(config.tracker.sat_dbm, -120.0);
        assert_eq!(config.topology.cs_threshold_dbm, -99.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            [tracker]
            error_model = "yans"
            sat_dbm = -110.0

            [propagation]
            exponent = 3.5
            "#,
        )
        .unwrap();
        assert_eq!(config.tracker.error_model, ErrorModelKind::Yans);
        assert_eq!(config.tracker.sat_dbm, -110.0);
        assert_eq!(config.tracker.rx_gain_dbm, 1.0);
        assert_eq!(config.propagation.exponent, 3.5);
        assert_eq!(config.propagation.reference_distance_m, 1.0);
    }

    #[test]
    fn frequency_overrides_reference_loss() {
        let config = SimulatorConfig::from_toml_str(
            r#"
            [propagation]
            reference_loss_db = 10.0
            frequency_hz = 2.4e9
            "#,
        )
        .unwrap();
        let model = config.propagation.build();
        assert!((model.reference_loss - 40.05).abs() < 0.01);
    }

    #[test]
    fn rejects_invalid_values() {
        for bad in [
            "[tracker]\ntransfer_cache_capacity = 0",
            "[propagation]\nexponent = 0.0",
            "[propagation]\nreference_distance_m = -1.0",
        ] {
            assert!(matches!(SimulatorConfig::from_toml_str(bad), Err(ConfigError::Invalid(_))), "{bad}");
        }
    }

    #[test]
    fn rejects_unknown_error_model() {
        let result = SimulatorConfig::from_toml_str("[tracker]\nerror_model = \"magic\"");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = SimulatorConfig::load(Path::new("/definitely/not/here/config.toml"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn config_path_sits_next_to_scene() {
        let path = SimulatorConfig::config_path_from_scene(Path::new("scenes/office.json"));
        assert_eq!(path, PathBuf::from("scenes/config.toml"));
    }
}
