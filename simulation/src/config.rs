//! Simulation configuration
//!
//! [`SimConfig`] is plain serde data. Every field has a default, so a JSON
//! file only needs the values it changes.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensornet_core::ParameterError;
use sensornet_routing::ProtocolKind;

use crate::types::{ReconvergenceMode, StepParams};

/// Errors loading or validating a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] ParameterError),
}

/// Configuration for a sensor network simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Side length of the square deployment area
    pub area_size: f64,
    /// Lower bound of generated transmission ranges
    pub min_range: f64,
    /// Upper bound of generated transmission ranges
    pub max_range: f64,
    /// Reattach nodes left without links after a removal
    pub reconnect_isolated: bool,
    /// Extra selection weight for additions touching low-degree nodes
    pub isolation_bias: f64,
    /// How routes are repaired after each topology change
    pub reconvergence: ReconvergenceMode,
    pub protocol: ProtocolKind,
    /// Keep a [`History`](crate::history::History) of every step
    pub record_history: bool,
    /// Zero all counters once initial convergence finishes
    pub reset_counters_after_setup: bool,
    /// Step parameters used when a caller does not supply their own
    pub step_params: StepParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            area_size: 10.0,
            min_range: 1.0,
            max_range: 3.0,
            reconnect_isolated: true,
            isolation_bias: 2.0,
            reconvergence: ReconvergenceMode::Incremental,
            protocol: ProtocolKind::DistanceVector,
            record_history: true,
            reset_counters_after_setup: false,
            step_params: StepParams::default(),
        }
    }
}

impl SimConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: SimConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check area, ranges, bias and the default step parameters
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("area_size", self.area_size),
            ("min_range", self.min_range),
            ("max_range", self.max_range),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ParameterError::NonPositive { name, value });
            }
        }
        if self.min_range > self.max_range {
            return Err(ParameterError::InvertedRange {
                min: self.min_range,
                max: self.max_range,
            });
        }
        if !self.isolation_bias.is_finite() || self.isolation_bias < 0.0 {
            return Err(ParameterError::NonPositive {
                name: "isolation_bias",
                value: self.isolation_bias,
            });
        }
        self.step_params.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{"area_size": 20.0, "reconvergence": "Full"}"#).unwrap();
        assert_eq!(config.area_size, 20.0);
        assert_eq!(config.reconvergence, ReconvergenceMode::Full);
        assert_eq!(config.max_range, 3.0);
        assert!(config.reconnect_isolated);
    }

    #[test]
    fn test_invalid_values() {
        let config = SimConfig {
            min_range: 4.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParameterError::InvertedRange { .. })
        ));

        let config = SimConfig {
            step_params: StepParams {
                p_new: -0.1,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ParameterError::ProbabilityOutOfRange { name: "p_new", .. })
        ));
    }

    #[test]
    fn test_file_round_trip() {
        let path =
            std::env::temp_dir().join(format!("sensornet-config-{}.json", std::process::id()));
        let config = SimConfig {
            isolation_bias: 0.5,
            record_history: false,
            ..Default::default()
        };
        config.save(&path).unwrap();
        let loaded = SimConfig::from_json_file(&path).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimConfig::from_json_file("/nonexistent/sensornet.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
