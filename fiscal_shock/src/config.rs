//! TOML experiment files
//!
//! An experiment names one or more scenarios sharing a calibration, a
//! horizon and solver settings, plus where to write results and an optional
//! tax-rate sweep:
//!
//! ```toml
//! [experiment]
//! name = "baxter_king_fig1"
//! description = "Permanent rise in purchases"
//! horizon = 200
//!
//! [calibration]
//! tau_bar = 0.2
//!
//! [[scenario]]
//! name = "lump-sum"
//! financing = "lump_sum"
//! shock = { kind = "permanent" }
//!
//! [output]
//! dir = "results"
//!
//! [sweep]
//! tax_rates = [0.1, 0.2, 0.3]
//! ```

use foresight::NewtonConfig;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::params::{CalibrationTargets, Financing};
use crate::scenarios::{ScenarioConfig, ShockProfile, DEFAULT_HORIZON};
use crate::ModelError;

/// Top-level experiment configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentConfig {
    pub experiment: ExperimentMetadata,
    #[serde(default)]
    pub calibration: CalibrationTargets,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(rename = "scenario")]
    pub scenarios: Vec<ScenarioEntry>,
    #[serde(default)]
    pub output: OutputSettings,
    pub sweep: Option<SweepConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_horizon")]
    pub horizon: usize,
}

/// Newton settings; anything left out keeps the engine default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SolverSettings {
    pub tolerance: Option<f64>,
    pub max_iterations: Option<usize>,
    pub min_step: Option<f64>,
    pub fd_step: Option<f64>,
}

impl SolverSettings {
    pub fn to_newton_config(&self) -> NewtonConfig {
        let defaults = NewtonConfig::default();
        NewtonConfig {
            tolerance: self.tolerance.unwrap_or(defaults.tolerance),
            max_iterations: self.max_iterations.unwrap_or(defaults.max_iterations),
            min_step: self.min_step.unwrap_or(defaults.min_step),
            fd_step: self.fd_step.unwrap_or(defaults.fd_step),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEntry {
    pub name: String,
    #[serde(default = "default_financing")]
    pub financing: Financing,
    #[serde(default = "default_shock")]
    pub shock: ShockProfile,
    #[serde(default = "default_shock_units")]
    pub shock_units: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub save_path: bool,
    pub save_responses: bool,
    pub save_summary: bool,
    pub print_tables: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        OutputSettings {
            dir: PathBuf::from("results"),
            save_path: true,
            save_responses: true,
            save_summary: true,
            print_tables: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SweepConfig {
    pub tax_rates: Vec<f64>,
    /// Index of the scenario the sweep starts from
    #[serde(default)]
    pub base: usize,
}

fn default_horizon() -> usize {
    DEFAULT_HORIZON
}

fn default_financing() -> Financing {
    Financing::LumpSum
}

fn default_shock() -> ShockProfile {
    ShockProfile::Permanent
}

fn default_shock_units() -> f64 {
    1.0
}

impl FromStr for ExperimentConfig {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let config: ExperimentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

impl ExperimentConfig {
    /// Read and validate an experiment file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ModelError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        text.parse()
    }

    fn validate(&self) -> Result<(), ModelError> {
        if self.scenarios.is_empty() {
            return Err(ModelError::InvalidConfig(
                "at least one [[scenario]] is required".to_string(),
            ));
        }
        if self.experiment.horizon < 2 {
            return Err(ModelError::InvalidConfig(format!(
                "horizon {} leaves no periods to solve",
                self.experiment.horizon
            )));
        }
        for entry in &self.scenarios {
            if !entry.shock_units.is_finite() || entry.shock_units == 0.0 {
                return Err(ModelError::InvalidConfig(format!(
                    "scenario '{}' has shock_units {}",
                    entry.name, entry.shock_units
                )));
            }
        }
        for scenario in self.to_scenarios() {
            scenario.validate()?;
        }
        if let Some(sweep) = &self.sweep {
            if sweep.base >= self.scenarios.len() {
                return Err(ModelError::InvalidConfig(format!(
                    "sweep base {} but only {} scenarios",
                    sweep.base,
                    self.scenarios.len()
                )));
            }
            if let Some(bad) = sweep.tax_rates.iter().find(|t| !(0.0..1.0).contains(*t)) {
                return Err(ModelError::InvalidConfig(format!(
                    "sweep tax rate {bad} outside [0, 1)"
                )));
            }
        }
        Ok(())
    }

    /// Scenarios in file order
    pub fn to_scenarios(&self) -> Vec<ScenarioConfig> {
        let solver = self.solver.to_newton_config();
        self.scenarios
            .iter()
            .map(|entry| ScenarioConfig {
                name: entry.name.clone(),
                targets: self.calibration.clone(),
                financing: entry.financing,
                shock: entry.shock,
                shock_units: entry.shock_units,
                horizon: self.experiment.horizon,
                solver: solver.clone(),
            })
            .collect()
    }

    /// Scenario the tax-rate sweep is built on, if a sweep is configured
    pub fn sweep_base(&self) -> Option<ScenarioConfig> {
        let sweep = self.sweep.as_ref()?;
        self.to_scenarios().into_iter().nth(sweep.base)
    }
}
