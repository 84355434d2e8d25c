use foresight::parallel::{simple_progress_reporter, ParallelRunner};
use foresight::{steady_state, NewtonConfig, PerfectForesight, Simulation, SteadyState};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analysis::{ImpulseResponses, Multipliers};
use crate::calibration::{calibrate, Calibration};
use crate::model::{BaxterKing, E_GB};
use crate::params::{CalibrationTargets, Financing};
use crate::{ModelError, Var};

/// Length of the transition path used in the paper's figure
pub const DEFAULT_HORIZON: usize = 200;

/// Time profile of the purchases shock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ShockProfile {
    /// Purchases rise in period 1 and stay up forever
    Permanent,
    /// Purchases rise in period 1 and revert after `periods` periods
    Temporary { periods: usize },
}

/// Configuration for a fiscal experiment
#[derive(Debug, Clone)]
pub struct ScenarioConfig {
    /// Name of the scenario
    pub name: String,
    /// Calibration targets
    pub targets: CalibrationTargets,
    /// Budget-balancing instrument
    pub financing: Financing,
    /// Shape of the purchases shock
    pub shock: ShockProfile,
    /// Shock size in commodity units (1% of initial output each)
    pub shock_units: f64,
    /// Number of periods between the pinned end points
    pub horizon: usize,
    /// Newton settings for every solve in the scenario
    pub solver: NewtonConfig,
}

impl ScenarioConfig {
    /// Permanent rise in purchases financed by lump-sum taxes (the paper's figure)
    pub fn baxter_king_figure() -> Self {
        ScenarioConfig {
            name: "Permanent purchases, lump-sum financed".to_string(),
            targets: CalibrationTargets::baxter_king(),
            financing: Financing::LumpSum,
            shock: ShockProfile::Permanent,
            shock_units: 1.0,
            horizon: DEFAULT_HORIZON,
            solver: NewtonConfig::default(),
        }
    }

    /// Permanent rise in purchases financed by a higher income tax rate
    pub fn income_tax_financed() -> Self {
        ScenarioConfig {
            name: "Permanent purchases, income-tax financed".to_string(),
            financing: Financing::IncomeTax,
            ..Self::baxter_king_figure()
        }
    }

    /// Purchases up for `periods` periods, lump-sum financed
    pub fn temporary(periods: usize) -> Self {
        ScenarioConfig {
            name: format!("Temporary purchases ({periods} periods), lump-sum financed"),
            shock: ShockProfile::Temporary { periods },
            ..Self::baxter_king_figure()
        }
    }

    /// The three built-in experiments
    pub fn all_three() -> Vec<Self> {
        vec![
            Self::baxter_king_figure(),
            Self::income_tax_financed(),
            Self::temporary(1),
        ]
    }

    /// Reject shock profiles the pinned path cannot represent
    ///
    /// A temporary shock reverts to the initial steady state, so it must
    /// switch on at least once and be off again by the pinned last period.
    pub fn validate(&self) -> Result<(), ModelError> {
        if let ShockProfile::Temporary { periods } = self.shock {
            if periods == 0 {
                return Err(ModelError::InvalidConfig(format!(
                    "scenario '{}' has a temporary shock lasting zero periods",
                    self.name
                )));
            }
            if periods >= self.horizon {
                return Err(ModelError::InvalidConfig(format!(
                    "scenario '{}' has a temporary shock of {} periods but a horizon of {}",
                    self.name, periods, self.horizon
                )));
            }
        }
        Ok(())
    }
}

/// Result of running a scenario
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario configuration
    pub config: ScenarioConfig,
    /// Calibrated parameters and closed-form steady state
    pub calibration: Calibration,
    /// Steady state before the shock
    pub initial: SteadyState,
    /// Steady state the economy settles in after the shock
    pub terminal: SteadyState,
    /// Exogenous purchases shift, one entry per period
    pub exo_path: Vec<Vec<f64>>,
    /// Solved path over `0..=horizon`
    pub simulation: Simulation,
    /// Size of the purchases shock in goods
    pub shock_size: f64,
}

impl ScenarioResult {
    /// The model the scenario was solved with
    pub fn model(&self) -> BaxterKing {
        BaxterKing::new(self.calibration.params.clone(), self.config.financing)
    }

    /// Initial steady-state level of a variable
    pub fn initial_level(&self, var: Var) -> f64 {
        self.initial.values[var.index()]
    }

    /// Terminal steady-state level of a variable
    pub fn terminal_level(&self, var: Var) -> f64 {
        self.terminal.values[var.index()]
    }

    /// Simulated series of a variable, looked up by name
    pub fn series(&self, var: Var) -> Result<Vec<f64>, ModelError> {
        self.simulation
            .series(var.name())
            .ok_or_else(|| ModelError::UnknownVariable(var.name().to_string()))
    }

    /// Responses over the first `periods` periods, normalised for plotting
    pub fn responses(&self, periods: usize) -> Result<ImpulseResponses, ModelError> {
        ImpulseResponses::from_result(self, periods)
    }

    /// Output multipliers over the first `periods` periods
    pub fn multipliers(&self, periods: usize) -> Result<Multipliers, ModelError> {
        Multipliers::from_result(self, periods)
    }

    /// Print a summary of the scenario result
    pub fn print_summary(&self) {
        println!("\n=== {} ===", self.config.name);
        println!(
            "Financing: {}, shock: {:.4} goods ({} commodity units)",
            self.config.financing, self.shock_size, self.config.shock_units
        );
        println!(
            "Solver: steady states in {}/{} iterations, path in {} iterations (max residual {:.2e})",
            self.initial.iterations,
            self.terminal.iterations,
            self.simulation.iterations,
            self.simulation.residual
        );
        println!(
            "{:<14} {:>12} {:>12} {:>10}",
            "Variable", "Initial", "Terminal", "Change %"
        );
        println!("{:-<14} {:->12} {:->12} {:->10}", "", "", "", "");
        for var in [Var::Y, Var::C, Var::I, Var::K, Var::N, Var::W, Var::R, Var::Gb, Var::Tau, Var::Tr] {
            let before = self.initial_level(var);
            let after = self.terminal_level(var);
            let change = if before.abs() > 1e-12 {
                format!("{:>10.3}", 100.0 * (after / before - 1.0))
            } else {
                format!("{:>10}", "-")
            };
            println!("{:<14} {:>12.6} {:>12.6} {}", var.name(), before, after, change);
        }
    }
}

/// Purchases shift for every period of the scenario
fn exo_path(shock: ShockProfile, shock_size: f64, horizon: usize) -> Vec<Vec<f64>> {
    (0..=horizon)
        .map(|t| {
            let on = match shock {
                ShockProfile::Permanent => t >= 1,
                ShockProfile::Temporary { periods } => t >= 1 && t <= periods,
            };
            let mut exo = vec![0.0; 1];
            exo[E_GB] = if on { shock_size } else { 0.0 };
            exo
        })
        .collect()
}

/// Run a single scenario: calibrate, solve both steady states, solve the path
pub fn run_scenario(config: ScenarioConfig) -> Result<ScenarioResult, ModelError> {
    config.validate()?;
    let calibration = calibrate(&config.targets)?;
    let model = BaxterKing::new(calibration.params.clone(), config.financing);

    let initial = steady_state(
        &model,
        calibration.steady_state.as_slice(),
        &[0.0],
        &config.solver,
    )?;

    let shock_size = config.shock_units * 0.01 * initial.values[Var::Y.index()];

    let terminal = match config.shock {
        ShockProfile::Permanent => {
            steady_state(&model, &initial.values, &[shock_size], &config.solver)?
        }
        ShockProfile::Temporary { .. } => initial.clone(),
    };

    let exo_path = exo_path(config.shock, shock_size, config.horizon);
    let problem = PerfectForesight::new(
        &model,
        initial.values.clone(),
        terminal.values.clone(),
        exo_path.clone(),
    )?;
    let simulation = problem.solve(&config.solver)?;

    info!(
        scenario = %config.name,
        path_iterations = simulation.iterations,
        residual = simulation.residual,
        "scenario solved"
    );

    Ok(ScenarioResult {
        config,
        calibration,
        initial,
        terminal,
        exo_path,
        simulation,
        shock_size,
    })
}

/// Run independent scenarios in parallel, results in input order
pub fn run_scenarios(configs: Vec<ScenarioConfig>) -> Vec<Result<ScenarioResult, String>> {
    ParallelRunner::new(configs.len(), |id| run_scenario(configs[id].clone())).run()
}

/// One point of a tax-rate sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub tau_bar: f64,
    pub multipliers: Option<Multipliers>,
    pub error: Option<String>,
}

/// Re-run `base` across income tax rates and collect its multipliers
pub fn sweep_tax_rate(base: &ScenarioConfig, rates: &[f64], periods: usize) -> Vec<SweepPoint> {
    let results = ParallelRunner::new(rates.len(), |id| {
        let mut config = base.clone();
        config.targets.tau_bar = rates[id];
        config.name = format!("{} (tau = {:.2})", base.name, rates[id]);
        run_scenario(config).and_then(|result| result.multipliers(periods))
    })
    .progress(simple_progress_reporter(1))
    .run();

    rates
        .iter()
        .zip(results)
        .map(|(&tau_bar, result)| match result {
            Ok(multipliers) => SweepPoint {
                tau_bar,
                multipliers: Some(multipliers),
                error: None,
            },
            Err(error) => SweepPoint {
                tau_bar,
                multipliers: None,
                error: Some(error),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permanent_path_switches_on_in_period_one() {
        let path = exo_path(ShockProfile::Permanent, 0.5, 10);
        assert_eq!(path.len(), 11);
        assert_eq!(path[0], vec![0.0]);
        assert!(path[1..].iter().all(|e| e[E_GB] == 0.5));
    }

    #[test]
    fn temporary_path_reverts() {
        let path = exo_path(ShockProfile::Temporary { periods: 3 }, 0.5, 10);
        assert_eq!(path[0][E_GB], 0.0);
        assert!(path[1..=3].iter().all(|e| e[E_GB] == 0.5));
        assert!(path[4..].iter().all(|e| e[E_GB] == 0.0));
    }

    #[test]
    fn temporary_shock_must_end_inside_the_horizon() {
        assert!(ScenarioConfig::temporary(DEFAULT_HORIZON - 1).validate().is_ok());

        for periods in [0, DEFAULT_HORIZON, DEFAULT_HORIZON + 50] {
            let err = run_scenario(ScenarioConfig::temporary(periods)).unwrap_err();
            assert!(matches!(err, ModelError::InvalidConfig(_)), "{periods}: {err}");
        }

        let mut short = ScenarioConfig::temporary(50);
        short.horizon = 10;
        assert!(matches!(
            run_scenario(short),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn figure_scenario_solves() {
        let result = run_scenario(ScenarioConfig::baxter_king_figure()).unwrap();
        assert_eq!(result.simulation.periods(), DEFAULT_HORIZON + 1);
        assert!(result.simulation.residual < 1e-10);
        assert!(result.terminal_level(Var::Y) > result.initial_level(Var::Y));
    }

    #[test]
    fn temporary_shock_returns_to_initial_state() {
        let result = run_scenario(ScenarioConfig::temporary(4)).unwrap();
        assert_eq!(result.terminal, result.initial);
        let y = result.series(Var::Y).unwrap();
        let last = *y.last().unwrap();
        assert!((last - result.initial_level(Var::Y)).abs() < 1e-12);
    }

    #[test]
    fn scenarios_run_in_input_order() {
        let results = run_scenarios(ScenarioConfig::all_three());
        assert_eq!(results.len(), 3);
        let names: Vec<String> = results
            .iter()
            .map(|r| r.as_ref().unwrap().config.name.clone())
            .collect();
        assert_eq!(
            names,
            ScenarioConfig::all_three()
                .into_iter()
                .map(|c| c.name)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn infeasible_scenario_is_reported_not_panicked() {
        let mut bad = ScenarioConfig::baxter_king_figure();
        bad.targets.s_g = 0.99;
        let results = run_scenarios(vec![bad, ScenarioConfig::baxter_king_figure()]);
        assert!(results[0].as_ref().unwrap_err().contains("infeasible calibration"));
        assert!(results[1].is_ok());
    }
}
