use serde::{Deserialize, Serialize};

use crate::scenarios::ScenarioResult;
use crate::{ModelError, Var};

/// Periods shown in the figure: the shock year plus 21 years after it
pub const CHART_PERIODS: usize = 22;

/// How a level is turned into a plotted deviation from the initial steady state
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Normalization {
    /// `(x - x_ss) / unit`, for flows measured in commodity units
    ShockUnits(f64),
    /// `100 * (x / x_ss - 1)`
    Percent,
    /// `10_000 * (x - x_ss)`, for rates
    BasisPoints,
}

impl Normalization {
    pub fn apply(self, value: f64, steady: f64) -> f64 {
        match self {
            Normalization::ShockUnits(unit) => (value - steady) / unit,
            Normalization::Percent => 100.0 * (value / steady - 1.0),
            Normalization::BasisPoints => 10_000.0 * (value - steady),
        }
    }
}

/// Deviation of every entry of `series` from `steady`
pub fn deviations(series: &[f64], steady: f64, norm: Normalization) -> Vec<f64> {
    series.iter().map(|&x| norm.apply(x, steady)).collect()
}

/// Responses to the purchases shock, in the units of the figure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpulseResponses {
    pub periods: Vec<usize>,
    /// Commodity units
    pub output: Vec<f64>,
    pub consumption: Vec<f64>,
    pub investment: Vec<f64>,
    pub government: Vec<f64>,
    /// Percent
    pub hours: Vec<f64>,
    pub wage: Vec<f64>,
    /// Basis points
    pub interest_rate: Vec<f64>,
}

impl ImpulseResponses {
    /// Deviations over the first `periods` periods of the path
    pub fn from_result(result: &ScenarioResult, periods: usize) -> Result<Self, ModelError> {
        let unit = normalising_unit(result)?;
        let periods = periods.min(result.simulation.periods());

        let response = |var: Var, norm: Normalization| -> Result<Vec<f64>, ModelError> {
            let series = result.series(var)?;
            Ok(deviations(
                &series[..periods],
                result.initial_level(var),
                norm,
            ))
        };

        Ok(ImpulseResponses {
            periods: (0..periods).collect(),
            output: response(Var::Y, Normalization::ShockUnits(unit))?,
            consumption: response(Var::C, Normalization::ShockUnits(unit))?,
            investment: response(Var::I, Normalization::ShockUnits(unit))?,
            government: response(Var::Gb, Normalization::ShockUnits(unit))?,
            hours: response(Var::N, Normalization::Percent)?,
            wage: response(Var::W, Normalization::Percent)?,
            interest_rate: response(Var::R, Normalization::BasisPoints)?,
        })
    }

    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

/// Output multipliers dY/dG
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Multipliers {
    /// Output change in the shock period per unit of purchases
    pub impact: f64,
    /// Terminal steady-state output change per unit of the shock
    pub long_run: f64,
    /// Summed output change over summed purchases change
    pub cumulative: f64,
}

impl Multipliers {
    /// Multipliers over periods `1..periods` of the path
    pub fn from_result(result: &ScenarioResult, periods: usize) -> Result<Self, ModelError> {
        normalising_unit(result)?;
        let shock = result.shock_size;
        let y = result.series(Var::Y)?;
        let gb = result.series(Var::Gb)?;
        let y_ss = result.initial_level(Var::Y);
        let gb_ss = result.initial_level(Var::Gb);

        let end = periods.min(y.len()).max(2);
        let dy: f64 = y[1..end].iter().map(|v| v - y_ss).sum();
        let dg: f64 = gb[1..end].iter().map(|v| v - gb_ss).sum();

        let impact_dg = gb[1] - gb_ss;
        for (label, change) in [("impact", impact_dg), ("cumulative", dg)] {
            if change == 0.0 || !change.is_finite() {
                return Err(ModelError::InvalidConfig(format!(
                    "scenario '{}' has {} purchases change {}, no {} multiplier",
                    result.config.name, label, change, label
                )));
            }
        }

        Ok(Multipliers {
            impact: (y[1] - y_ss) / impact_dg,
            long_run: (result.terminal_level(Var::Y) - y_ss) / shock,
            cumulative: dy / dg,
        })
    }
}

/// Goods per plotted commodity unit, rejecting a zero-sized shock
fn normalising_unit(result: &ScenarioResult) -> Result<f64, ModelError> {
    if result.shock_size == 0.0 || !result.shock_size.is_finite() {
        return Err(ModelError::InvalidConfig(format!(
            "scenario '{}' has shock size {}, responses cannot be normalised",
            result.config.name, result.shock_size
        )));
    }
    Ok(result.shock_size / result.config.shock_units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::{run_scenario, ScenarioConfig};
    use approx::assert_relative_eq;

    #[test]
    fn normalisations() {
        assert_relative_eq!(Normalization::ShockUnits(0.5).apply(2.0, 1.0), 2.0);
        assert_relative_eq!(Normalization::Percent.apply(1.01, 1.0), 1.0, epsilon = 1e-12);
        assert_relative_eq!(
            Normalization::BasisPoints.apply(0.0655, 0.065),
            5.0,
            epsilon = 1e-9
        );
        assert_eq!(deviations(&[1.0, 1.0], 1.0, Normalization::Percent), vec![0.0, 0.0]);
    }

    #[test]
    fn figure_responses_start_at_zero_and_track_the_shock() {
        let result = run_scenario(ScenarioConfig::baxter_king_figure()).unwrap();
        let irf = result.responses(CHART_PERIODS).unwrap();

        assert_eq!(irf.len(), CHART_PERIODS);
        assert_eq!(irf.periods.last(), Some(&21));
        assert!(irf.output[0].abs() < 1e-9);
        assert!(irf.interest_rate[0].abs() < 1e-6);
        for g in &irf.government[1..] {
            assert_relative_eq!(*g, 1.0, epsilon = 1e-6);
        }
        assert!(irf.hours[1] > 0.0);
        assert!(irf.consumption[1] < 0.0);
    }

    #[test]
    fn lump_sum_long_run_multiplier_matches_closed_form() {
        let result = run_scenario(ScenarioConfig::baxter_king_figure()).unwrap();
        let ss = &result.calibration.steady_state;

        // with w, r and tau fixed, hours are linear in purchases
        let y_n = ss[Var::Y] / ss[Var::N];
        let net_n = (ss[Var::Y] - ss[Var::I]) / ss[Var::N];
        let c_l = ss[Var::C] / ss[Var::L];
        let expected = y_n / (net_n + c_l);

        let m = result.multipliers(CHART_PERIODS).unwrap();
        assert_relative_eq!(m.long_run, expected, max_relative = 1e-6);
        assert!(m.long_run > 1.0 && m.long_run < 1.2);
        assert!(m.impact > 0.0 && m.impact < m.long_run);
        assert!(m.cumulative > m.impact && m.cumulative < m.long_run);
    }

    #[test]
    fn temporary_shock_has_no_long_run_effect() {
        let result = run_scenario(ScenarioConfig::temporary(1)).unwrap();
        let m = result.multipliers(CHART_PERIODS).unwrap();
        assert!(m.long_run.abs() < 1e-9);
        assert!(m.impact > 0.0);
    }

    #[test]
    fn zero_shock_cannot_be_normalised() {
        let mut config = ScenarioConfig::baxter_king_figure();
        config.shock_units = 0.0;
        let result = run_scenario(config).unwrap();
        assert!(matches!(
            result.responses(CHART_PERIODS),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn purchases_that_never_move_have_no_multiplier() {
        assert!(matches!(
            run_scenario(ScenarioConfig::temporary(0)),
            Err(ModelError::InvalidConfig(_))
        ));

        // baseline moved onto the shocked level of purchases
        let mut result = run_scenario(ScenarioConfig::temporary(1)).unwrap();
        result.initial.values[Var::Gb.index()] = result.simulation.period(1)[Var::Gb.index()];
        let err = result.multipliers(CHART_PERIODS).unwrap_err();
        assert!(matches!(err, ModelError::InvalidConfig(_)));
        assert!(err.to_string().contains("impact"));
    }
}
