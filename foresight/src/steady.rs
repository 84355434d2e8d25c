use tracing::info;

use crate::error::{SolveError, SolveResult};
use crate::model::{DynamicModel, Period};
use crate::newton::{self, NewtonConfig, NewtonSystem};

/// A stationary solution: every residual is zero with lag = current = lead
#[derive(Debug, Clone, PartialEq)]
pub struct SteadyState {
    /// Endogenous values in state-vector order
    pub values: Vec<f64>,
    /// Exogenous values the state was solved for
    pub exo: Vec<f64>,
    /// Max-norm of the residuals at `values`
    pub residual: f64,
    /// Newton steps used
    pub iterations: usize,
}

impl SteadyState {
    /// Value of a named variable
    pub fn get<M: DynamicModel + ?Sized>(&self, model: &M, name: &str) -> Option<f64> {
        model.index_of(name).map(|i| self.values[i])
    }
}

struct StationarySystem<'a, M: ?Sized> {
    model: &'a M,
    exo: &'a [f64],
    fd_step: f64,
}

impl<M: DynamicModel + ?Sized> NewtonSystem for StationarySystem<'_, M> {
    fn len(&self) -> usize {
        self.model.n_endo()
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        self.model.residuals(&Period::stationary(x, self.exo), out);
    }

    fn direction(&self, x: &[f64], f: &[f64]) -> SolveResult<Vec<f64>> {
        let jac = newton::dense_jacobian(|v, out| self.residual(v, out), x, self.fd_step);
        newton::dense_direction(jac, f)
    }

    fn describe(&self, i: usize) -> String {
        self.model.equation_names()[i].to_string()
    }
}

/// Solve for the steady state of `model` at exogenous values `exo`
///
/// `guess` seeds the Newton iteration; a previous steady state makes a good
/// warm start after a permanent change in `exo`.
pub fn steady_state<M: DynamicModel + ?Sized>(
    model: &M,
    guess: &[f64],
    exo: &[f64],
    config: &NewtonConfig,
) -> SolveResult<SteadyState> {
    if exo.len() != model.n_exo() {
        return Err(SolveError::DimensionMismatch {
            what: "exogenous vector",
            expected: model.n_exo(),
            found: exo.len(),
        });
    }

    let system = StationarySystem {
        model,
        exo,
        fd_step: config.fd_step,
    };
    let mut values = guess.to_vec();
    let report = newton::solve(&system, &mut values, config)?;

    info!(
        iterations = report.iterations,
        residual = report.residual,
        "steady state solved"
    );

    Ok(SteadyState {
        values,
        exo: exo.to_vec(),
        residual: report.residual,
        iterations: report.iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::ToyModel;
    use approx::assert_abs_diff_eq;

    #[test]
    fn toy_steady_state_matches_closed_form() {
        // k = a sqrt(k) + e, p = 2k
        let model = ToyModel { a: 2.0 };
        let ss = steady_state(&model, &[3.0, 5.0], &[0.0], &NewtonConfig::default()).unwrap();

        assert_abs_diff_eq!(ss.values[0], 4.0, epsilon = 1e-9);
        assert_abs_diff_eq!(ss.values[1], 8.0, epsilon = 1e-9);
        assert_eq!(ss.get(&model, "p"), Some(ss.values[1]));
        assert_eq!(ss.get(&model, "missing"), None);
    }

    #[test]
    fn warm_start_after_exogenous_shift() {
        let model = ToyModel { a: 2.0 };
        let config = NewtonConfig::default();
        let before = steady_state(&model, &[3.0, 5.0], &[0.0], &config).unwrap();
        let after = steady_state(&model, &before.values, &[1.0], &config).unwrap();

        // k = 2 sqrt(k) + 1 => sqrt(k) = 1 + sqrt(2)
        let root = 1.0 + 2.0_f64.sqrt();
        assert_abs_diff_eq!(after.values[0], root * root, epsilon = 1e-9);
        assert_eq!(after.exo, vec![1.0]);
    }

    #[test]
    fn wrong_exogenous_length_is_rejected() {
        let model = ToyModel { a: 2.0 };
        let err = steady_state(&model, &[3.0, 5.0], &[], &NewtonConfig::default()).unwrap_err();
        assert!(matches!(err, SolveError::DimensionMismatch { expected: 1, found: 0, .. }));
    }
}
