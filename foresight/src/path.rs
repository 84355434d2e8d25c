//! Perfect-foresight transition paths between two pinned end points
//!
//! Periods `1..horizon` are unknown and solved jointly. With one lag and one
//! lead the stacked Jacobian is block-tridiagonal, so each Newton direction
//! comes from a forward elimination over periods followed by back
//! substitution, one small LU per period.

use nalgebra::{DMatrix, DVector};
use tracing::info;

use crate::error::{SolveError, SolveResult};
use crate::model::{period_jacobian, DynamicModel, Period};
use crate::newton::{self, NewtonConfig, NewtonSystem};
use crate::simulation::Simulation;

/// Exogenous path that moves from `before` to `after` in period 1 and stays there
pub fn permanent_exo_path(before: &[f64], after: &[f64], horizon: usize) -> Vec<Vec<f64>> {
    (0..=horizon)
        .map(|t| if t == 0 { before.to_vec() } else { after.to_vec() })
        .collect()
}

/// A two-point boundary value problem over `0..=horizon`
pub struct PerfectForesight<'a, M: ?Sized> {
    model: &'a M,
    initial: Vec<f64>,
    terminal: Vec<f64>,
    exo_path: Vec<Vec<f64>>,
    horizon: usize,
}

impl<'a, M: DynamicModel + ?Sized> PerfectForesight<'a, M> {
    /// Set up the problem
    ///
    /// `initial` pins period 0, `terminal` pins period `horizon`, and
    /// `exo_path` must hold one exogenous vector per period `0..=horizon`.
    pub fn new(
        model: &'a M,
        initial: Vec<f64>,
        terminal: Vec<f64>,
        exo_path: Vec<Vec<f64>>,
    ) -> SolveResult<Self> {
        let n = model.n_endo();
        check_len("initial condition", n, initial.len())?;
        check_len("terminal condition", n, terminal.len())?;
        if exo_path.len() < 3 {
            return Err(SolveError::DimensionMismatch {
                what: "exogenous path (periods)",
                expected: 3,
                found: exo_path.len(),
            });
        }
        for exo in &exo_path {
            check_len("exogenous vector", model.n_exo(), exo.len())?;
        }
        let horizon = exo_path.len() - 1;

        Ok(PerfectForesight {
            model,
            initial,
            terminal,
            exo_path,
            horizon,
        })
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn exo_path(&self) -> &[Vec<f64>] {
        &self.exo_path
    }

    /// Solve for the interior periods, starting every one at the terminal state
    pub fn solve(&self, config: &NewtonConfig) -> SolveResult<Simulation> {
        let guess: Vec<f64> = (1..self.horizon)
            .flat_map(|_| self.terminal.iter().copied())
            .collect();
        self.solve_from(guess, config)
    }

    /// Solve from an explicit stacked guess for periods `1..horizon`
    pub fn solve_from(&self, mut guess: Vec<f64>, config: &NewtonConfig) -> SolveResult<Simulation> {
        let system = StackedSystem {
            problem: self,
            fd_step: config.fd_step,
        };
        let report = newton::solve(&system, &mut guess, config)?;

        info!(
            horizon = self.horizon,
            iterations = report.iterations,
            residual = report.residual,
            "perfect foresight path solved"
        );

        let n = self.model.n_endo();
        let mut data = DMatrix::zeros(n, self.horizon + 1);
        data.column_mut(0).copy_from_slice(&self.initial);
        for (t, chunk) in guess.chunks(n).enumerate() {
            data.column_mut(t + 1).copy_from_slice(chunk);
        }
        data.column_mut(self.horizon).copy_from_slice(&self.terminal);

        let names = self
            .model
            .variable_names()
            .iter()
            .map(|s| s.to_string())
            .collect();
        Ok(Simulation::new(names, data, report.iterations, report.residual))
    }

    /// Borrowed view of period `t` (1..horizon) given the stacked interior values
    fn period<'s>(&'s self, x: &'s [f64], t: usize) -> Period<'s> {
        let n = self.model.n_endo();
        let slice = move |s: usize| &x[(s - 1) * n..s * n];
        Period {
            lag: if t == 1 {
                self.initial.as_slice()
            } else {
                slice(t - 1)
            },
            cur: slice(t),
            lead: if t + 1 == self.horizon {
                self.terminal.as_slice()
            } else {
                slice(t + 1)
            },
            exo: &self.exo_path[t],
        }
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> SolveResult<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SolveError::DimensionMismatch {
            what,
            expected,
            found,
        })
    }
}

struct StackedSystem<'p, 'a, M: ?Sized> {
    problem: &'p PerfectForesight<'a, M>,
    fd_step: f64,
}

impl<M: DynamicModel + ?Sized> NewtonSystem for StackedSystem<'_, '_, M> {
    fn len(&self) -> usize {
        self.problem.model.n_endo() * (self.problem.horizon - 1)
    }

    fn residual(&self, x: &[f64], out: &mut [f64]) {
        let n = self.problem.model.n_endo();
        for t in 1..self.problem.horizon {
            let period = self.problem.period(x, t);
            self.problem
                .model
                .residuals(&period, &mut out[(t - 1) * n..t * n]);
        }
    }

    fn direction(&self, x: &[f64], f: &[f64]) -> SolveResult<Vec<f64>> {
        let n = self.problem.model.n_endo();
        let m = self.problem.horizon - 1;
        let mut lower = Vec::with_capacity(m);
        let mut diag = Vec::with_capacity(m);
        let mut upper = Vec::with_capacity(m);
        let mut rhs = Vec::with_capacity(m);

        for t in 1..self.problem.horizon {
            let blocks = period_jacobian(self.problem.model, &self.problem.period(x, t), self.fd_step);
            lower.push(blocks.lag);
            diag.push(blocks.cur);
            upper.push(blocks.lead);
            rhs.push(-DVector::from_column_slice(&f[(t - 1) * n..t * n]));
        }

        let dx = solve_block_tridiagonal(&lower, &diag, &upper, &rhs).map_err(|err| match err {
            SolveError::SingularJacobian { period: Some(b) } => {
                SolveError::SingularJacobian { period: Some(b + 1) }
            }
            other => other,
        })?;
        Ok(dx.iter().flat_map(|v| v.iter().copied()).collect())
    }

    fn describe(&self, i: usize) -> String {
        let n = self.problem.model.n_endo();
        let name = self.problem.model.equation_names()[i % n];
        format!("{name} (period {})", i / n + 1)
    }
}

/// Solve a block-tridiagonal system by block elimination
///
/// Block row `t` reads `lower[t] x[t-1] + diag[t] x[t] + upper[t] x[t+1] = rhs[t]`;
/// `lower[0]` and the last `upper` are ignored. A singular pivot block is
/// reported with its block index.
pub fn solve_block_tridiagonal(
    lower: &[DMatrix<f64>],
    diag: &[DMatrix<f64>],
    upper: &[DMatrix<f64>],
    rhs: &[DVector<f64>],
) -> SolveResult<Vec<DVector<f64>>> {
    let m = diag.len();
    // eliminated coupling to the next block and eliminated right-hand side
    let mut coupling: Vec<DMatrix<f64>> = Vec::with_capacity(m);
    let mut reduced: Vec<DVector<f64>> = Vec::with_capacity(m);

    for t in 0..m {
        let (pivot, b) = if t == 0 {
            (diag[0].clone(), rhs[0].clone())
        } else {
            (
                &diag[t] - &lower[t] * &coupling[t - 1],
                &rhs[t] - &lower[t] * &reduced[t - 1],
            )
        };

        let lu = pivot.lu();
        if !lu.is_invertible() {
            return Err(SolveError::SingularJacobian { period: Some(t) });
        }
        let singular = || SolveError::SingularJacobian { period: Some(t) };

        if t + 1 < m {
            coupling.push(lu.solve(&upper[t]).ok_or_else(singular)?);
        }
        reduced.push(lu.solve(&b).ok_or_else(singular)?);
    }

    let mut x = reduced;
    for t in (0..m.saturating_sub(1)).rev() {
        let correction = &coupling[t] * &x[t + 1];
        x[t] -= correction;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::ToyModel;
    use crate::model::residual_report;
    use crate::steady::steady_state;
    use approx::assert_abs_diff_eq;

    fn block(values: &[f64]) -> DMatrix<f64> {
        DMatrix::from_row_slice(2, 2, values)
    }

    #[test]
    fn block_elimination_matches_dense_solve() {
        let lower = vec![
            block(&[0.0, 0.0, 0.0, 0.0]),
            block(&[0.3, 0.1, -0.2, 0.4]),
            block(&[0.5, -0.1, 0.2, 0.1]),
        ];
        let diag = vec![
            block(&[4.0, 1.0, 0.5, 3.0]),
            block(&[5.0, -1.0, 1.0, 4.0]),
            block(&[3.0, 0.2, 0.1, 2.5]),
        ];
        let upper = vec![
            block(&[0.2, 0.0, 0.1, -0.3]),
            block(&[-0.4, 0.2, 0.0, 0.6]),
            block(&[0.0, 0.0, 0.0, 0.0]),
        ];
        let rhs = vec![
            DVector::from_column_slice(&[1.0, 2.0]),
            DVector::from_column_slice(&[-1.0, 0.5]),
            DVector::from_column_slice(&[3.0, -2.0]),
        ];

        let mut dense = DMatrix::zeros(6, 6);
        for t in 0..3 {
            dense.view_mut((2 * t, 2 * t), (2, 2)).copy_from(&diag[t]);
            if t > 0 {
                dense.view_mut((2 * t, 2 * (t - 1)), (2, 2)).copy_from(&lower[t]);
            }
            if t < 2 {
                dense.view_mut((2 * t, 2 * (t + 1)), (2, 2)).copy_from(&upper[t]);
            }
        }
        let stacked = DVector::from_iterator(6, rhs.iter().flat_map(|v| v.iter().copied()));
        let expected = dense.lu().solve(&stacked).unwrap();

        let x = solve_block_tridiagonal(&lower, &diag, &upper, &rhs).unwrap();
        for t in 0..3 {
            for i in 0..2 {
                assert_abs_diff_eq!(x[t][i], expected[2 * t + i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn singular_pivot_reports_block() {
        let zero = block(&[0.0, 0.0, 0.0, 0.0]);
        let diag = vec![block(&[1.0, 0.0, 0.0, 1.0]), block(&[1.0, 1.0, 1.0, 1.0])];
        let rhs = vec![DVector::zeros(2), DVector::zeros(2)];
        let err = solve_block_tridiagonal(
            &[zero.clone(), zero.clone()],
            &diag,
            &[zero.clone(), zero],
            &rhs,
        )
        .unwrap_err();
        assert_eq!(err, SolveError::SingularJacobian { period: Some(1) });
    }

    #[test]
    fn toy_transition_is_pinned_and_solves_every_period() {
        let model = ToyModel { a: 2.0 };
        let config = NewtonConfig::default();
        let before = steady_state(&model, &[4.0, 8.0], &[0.0], &config).unwrap();
        let after = steady_state(&model, &before.values, &[1.0], &config).unwrap();

        let horizon = 60;
        let problem = PerfectForesight::new(
            &model,
            before.values.clone(),
            after.values.clone(),
            permanent_exo_path(&[0.0], &[1.0], horizon),
        )
        .unwrap();
        let sim = problem.solve(&config).unwrap();

        assert_eq!(sim.periods(), horizon + 1);
        assert_eq!(sim.period(0), before.values);
        assert_eq!(sim.period(horizon), after.values);
        assert!(sim.residual < 1e-10);

        for t in 1..horizon {
            let (lag, cur, lead) = (sim.period(t - 1), sim.period(t), sim.period(t + 1));
            let exo = &problem.exo_path()[t];
            let period = Period {
                lag: &lag,
                cur: &cur,
                lead: &lead,
                exo,
            };
            for (name, value) in residual_report(&model, &period) {
                assert!(value.abs() < 1e-9, "{name} residual {value} in period {t}");
            }
        }

        // capital rises monotonically toward the new steady state
        let k = sim.series("k").unwrap();
        assert!(k.windows(2).all(|w| w[1] >= w[0] - 1e-12));
    }

    #[test]
    fn exo_path_must_cover_horizon() {
        let model = ToyModel { a: 2.0 };
        let err = PerfectForesight::new(&model, vec![4.0, 8.0], vec![4.0, 8.0], vec![vec![0.0]])
            .err()
            .unwrap();
        assert!(matches!(err, SolveError::DimensionMismatch { .. }));
    }

    #[test]
    fn permanent_path_switches_in_period_one() {
        let path = permanent_exo_path(&[0.0], &[2.5], 4);
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], vec![0.0]);
        assert!(path[1..].iter().all(|e| e == &vec![2.5]));
    }
}
