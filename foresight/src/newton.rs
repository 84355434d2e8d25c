//! Damped Newton iteration shared by the steady-state and path solvers
//!
//! The linear algebra is left to the caller through [`NewtonSystem::direction`]:
//! a dense LU for a single steady state, a block-tridiagonal elimination for
//! a stacked transition path. The iteration itself only sees flat vectors.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::error::{SolveError, SolveResult};

/// Armijo constant for the sufficient-decrease test
const ARMIJO: f64 = 1e-4;

/// Solver settings
#[derive(Debug, Clone, PartialEq)]
pub struct NewtonConfig {
    /// Convergence threshold on the max-norm of the residual vector
    pub tolerance: f64,
    /// Maximum number of Newton steps
    pub max_iterations: usize,
    /// Smallest step fraction the line search may try before giving up
    pub min_step: f64,
    /// Relative perturbation for finite-difference Jacobians
    pub fd_step: f64,
}

impl Default for NewtonConfig {
    fn default() -> Self {
        NewtonConfig {
            tolerance: 1e-10,
            max_iterations: 50,
            min_step: 1.0 / 1024.0,
            fd_step: 1e-6,
        }
    }
}

/// Summary of a converged solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewtonReport {
    /// Newton steps taken
    pub iterations: usize,
    /// Max-norm of the final residual vector
    pub residual: f64,
}

/// A square nonlinear system F(x) = 0
pub trait NewtonSystem {
    /// Number of unknowns (and equations)
    fn len(&self) -> usize;

    /// Evaluate F(x) into `out`
    fn residual(&self, x: &[f64], out: &mut [f64]);

    /// Solve J(x) dx = -f for the Newton direction
    fn direction(&self, x: &[f64], f: &[f64]) -> SolveResult<Vec<f64>>;

    /// Name of the equation behind flat residual index `i`, for diagnostics
    fn describe(&self, i: usize) -> String {
        format!("#{i}")
    }
}

pub(crate) fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0_f64, |m, x| m.max(x.abs()))
}

fn merit(v: &[f64]) -> f64 {
    0.5 * v.iter().map(|x| x * x).sum::<f64>()
}

/// Run damped Newton from `x`, overwriting it with the solution
///
/// Each full step is halved until the sum of squared residuals shows
/// sufficient decrease; non-finite trial residuals count as a failed trial.
pub fn solve<S: NewtonSystem + ?Sized>(
    system: &S,
    x: &mut [f64],
    config: &NewtonConfig,
) -> SolveResult<NewtonReport> {
    let n = system.len();
    if x.len() != n {
        return Err(SolveError::DimensionMismatch {
            what: "initial guess",
            expected: n,
            found: x.len(),
        });
    }

    let mut f = vec![0.0; n];
    system.residual(x, &mut f);
    if let Some(i) = f.iter().position(|v| !v.is_finite()) {
        return Err(SolveError::NonFiniteResidual {
            equation: system.describe(i),
        });
    }

    let mut norm = max_abs(&f);
    let mut trial = vec![0.0; n];
    let mut f_trial = vec![0.0; n];

    for iteration in 0..=config.max_iterations {
        if norm < config.tolerance {
            debug!(iteration, residual = norm, "newton converged");
            return Ok(NewtonReport {
                iterations: iteration,
                residual: norm,
            });
        }
        if iteration == config.max_iterations {
            break;
        }

        let dx = system.direction(x, &f)?;
        let current = merit(&f);
        let mut step = 1.0;

        loop {
            for ((t, xi), di) in trial.iter_mut().zip(x.iter()).zip(&dx) {
                *t = xi + step * di;
            }
            system.residual(&trial, &mut f_trial);
            let candidate = merit(&f_trial);
            if candidate.is_finite() && candidate <= (1.0 - 2.0 * ARMIJO * step) * current {
                break;
            }
            step *= 0.5;
            if step < config.min_step {
                return Err(SolveError::LineSearchFailed {
                    iteration,
                    residual: norm,
                });
            }
        }

        if step < 1.0 {
            warn!(iteration, step, "newton step damped");
        }

        x.copy_from_slice(&trial);
        std::mem::swap(&mut f, &mut f_trial);
        norm = max_abs(&f);
        debug!(iteration, residual = norm, step, "newton step");
    }

    Err(SolveError::NotConverged {
        iterations: config.max_iterations,
        residual: norm,
    })
}

/// Central finite-difference Jacobian of a flat residual function
pub fn dense_jacobian<F>(residual: F, x: &[f64], step: f64) -> DMatrix<f64>
where
    F: Fn(&[f64], &mut [f64]),
{
    let n = x.len();
    let mut probe = x.to_vec();
    let mut plus = vec![0.0; n];
    let mut minus = vec![0.0; n];
    let mut jac = DMatrix::zeros(n, n);

    for j in 0..n {
        let h = step * x[j].abs().max(1.0);
        probe[j] = x[j] + h;
        residual(&probe, &mut plus);
        probe[j] = x[j] - h;
        residual(&probe, &mut minus);
        probe[j] = x[j];
        for i in 0..n {
            jac[(i, j)] = (plus[i] - minus[i]) / (2.0 * h);
        }
    }

    jac
}

/// Solve `jac * dx = -f` with partial-pivoting LU
pub fn dense_direction(jac: DMatrix<f64>, f: &[f64]) -> SolveResult<Vec<f64>> {
    let rhs = -DVector::from_column_slice(f);
    let lu = jac.lu();
    if !lu.is_invertible() {
        return Err(SolveError::SingularJacobian { period: None });
    }
    lu.solve(&rhs)
        .map(|dx| dx.as_slice().to_vec())
        .ok_or(SolveError::SingularJacobian { period: None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// x^2 + y^2 = 4, x = y
    struct Circle;

    impl NewtonSystem for Circle {
        fn len(&self) -> usize {
            2
        }

        fn residual(&self, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] * x[0] + x[1] * x[1] - 4.0;
            out[1] = x[0] - x[1];
        }

        fn direction(&self, x: &[f64], f: &[f64]) -> SolveResult<Vec<f64>> {
            let jac = dense_jacobian(|v, out| self.residual(v, out), x, 1e-6);
            dense_direction(jac, f)
        }
    }

    /// exp(x) = 0 has no root
    struct NoRoot;

    impl NewtonSystem for NoRoot {
        fn len(&self) -> usize {
            1
        }

        fn residual(&self, x: &[f64], out: &mut [f64]) {
            out[0] = x[0].exp();
        }

        fn direction(&self, x: &[f64], f: &[f64]) -> SolveResult<Vec<f64>> {
            let jac = dense_jacobian(|v, out| self.residual(v, out), x, 1e-6);
            dense_direction(jac, f)
        }
    }

    #[test]
    fn converges_on_circle_intersection() {
        let mut x = vec![1.0, 2.0];
        let report = solve(&Circle, &mut x, &NewtonConfig::default()).unwrap();

        let root = 2.0_f64.sqrt();
        assert_abs_diff_eq!(x[0], root, epsilon = 1e-9);
        assert_abs_diff_eq!(x[1], root, epsilon = 1e-9);
        assert!(report.residual < 1e-10);
        assert!(report.iterations > 0);
    }

    #[test]
    fn exact_guess_takes_no_steps() {
        let root = 2.0_f64.sqrt();
        let mut x = vec![root, root];
        let report = solve(&Circle, &mut x, &NewtonConfig::default()).unwrap();
        assert_eq!(report.iterations, 0);
        assert_eq!(x, vec![root, root]);
    }

    #[test]
    fn reports_non_convergence() {
        let mut x = vec![0.0];
        let config = NewtonConfig {
            max_iterations: 5,
            ..Default::default()
        };
        let err = solve(&NoRoot, &mut x, &config).unwrap_err();
        assert!(matches!(
            err,
            SolveError::NotConverged { iterations: 5, .. }
        ));
    }

    #[test]
    fn rejects_wrong_guess_length() {
        let mut x = vec![1.0];
        let err = solve(&Circle, &mut x, &NewtonConfig::default()).unwrap_err();
        assert_eq!(
            err,
            SolveError::DimensionMismatch {
                what: "initial guess",
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn singular_jacobian_is_an_error() {
        let jac = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        let err = dense_direction(jac, &[1.0, 1.0]).unwrap_err();
        assert_eq!(err, SolveError::SingularJacobian { period: None });
    }
}
