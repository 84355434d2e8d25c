use thiserror::Error;

/// Failures reported by the steady-state and perfect-foresight solvers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Newton iteration did not converge after {iterations} iterations (max residual {residual:e})")]
    NotConverged { iterations: usize, residual: f64 },
    #[error("line search stalled at iteration {iteration} (max residual {residual:e})")]
    LineSearchFailed { iteration: usize, residual: f64 },
    #[error("singular Jacobian{}", in_period(.period))]
    SingularJacobian { period: Option<usize> },
    #[error("non-finite residual in equation '{equation}'")]
    NonFiniteResidual { equation: String },
    #[error("wrong length for {what}: expected {expected}, got {found}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
}

/// Convenience type for `Result<T, SolveError>`.
pub type SolveResult<T> = Result<T, SolveError>;

fn in_period(period: &Option<usize>) -> String {
    match period {
        Some(t) => format!(" in period {t}"),
        None => String::new(),
    }
}
