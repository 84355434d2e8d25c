//! Deterministic solution engine for dynamic equilibrium models
//!
//! A model is a square system of residual equations over current, lagged
//! and led values of its endogenous variables ([`DynamicModel`]). The engine
//! provides:
//! - [`steady_state`]: stationary solutions for fixed exogenous values
//! - [`PerfectForesight`]: the path between two pinned end points when the
//!   whole exogenous path is known in advance
//! - [`Simulation`]: the solved variables-by-periods matrix with name lookup
//! - [`parallel`]: running independent solves concurrently
//!
//! All nonlinear solves use a damped Newton iteration with finite-difference
//! Jacobians ([`newton`]).

pub mod error;
pub mod model;
pub mod newton;
pub mod parallel;
pub mod path;
pub mod simulation;
pub mod steady;

pub use error::{SolveError, SolveResult};
pub use model::{residual_report, DynamicModel, Period};
pub use newton::{NewtonConfig, NewtonReport};
pub use path::{permanent_exo_path, PerfectForesight};
pub use simulation::Simulation;
pub use steady::{steady_state, SteadyState};
