//! Fiscal policy in a neoclassical growth model
//!
//! This crate reproduces the government-purchases experiment of Baxter & King
//! (1993), "Fiscal Policy in General Equilibrium": a permanent rise in
//! government purchases equal to 1% of initial output, announced and
//! implemented in period 1, with perfect foresight thereafter.
//!
//! Pipeline:
//! - calibrate the model to annual targets in closed form
//! - solve the initial steady state and the post-shock terminal steady state
//! - solve the 200-period nonlinear transition between them
//! - report commodity, labour and financial market responses
//!
//! Expected outcomes:
//! - long-run output multiplier a little above 1, with hours up and
//!   consumption down
//! - the real wage and real interest rate return to their initial values

use std::fmt;
use std::ops::{Index, IndexMut};

use foresight::SolveError;
use thiserror::Error;

pub mod analysis;
pub mod calibration;
pub mod config;
pub mod model;
pub mod output;
pub mod params;
pub mod scenarios;

pub use calibration::{calibrate, Calibration};
pub use model::BaxterKing;
pub use params::{CalibrationTargets, Financing, ModelParams};
pub use scenarios::{run_scenario, ScenarioConfig, ScenarioResult, ShockProfile};

/// Number of endogenous variables
pub const N_VARS: usize = 17;

/// Endogenous variables, in state-vector order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Var {
    Y,
    C,
    I,
    K,
    N,
    L,
    W,
    Mpl,
    Rk,
    RkAt,
    R,
    Lambda,
    D2u,
    Gb,
    Tau,
    Tr,
    CheckWalras,
}

/// Economic role of a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Flow,
    Stock,
    Price,
    Policy,
    Diagnostic,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Flow => write!(f, "flow"),
            Role::Stock => write!(f, "stock"),
            Role::Price => write!(f, "price"),
            Role::Policy => write!(f, "policy instrument"),
            Role::Diagnostic => write!(f, "diagnostic"),
        }
    }
}

/// Short names, in state-vector order
pub const VARIABLE_NAMES: [&str; N_VARS] = [
    "y",
    "c",
    "i",
    "k",
    "n",
    "l",
    "w",
    "mpl",
    "rk",
    "rk_at",
    "r",
    "lambda",
    "d2u",
    "gb",
    "tau",
    "tr",
    "check_walras",
];

impl Var {
    pub const ALL: [Var; N_VARS] = [
        Var::Y,
        Var::C,
        Var::I,
        Var::K,
        Var::N,
        Var::L,
        Var::W,
        Var::Mpl,
        Var::Rk,
        Var::RkAt,
        Var::R,
        Var::Lambda,
        Var::D2u,
        Var::Gb,
        Var::Tau,
        Var::Tr,
        Var::CheckWalras,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        VARIABLE_NAMES[self.index()]
    }

    pub fn long_name(self) -> &'static str {
        match self {
            Var::Y => "output",
            Var::C => "consumption",
            Var::I => "investment",
            Var::K => "capital",
            Var::N => "hours worked",
            Var::L => "leisure",
            Var::W => "real wage",
            Var::Mpl => "marginal product of labour",
            Var::Rk => "rental rate of capital",
            Var::RkAt => "after-tax rental rate",
            Var::R => "real interest rate",
            Var::Lambda => "marginal utility of consumption",
            Var::D2u => "marginal utility of leisure",
            Var::Gb => "government purchases",
            Var::Tau => "income tax rate",
            Var::Tr => "lump-sum transfers",
            Var::CheckWalras => "resource constraint check",
        }
    }

    pub fn role(self) -> Role {
        match self {
            Var::Y | Var::C | Var::I | Var::N | Var::L => Role::Flow,
            Var::K => Role::Stock,
            Var::W | Var::Mpl | Var::Rk | Var::RkAt | Var::R | Var::Lambda | Var::D2u => {
                Role::Price
            }
            Var::Gb | Var::Tau | Var::Tr => Role::Policy,
            Var::CheckWalras => Role::Diagnostic,
        }
    }

    pub fn from_name(name: &str) -> Option<Var> {
        Var::ALL.iter().copied().find(|v| v.name() == name)
    }
}

/// One value per endogenous variable
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector([f64; N_VARS]);

impl StateVector {
    pub fn zeros() -> Self {
        StateVector([0.0; N_VARS])
    }

    pub fn from_slice(values: &[f64]) -> Option<Self> {
        values.try_into().ok().map(StateVector)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.0.to_vec()
    }
}

impl Index<Var> for StateVector {
    type Output = f64;

    fn index(&self, var: Var) -> &f64 {
        &self.0[var.index()]
    }
}

impl IndexMut<Var> for StateVector {
    fn index_mut(&mut self, var: Var) -> &mut f64 {
        &mut self.0[var.index()]
    }
}

/// Errors surfaced by calibration, scenarios and experiment configs
#[derive(Error, Debug)]
pub enum ModelError {
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("infeasible calibration: {0}")]
    InfeasibleCalibration(String),
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
