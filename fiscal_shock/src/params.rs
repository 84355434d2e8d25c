use serde::{Deserialize, Serialize};

/// How the government balances its budget after purchases change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Financing {
    /// Tax rate held at `tau_bar`, lump-sum transfers absorb the budget
    LumpSum,
    /// Transfers held at `tr_bar`, the income tax rate absorbs the budget
    IncomeTax,
}

impl std::fmt::Display for Financing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Financing::LumpSum => write!(f, "lump-sum taxes"),
            Financing::IncomeTax => write!(f, "income taxes"),
        }
    }
}

/// Annual calibration targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationTargets {
    /// Capital share of income
    pub theta_k: f64,
    /// Annual depreciation rate
    pub delta_k: f64,
    /// Gross growth rate of labour-augmenting technology
    pub gammax: f64,
    /// Steady-state real interest rate
    pub r: f64,
    /// Steady-state hours (share of the time endowment)
    pub n: f64,
    /// Government purchases as a share of output
    pub s_g: f64,
    /// Income tax rate
    pub tau_bar: f64,
    /// Technology level
    pub a: f64,
}

impl CalibrationTargets {
    /// Annual US targets used by Baxter & King
    pub fn baxter_king() -> Self {
        CalibrationTargets {
            theta_k: 0.42,
            delta_k: 0.10,
            gammax: 1.016,
            r: 0.065,
            n: 0.2,
            s_g: 0.20,
            tau_bar: 0.20,
            a: 1.0,
        }
    }

    /// Labour share of income
    pub fn labor_share(&self) -> f64 {
        1.0 - self.theta_k
    }
}

impl Default for CalibrationTargets {
    fn default() -> Self {
        CalibrationTargets::baxter_king()
    }
}

/// Structural parameters, fixed for a whole run once calibrated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Discount factor
    pub beta: f64,
    /// Weight on leisure in utility
    pub theta_l: f64,
    /// Capital exponent in production
    pub theta_k: f64,
    /// Depreciation rate
    pub delta_k: f64,
    /// Gross trend growth rate
    pub gammax: f64,
    /// Technology level
    pub a: f64,
    /// Baseline government purchases
    pub gb_bar: f64,
    /// Baseline income tax rate
    pub tau_bar: f64,
    /// Baseline lump-sum transfers
    pub tr_bar: f64,
}

impl ModelParams {
    /// Growth-adjusted discount factor entering the Euler equation
    pub fn effective_discount(&self) -> f64 {
        self.beta / self.gammax
    }
}
