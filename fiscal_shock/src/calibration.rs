use crate::params::{CalibrationTargets, ModelParams};
use crate::{ModelError, StateVector, Var};

/// Structural parameters together with the steady state they imply
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub targets: CalibrationTargets,
    pub params: ModelParams,
    /// Closed-form initial steady state, used as the solver's starting guess
    pub steady_state: StateVector,
}

impl Calibration {
    /// One commodity unit: 1% of initial steady-state output
    pub fn commodity_unit(&self) -> f64 {
        0.01 * self.steady_state[Var::Y]
    }
}

/// Map calibration targets to parameters and a steady state in closed form
///
/// The real-rate target pins the discount factor through the Euler
/// equation, the after-tax rental rate pins the capital-labour ratio, and
/// the hours target pins the leisure weight through the labour-supply
/// condition.
pub fn calibrate(targets: &CalibrationTargets) -> Result<Calibration, ModelError> {
    check_targets(targets)?;

    let CalibrationTargets {
        theta_k,
        delta_k,
        gammax,
        r,
        n,
        s_g,
        tau_bar,
        a,
    } = *targets;

    let beta = gammax / (1.0 + r);

    let rk_at = r + delta_k;
    let rk = rk_at / (1.0 - tau_bar);
    let k_over_n = (a * theta_k / rk).powf(1.0 / (1.0 - theta_k));
    let k = k_over_n * n;
    let y = a * k.powf(theta_k) * n.powf(1.0 - theta_k);
    let i = (gammax - 1.0 + delta_k) * k;
    let gb = s_g * y;
    let c = y - i - gb;
    if c <= 0.0 {
        return Err(ModelError::InfeasibleCalibration(format!(
            "consumption would be {c:.4} (investment {i:.4} plus purchases {gb:.4} exceed output {y:.4})"
        )));
    }
    let tr = tau_bar * y - gb;
    let w = (1.0 - theta_k) * y / n;
    let l = 1.0 - n;
    let lambda = 1.0 / c;
    let d2u = lambda * (1.0 - tau_bar) * w;
    let theta_l = d2u * l;

    let mut ss = StateVector::zeros();
    ss[Var::Y] = y;
    ss[Var::C] = c;
    ss[Var::I] = i;
    ss[Var::K] = k;
    ss[Var::N] = n;
    ss[Var::L] = l;
    ss[Var::W] = w;
    ss[Var::Mpl] = w;
    ss[Var::Rk] = rk;
    ss[Var::RkAt] = rk_at;
    ss[Var::R] = r;
    ss[Var::Lambda] = lambda;
    ss[Var::D2u] = d2u;
    ss[Var::Gb] = gb;
    ss[Var::Tau] = tau_bar;
    ss[Var::Tr] = tr;
    ss[Var::CheckWalras] = 0.0;

    Ok(Calibration {
        targets: targets.clone(),
        params: ModelParams {
            beta,
            theta_l,
            theta_k,
            delta_k,
            gammax,
            a,
            gb_bar: gb,
            tau_bar,
            tr_bar: tr,
        },
        steady_state: ss,
    })
}

fn check_targets(t: &CalibrationTargets) -> Result<(), ModelError> {
    let fail = |msg: String| Err(ModelError::InfeasibleCalibration(msg));
    if !(t.theta_k > 0.0 && t.theta_k < 1.0) {
        return fail(format!("capital share {} outside (0, 1)", t.theta_k));
    }
    if !(t.n > 0.0 && t.n < 1.0) {
        return fail(format!("hours target {} outside (0, 1)", t.n));
    }
    if !(0.0..1.0).contains(&t.tau_bar) {
        return fail(format!("tax rate {} outside [0, 1)", t.tau_bar));
    }
    if !(0.0..=1.0).contains(&t.delta_k) {
        return fail(format!("depreciation {} outside [0, 1]", t.delta_k));
    }
    if t.gammax <= 0.0 || t.a <= 0.0 {
        return fail("growth factor and technology level must be positive".to_string());
    }
    if t.r + t.delta_k <= 0.0 {
        return fail(format!(
            "rental rate r + delta = {} must be positive",
            t.r + t.delta_k
        ));
    }
    Ok(())
}
