use foresight::{DynamicModel, Period};

use crate::params::{Financing, ModelParams};
use crate::{Var, N_VARS, VARIABLE_NAMES};

/// Position of the purchases shift in the exogenous vector
pub const E_GB: usize = 0;

/// Equation labels, in residual order
pub const EQUATION_NAMES: [&str; N_VARS] = [
    "marginal utility of consumption",
    "marginal utility of leisure",
    "production function",
    "marginal product of capital",
    "marginal product of labour",
    "capital accumulation",
    "time endowment",
    "resource constraint (Walras check)",
    "household budget constraint",
    "government budget constraint",
    "consumption Euler equation",
    "after-tax rental rate",
    "government purchases rule",
    "tax rule",
    "real interest rate",
    "wage",
    "labour supply",
];

/// The Baxter-King economy as a residual system
///
/// Households have log utility over consumption and leisure, firms rent
/// capital and labour under Cobb-Douglas technology with trend growth
/// `gammax`, and the government buys goods financed by an income tax and
/// lump-sum transfers. All quantities are detrended by the technology trend.
#[derive(Debug, Clone)]
pub struct BaxterKing {
    pub params: ModelParams,
    pub financing: Financing,
}

impl BaxterKing {
    pub fn new(params: ModelParams, financing: Financing) -> Self {
        BaxterKing { params, financing }
    }
}

impl DynamicModel for BaxterKing {
    fn variable_names(&self) -> &[&'static str] {
        &VARIABLE_NAMES
    }

    fn exo_names(&self) -> &[&'static str] {
        &["e_gb"]
    }

    fn equation_names(&self) -> &[&'static str] {
        &EQUATION_NAMES
    }

    fn residuals(&self, period: &Period<'_>, out: &mut [f64]) {
        let lag = |v: Var| period.lag[v.index()];
        let cur = |v: Var| period.cur[v.index()];
        let lead = |v: Var| period.lead[v.index()];
        let e_gb = period.exo[E_GB];

        let ModelParams {
            beta,
            theta_l,
            theta_k,
            delta_k,
            gammax,
            a,
            gb_bar,
            tau_bar,
            tr_bar,
        } = self.params;

        let k_lag = lag(Var::K);

        out[0] = cur(Var::Lambda) - 1.0 / cur(Var::C);
        out[1] = cur(Var::D2u) - theta_l / cur(Var::L);
        out[2] = cur(Var::Y) - a * k_lag.powf(theta_k) * cur(Var::N).powf(1.0 - theta_k);
        out[3] = cur(Var::Rk) - theta_k * cur(Var::Y) / k_lag;
        out[4] = cur(Var::Mpl) - (1.0 - theta_k) * cur(Var::Y) / cur(Var::N);
        out[5] = gammax * cur(Var::K) - (1.0 - delta_k) * k_lag - cur(Var::I);
        out[6] = cur(Var::L) + cur(Var::N) - 1.0;
        out[7] = cur(Var::CheckWalras)
            - (cur(Var::Y) - cur(Var::C) - cur(Var::I) - cur(Var::Gb));
        out[8] = cur(Var::C) + cur(Var::I)
            - (1.0 - cur(Var::Tau)) * (cur(Var::W) * cur(Var::N) + cur(Var::Rk) * k_lag)
            - cur(Var::Tr);
        out[9] = cur(Var::Tau) * cur(Var::Y) - cur(Var::Gb) - cur(Var::Tr);
        out[10] = cur(Var::Lambda) - beta / gammax * lead(Var::Lambda) * (1.0 + lead(Var::R));
        out[11] = cur(Var::RkAt) - (1.0 - cur(Var::Tau)) * cur(Var::Rk);
        out[12] = cur(Var::Gb) - gb_bar - e_gb;
        out[13] = match self.financing {
            Financing::LumpSum => cur(Var::Tau) - tau_bar,
            Financing::IncomeTax => cur(Var::Tr) - tr_bar,
        };
        out[14] = cur(Var::R) - (cur(Var::RkAt) - delta_k);
        out[15] = cur(Var::W) - cur(Var::Mpl);
        out[16] = cur(Var::D2u) - cur(Var::Lambda) * (1.0 - cur(Var::Tau)) * cur(Var::W);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::calibrate;
    use crate::params::CalibrationTargets;
    use foresight::residual_report;

    fn model(financing: Financing) -> (BaxterKing, Vec<f64>) {
        let cal = calibrate(&CalibrationTargets::baxter_king()).unwrap();
        (BaxterKing::new(cal.params, financing), cal.steady_state.to_vec())
    }

    #[test]
    fn names_line_up_with_state_vector() {
        let (m, _) = model(Financing::LumpSum);
        assert_eq!(m.n_endo(), N_VARS);
        assert_eq!(m.equation_names().len(), N_VARS);
        assert_eq!(m.n_exo(), 1);
        assert_eq!(m.index_of("check_walras"), Some(Var::CheckWalras.index()));
    }

    #[test]
    fn calibrated_state_zeroes_every_equation() {
        for financing in [Financing::LumpSum, Financing::IncomeTax] {
            let (m, ss) = model(financing);
            let report = residual_report(&m, &Period::stationary(&ss, &[0.0]));
            for (name, value) in report {
                assert!(value.abs() < 1e-12, "{name}: {value}");
            }
        }
    }

    #[test]
    fn purchases_shift_only_moves_purchases_rule() {
        let (m, ss) = model(Financing::LumpSum);
        let report = residual_report(&m, &Period::stationary(&ss, &[0.5]));
        for (name, value) in report {
            if name == "government purchases rule" {
                assert!((value + 0.5).abs() < 1e-12);
            } else {
                assert!(value.abs() < 1e-12, "{name}: {value}");
            }
        }
    }

    #[test]
    fn walras_variable_does_not_feed_back() {
        // perturbing check_walras only moves its own defining equation
        let (m, ss) = model(Financing::LumpSum);
        let mut bumped = ss.clone();
        bumped[Var::CheckWalras.index()] += 1.0;
        let report = residual_report(
            &m,
            &Period {
                lag: &bumped,
                cur: &bumped,
                lead: &bumped,
                exo: &[0.0],
            },
        );
        for (i, (_, value)) in report.iter().enumerate() {
            if i == 7 {
                assert!((value - 1.0).abs() < 1e-12);
            } else {
                assert!(value.abs() < 1e-12);
            }
        }
    }
}
