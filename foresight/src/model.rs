use nalgebra::DMatrix;

/// Values visible to the equations of one period
///
/// `lag`, `cur` and `lead` are full endogenous vectors for periods t-1, t
/// and t+1; `exo` holds the exogenous values of period t.
#[derive(Debug, Clone, Copy)]
pub struct Period<'a> {
    pub lag: &'a [f64],
    pub cur: &'a [f64],
    pub lead: &'a [f64],
    pub exo: &'a [f64],
}

impl<'a> Period<'a> {
    /// Period where lag, current and lead all equal `x`
    pub fn stationary(x: &'a [f64], exo: &'a [f64]) -> Self {
        Period {
            lag: x,
            cur: x,
            lead: x,
            exo,
        }
    }
}

/// A square system of dynamic equations with one lag and one lead
///
/// Implementors write one residual per equation into `out`; a solution is
/// a set of values for which every residual is zero.
pub trait DynamicModel {
    /// Endogenous variable names, in state-vector order
    fn variable_names(&self) -> &[&'static str];

    /// Exogenous variable names, in exogenous-vector order
    fn exo_names(&self) -> &[&'static str];

    /// Equation names, in residual order
    fn equation_names(&self) -> &[&'static str];

    /// Evaluate all residuals of one period
    fn residuals(&self, period: &Period<'_>, out: &mut [f64]);

    fn n_endo(&self) -> usize {
        self.variable_names().len()
    }

    fn n_exo(&self) -> usize {
        self.exo_names().len()
    }

    /// Position of a variable in the state vector
    fn index_of(&self, name: &str) -> Option<usize> {
        self.variable_names().iter().position(|&v| v == name)
    }
}

/// Residual of every named equation for one period
pub fn residual_report<M: DynamicModel + ?Sized>(
    model: &M,
    period: &Period<'_>,
) -> Vec<(&'static str, f64)> {
    let mut out = vec![0.0; model.n_endo()];
    model.residuals(period, &mut out);
    model
        .equation_names()
        .iter()
        .copied()
        .zip(out)
        .collect()
}

/// Jacobian blocks of one period with respect to (lag, current, lead)
pub(crate) struct Blocks {
    pub lag: DMatrix<f64>,
    pub cur: DMatrix<f64>,
    pub lead: DMatrix<f64>,
}

/// Central finite-difference Jacobian of one period's residuals
///
/// Each variable is perturbed by `step * max(1, |x|)`.
pub(crate) fn period_jacobian<M: DynamicModel + ?Sized>(
    model: &M,
    period: &Period<'_>,
    step: f64,
) -> Blocks {
    let n = model.n_endo();
    let mut lag = period.lag.to_vec();
    let mut cur = period.cur.to_vec();
    let mut lead = period.lead.to_vec();
    let mut plus = vec![0.0; n];
    let mut minus = vec![0.0; n];

    let mut blocks = Blocks {
        lag: DMatrix::zeros(n, n),
        cur: DMatrix::zeros(n, n),
        lead: DMatrix::zeros(n, n),
    };

    for slot in 0..3 {
        for j in 0..n {
            let x = match slot {
                0 => lag[j],
                1 => cur[j],
                _ => lead[j],
            };
            let h = step * x.abs().max(1.0);

            set_slot(&mut lag, &mut cur, &mut lead, slot, j, x + h);
            model.residuals(
                &Period {
                    lag: &lag,
                    cur: &cur,
                    lead: &lead,
                    exo: period.exo,
                },
                &mut plus,
            );
            set_slot(&mut lag, &mut cur, &mut lead, slot, j, x - h);
            model.residuals(
                &Period {
                    lag: &lag,
                    cur: &cur,
                    lead: &lead,
                    exo: period.exo,
                },
                &mut minus,
            );
            set_slot(&mut lag, &mut cur, &mut lead, slot, j, x);

            let target = match slot {
                0 => &mut blocks.lag,
                1 => &mut blocks.cur,
                _ => &mut blocks.lead,
            };
            for i in 0..n {
                target[(i, j)] = (plus[i] - minus[i]) / (2.0 * h);
            }
        }
    }

    blocks
}

fn set_slot(lag: &mut [f64], cur: &mut [f64], lead: &mut [f64], slot: usize, j: usize, v: f64) {
    match slot {
        0 => lag[j] = v,
        1 => cur[j] = v,
        _ => lead[j] = v,
    }
}
