use nalgebra::DMatrix;

/// Solved transition path
///
/// Rows are endogenous variables, columns are periods `0..=horizon`.
#[derive(Debug, Clone)]
pub struct Simulation {
    names: Vec<String>,
    data: DMatrix<f64>,
    /// Newton steps used by the path solve
    pub iterations: usize,
    /// Max-norm of the stacked residual at the solution
    pub residual: f64,
}

impl Simulation {
    pub(crate) fn new(names: Vec<String>, data: DMatrix<f64>, iterations: usize, residual: f64) -> Self {
        debug_assert_eq!(names.len(), data.nrows());
        Simulation {
            names,
            data,
            iterations,
            residual,
        }
    }

    /// Number of periods stored, including both pinned end points
    pub fn periods(&self) -> usize {
        self.data.ncols()
    }

    /// Last period index
    pub fn horizon(&self) -> usize {
        self.periods() - 1
    }

    pub fn variable_names(&self) -> &[String] {
        &self.names
    }

    /// Row of a named variable
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Full time series of a named variable
    pub fn series(&self, name: &str) -> Option<Vec<f64>> {
        self.index_of(name).map(|row| self.row(row))
    }

    /// Full time series of the variable in `row`
    pub fn row(&self, row: usize) -> Vec<f64> {
        self.data.row(row).iter().copied().collect()
    }

    /// All variables in period `t`
    pub fn period(&self, t: usize) -> Vec<f64> {
        self.data.column(t).iter().copied().collect()
    }

    /// Value of a named variable in period `t`
    pub fn value(&self, name: &str, t: usize) -> Option<f64> {
        let row = self.index_of(name)?;
        (t < self.periods()).then(|| self.data[(row, t)])
    }

    /// Raw variables-by-periods matrix
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Simulation {
        // two variables over three periods
        let data = DMatrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 10.0, 20.0, 30.0]);
        Simulation::new(vec!["a".to_string(), "b".to_string()], data, 2, 1e-12)
    }

    #[test]
    fn series_by_name() {
        let sim = sample();
        assert_eq!(sim.series("b"), Some(vec![10.0, 20.0, 30.0]));
        assert_eq!(sim.series("c"), None);
    }

    #[test]
    fn period_columns_and_values() {
        let sim = sample();
        assert_eq!(sim.periods(), 3);
        assert_eq!(sim.horizon(), 2);
        assert_eq!(sim.period(1), vec![2.0, 20.0]);
        assert_eq!(sim.value("a", 2), Some(3.0));
        assert_eq!(sim.value("a", 3), None);
    }
}
