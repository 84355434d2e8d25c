//! Data output and serialization for the fiscal experiments
//!
//! Results are exported as CSV time series and a JSON summary with chart
//! specifications, for plotting in an external tool (pandas, matplotlib,
//! Vega-Lite). Nothing is rendered here.

use crate::analysis::{ImpulseResponses, Multipliers, CHART_PERIODS};
use crate::params::{Financing, ModelParams};
use crate::scenarios::{ScenarioResult, ShockProfile, SweepPoint};
use crate::{ModelError, Var, VARIABLE_NAMES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::process::Command;

/// Top-level container for a scenario's output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOutput {
    pub metadata: SimulationMetadata,
    pub params: ModelParams,
    pub steady_states: Vec<SteadyStateRow>,
    pub multipliers: Multipliers,
    pub responses: ImpulseResponses,
    pub charts: Vec<Chart>,
    /// Full path in levels, one row per period; written to CSV only
    #[serde(skip)]
    pub path: Vec<Vec<f64>>,
}

/// Metadata for reproducibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationMetadata {
    pub scenario: String,
    pub financing: Financing,
    pub shock: ShockProfile,
    pub shock_units: f64,
    pub shock_size: f64,
    pub horizon: usize,
    pub path_iterations: usize,
    pub path_residual: f64,
    pub timestamp: String,
    pub git_commit: Option<String>,
}

/// Initial and terminal level of one variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteadyStateRow {
    pub variable: String,
    pub initial: f64,
    pub terminal: f64,
}

/// Axis of a chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub label: String,
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<f64>,
}

impl Axis {
    /// Axis from `min` to `max` with a tick every `step`
    pub fn new(label: &str, min: f64, max: f64, step: f64) -> Self {
        let count = ((max - min) / step).round() as usize;
        Axis {
            label: label.to_string(),
            min,
            max,
            ticks: (0..=count).map(|i| min + i as f64 * step).collect(),
        }
    }
}

/// One line of a chart
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub variable: String,
    pub values: Vec<f64>,
}

/// Specification of a line chart over the response horizon
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chart {
    pub title: String,
    pub x_axis: Axis,
    pub y_axis: Axis,
    pub periods: Vec<usize>,
    pub series: Vec<ChartSeries>,
}

impl Chart {
    /// Print the chart's series as columns
    pub fn print_table(&self) {
        println!("\n{} ({})", self.title, self.y_axis.label);
        print!("{:>4}", "t");
        for s in &self.series {
            print!(" {:>14}", s.label);
        }
        println!();
        for (row, t) in self.periods.iter().enumerate() {
            print!("{t:>4}");
            for s in &self.series {
                print!(" {:>14.4}", s.values[row]);
            }
            println!();
        }
    }
}

fn series(label: &str, var: Var, values: &[f64]) -> ChartSeries {
    ChartSeries {
        label: label.to_string(),
        variable: var.name().to_string(),
        values: values.to_vec(),
    }
}

/// The three panels of the Baxter-King figure
pub fn figures(irf: &ImpulseResponses) -> Vec<Chart> {
    let x_axis = Axis::new("Years", 0.0, (CHART_PERIODS - 1) as f64, 5.0);

    vec![
        Chart {
            title: "Commodity Market".to_string(),
            x_axis: x_axis.clone(),
            y_axis: Axis::new("Commodity units", -0.6, 1.4, 0.2),
            periods: irf.periods.clone(),
            series: vec![
                series("Output", Var::Y, &irf.output),
                series("Consumption", Var::C, &irf.consumption),
                series("Investment", Var::I, &irf.investment),
                series("Government", Var::Gb, &irf.government),
            ],
        },
        Chart {
            title: "Labor Market".to_string(),
            x_axis: x_axis.clone(),
            y_axis: Axis::new("Percent", -1.0, 1.5, 0.5),
            periods: irf.periods.clone(),
            series: vec![
                series("Hours", Var::N, &irf.hours),
                series("Wage", Var::W, &irf.wage),
            ],
        },
        Chart {
            title: "Financial Market".to_string(),
            x_axis,
            y_axis: Axis::new("Basis points", -5.0, 15.0, 5.0),
            periods: irf.periods.clone(),
            series: vec![series("Real interest rate", Var::R, &irf.interest_rate)],
        },
    ]
}

impl SimulationOutput {
    /// Collect everything worth saving from a solved scenario
    pub fn from_result(result: &ScenarioResult) -> Result<Self, ModelError> {
        let responses = result.responses(CHART_PERIODS)?;
        let multipliers = result.multipliers(CHART_PERIODS)?;
        let charts = figures(&responses);

        let steady_states = Var::ALL
            .iter()
            .map(|&var| SteadyStateRow {
                variable: var.name().to_string(),
                initial: result.initial_level(var),
                terminal: result.terminal_level(var),
            })
            .collect();

        let path = (0..result.simulation.periods())
            .map(|t| result.simulation.period(t))
            .collect();

        Ok(SimulationOutput {
            metadata: SimulationMetadata {
                scenario: result.config.name.clone(),
                financing: result.config.financing,
                shock: result.config.shock,
                shock_units: result.config.shock_units,
                shock_size: result.shock_size,
                horizon: result.config.horizon,
                path_iterations: result.simulation.iterations,
                path_residual: result.simulation.residual,
                timestamp: chrono::Utc::now().to_rfc3339(),
                git_commit: git_commit(),
            },
            params: result.calibration.params.clone(),
            steady_states,
            multipliers,
            responses,
            charts,
            path,
        })
    }

    /// Write the full path in levels to CSV
    pub fn write_path_csv<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;

        let mut header = vec!["period"];
        header.extend(VARIABLE_NAMES);
        wtr.write_record(&header)?;

        for (t, values) in self.path.iter().enumerate() {
            let mut record = vec![t.to_string()];
            record.extend(values.iter().map(|v| v.to_string()));
            wtr.write_record(&record)?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write the normalised responses to CSV
    pub fn write_responses_csv<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut wtr = csv::Writer::from_path(path)?;
        let irf = &self.responses;

        wtr.write_record([
            "period",
            "output",
            "consumption",
            "investment",
            "government",
            "hours_pct",
            "wage_pct",
            "interest_rate_bp",
        ])?;

        for t in 0..irf.len() {
            wtr.write_record(&[
                irf.periods[t].to_string(),
                irf.output[t].to_string(),
                irf.consumption[t].to_string(),
                irf.investment[t].to_string(),
                irf.government[t].to_string(),
                irf.hours[t].to_string(),
                irf.wage[t].to_string(),
                irf.interest_rate[t].to_string(),
            ])?;
        }

        wtr.flush()?;
        Ok(())
    }

    /// Write summary JSON with metadata, steady states, multipliers and charts
    pub fn write_summary_json<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write the chart specifications on their own
    pub fn write_charts_json<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.charts)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Write all outputs to a directory
    ///
    /// Creates:
    /// - path.csv
    /// - responses.csv
    /// - charts.json
    /// - summary.json
    pub fn write_all<P: AsRef<Path>>(&self, dir: P) -> Result<(), Box<dyn std::error::Error>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        self.write_path_csv(dir.join("path.csv"))?;
        self.write_responses_csv(dir.join("responses.csv"))?;
        self.write_charts_json(dir.join("charts.json"))?;
        self.write_summary_json(dir.join("summary.json"))?;

        Ok(())
    }
}

/// Write a tax-rate sweep to CSV, leaving failed points' multipliers empty
pub fn write_sweep_csv<P: AsRef<Path>>(
    points: &[SweepPoint],
    path: P,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["tau_bar", "impact", "long_run", "cumulative", "error"])?;

    for point in points {
        let (impact, long_run, cumulative) = match &point.multipliers {
            Some(m) => (
                m.impact.to_string(),
                m.long_run.to_string(),
                m.cumulative.to_string(),
            ),
            None => (String::new(), String::new(), String::new()),
        };
        wtr.write_record(&[
            point.tau_bar.to_string(),
            impact,
            long_run,
            cumulative,
            point.error.clone().unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Short hash of the checked-out commit, `None` outside a git work tree
pub fn git_commit() -> Option<String> {
    let out = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())?;
    let hash = String::from_utf8(out.stdout).ok()?;
    let hash = hash.trim();
    (!hash.is_empty()).then(|| hash.to_string())
}

/// Directory-safe version of a scenario name
pub fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}
