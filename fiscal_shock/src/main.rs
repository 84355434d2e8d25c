//! Fiscal shock experiment runner
//!
//! Runs the scenarios of an experiment file (or the built-in Baxter-King
//! figure experiment), prints steady states, responses and multipliers, and
//! writes CSV/JSON results for plotting.
//!
//! Usage:
//!   cargo run --release --bin fiscal_shock -- [experiments/baxter_king_fig1.toml]
//!
//! Set `RUST_LOG=foresight=debug` to follow the Newton iterations.

use fiscal_shock::analysis::CHART_PERIODS;
use fiscal_shock::config::ExperimentConfig;
use fiscal_shock::output::{slug, write_sweep_csv, SimulationOutput};
use fiscal_shock::scenarios::{run_scenarios, sweep_tax_rate};
use std::env;
use std::fs;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const BUILTIN_EXPERIMENT: &str = include_str!("../experiments/baxter_king_fig1.toml");

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fiscal_shock=info,foresight=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [experiment_config.toml]", args[0]);
        std::process::exit(1);
    }

    let loaded = match args.get(1) {
        Some(path) => {
            info!("loading experiment config {}", path);
            ExperimentConfig::from_file(path)
        }
        None => BUILTIN_EXPERIMENT.parse::<ExperimentConfig>(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });

    println!("========================================");
    println!("Fiscal Policy in General Equilibrium");
    println!("Based on Baxter & King (1993)");
    println!("========================================");
    println!("\nExperiment: {}", config.experiment.name);
    if !config.experiment.description.is_empty() {
        println!("Description: {}", config.experiment.description);
    }
    println!(
        "Horizon: {} periods, {} scenario(s)",
        config.experiment.horizon,
        config.scenarios.len()
    );

    let output_base = config.output.dir.join(&config.experiment.name);
    let results = run_scenarios(config.to_scenarios());
    let mut failures = 0;

    for (entry, result) in config.scenarios.iter().zip(&results) {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                error!(scenario = %entry.name, "scenario failed: {}", e);
                eprintln!("\n=== {} ===\nFAILED: {}", entry.name, e);
                failures += 1;
                continue;
            }
        };

        result.print_summary();

        let output = match SimulationOutput::from_result(result) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("FAILED to post-process '{}': {}", entry.name, e);
                failures += 1;
                continue;
            }
        };

        let m = &output.multipliers;
        println!(
            "Output multipliers: impact {:.3}, cumulative ({} years) {:.3}, long run {:.3}",
            m.impact, CHART_PERIODS, m.cumulative, m.long_run
        );

        if config.output.print_tables {
            for chart in &output.charts {
                chart.print_table();
            }
        }

        if let Err(e) = save_scenario(&output, &output_base.join(slug(&entry.name)), &config) {
            eprintln!("Error writing results for '{}': {}", entry.name, e);
            failures += 1;
        }
    }

    if let (Some(sweep), Some(base)) = (&config.sweep, config.sweep_base()) {
        println!("\n========================================");
        println!("Tax-rate sensitivity: {}", base.name);
        println!("========================================\n");

        let points = sweep_tax_rate(&base, &sweep.tax_rates, CHART_PERIODS);

        println!(
            "{:<10} {:>10} {:>12} {:>10}",
            "tau", "Impact", "Cumulative", "Long run"
        );
        println!("{:-<10} {:->10} {:->12} {:->10}", "", "", "", "");
        for point in &points {
            match (&point.multipliers, &point.error) {
                (Some(m), _) => println!(
                    "{:<10.2} {:>10.3} {:>12.3} {:>10.3}",
                    point.tau_bar, m.impact, m.cumulative, m.long_run
                ),
                (None, error) => println!(
                    "{:<10.2} FAILED: {}",
                    point.tau_bar,
                    error.as_deref().unwrap_or("unknown error")
                ),
            }
        }

        let sweep_file = output_base.join("tax_rate_sweep.csv");
        let written = fs::create_dir_all(&output_base)
            .map_err(Box::<dyn std::error::Error>::from)
            .and_then(|_| write_sweep_csv(&points, &sweep_file));
        if let Err(e) = written {
            eprintln!("Error writing sweep results: {}", e);
            failures += 1;
        }
    }

    println!("\nResults saved to: {}", output_base.display());

    if failures > 0 {
        eprintln!("{} step(s) failed", failures);
        std::process::exit(1);
    }
}

/// Write the files selected in `[output]` for one scenario
fn save_scenario(
    output: &SimulationOutput,
    dir: &std::path::Path,
    config: &ExperimentConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = &config.output;
    if !(settings.save_path || settings.save_responses || settings.save_summary) {
        return Ok(());
    }

    fs::create_dir_all(dir)?;
    if settings.save_path {
        output.write_path_csv(dir.join("path.csv"))?;
    }
    if settings.save_responses {
        output.write_responses_csv(dir.join("responses.csv"))?;
        output.write_charts_json(dir.join("charts.json"))?;
    }
    if settings.save_summary {
        output.write_summary_json(dir.join("summary.json"))?;
    }
    Ok(())
}
