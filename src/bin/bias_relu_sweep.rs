//! Run the bias + ReLU correctness grid and print a JSON report.
//!
//! Usage: `bias_relu_sweep [CONFIG.json]`
//!
//! Without an argument the config comes from `BIAS_RELU_HARNESS_CONFIG`, or
//! the built-in grid. Exit code 0 on success or skip, 1 on any failure,
//! 2 on a configuration error.

use std::process::ExitCode;

use serde::Serialize;

use bias_relu_kernels::{
    detect_device, DeviceInfo, GridSummary, Harness, HarnessConfig, KernelError, ProviderRegistry,
    TrialReport,
};

#[derive(Serialize)]
struct SweepReport<'a> {
    device: &'a DeviceInfo,
    summary: GridSummary,
    reports: Vec<TrialReport>,
    errors: Vec<String>,
}

fn load_config() -> Result<HarnessConfig, KernelError> {
    match std::env::args_os().nth(1) {
        Some(path) => HarnessConfig::from_path(path),
        None => HarnessConfig::from_env(),
    }
}

fn main() -> ExitCode {
    env_logger::init();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("bias_relu_sweep: {}", e);
            return ExitCode::from(2);
        }
    };

    let registry = ProviderRegistry::global();
    let harness = match Harness::prepare(registry, config) {
        Ok(harness) => harness,
        Err(e) if e.is_unavailable() => {
            println!("Skipping bias + ReLU sweep: {}", e);
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("bias_relu_sweep: {}", e);
            return ExitCode::from(2);
        }
    };

    let results = harness.run_grid();
    let summary = GridSummary::from_results(&results);
    let mut reports = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => errors.push(e.to_string()),
        }
    }

    let success = summary.is_success();
    let report = SweepReport {
        device: detect_device(),
        summary,
        reports,
        errors,
    };
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("bias_relu_sweep: failed to serialize report: {}", e);
            return ExitCode::FAILURE;
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
