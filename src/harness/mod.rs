//! Correctness harness for fused bias + ReLU kernels.
//!
//! Every trial runs the same pipeline with no shared mutable state:
//!
//! 1. generate one random activation tensor and one random bias vector
//! 2. deep-copy both three times
//! 3. run the fused provider, the fallback provider and the reference
//!    evaluator, each on its own copy
//! 4. compare both provider outputs against the reference
//!
//! Availability is decided once in [`Harness::prepare`]. An unavailable
//! fused provider is an error the caller turns into a whole-suite skip. An
//! unavailable fallback provider is recorded separately: its checks are
//! reported as skipped while the fused checks still run.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::provider::{InferenceOps, ProviderKind, ProviderRegistry};
use crate::reference::bias_relu_reference;
use crate::runtime_detection::default_device;
use crate::tensor::{Device, Tensor};
use crate::types::{KernelError, KernelResult};
use crate::validation::{compare, validate_bias_relu_inputs, validate_output, CloseReport};

pub mod grid;

pub use grid::{HarnessConfig, Trial, TrialGrid};

/// Outcome of one provider-vs-reference comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckOutcome {
    Passed(CloseReport),
    Failed(CloseReport),
    Skipped { reason: String },
}

impl CheckOutcome {
    fn from_report(report: CloseReport) -> Self {
        if report.is_close() {
            Self::Passed(report)
        } else {
            Self::Failed(report)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Check {
    pub provider: &'static str,
    pub outcome: CheckOutcome,
}

impl Check {
    fn ensure_passed(&self, trial: &Trial) -> KernelResult<()> {
        match &self.outcome {
            CheckOutcome::Failed(report) => Err(KernelError::NumericMismatch {
                trial: trial.to_string(),
                provider: self.provider,
                max_abs_diff: report.max_abs_diff,
                mismatches: report.mismatches,
            }),
            _ => Ok(()),
        }
    }
}

/// Result of one trial: kernel under test and alternate implementation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialReport {
    pub trial: Trial,
    pub primary: Check,
    pub fallback: Check,
}

impl TrialReport {
    /// No check failed. Skipped checks do not count as failures.
    pub fn passed(&self) -> bool {
        !self.primary.outcome.is_failed() && !self.fallback.outcome.is_failed()
    }

    /// `Err(NumericMismatch)` naming the trial and the first failing provider.
    pub fn ensure_passed(&self) -> KernelResult<()> {
        self.primary.ensure_passed(&self.trial)?;
        self.fallback.ensure_passed(&self.trial)
    }
}

/// Totals over a grid run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GridSummary {
    pub trials: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub fallback_skipped: usize,
}

impl GridSummary {
    pub fn from_results(results: &[KernelResult<TrialReport>]) -> Self {
        let mut summary = Self {
            trials: results.len(),
            ..Self::default()
        };
        for result in results {
            match result {
                Ok(report) => {
                    if report.passed() {
                        summary.passed += 1;
                    } else {
                        summary.failed += 1;
                    }
                    if report.fallback.outcome.is_skipped() {
                        summary.fallback_skipped += 1;
                    }
                }
                Err(_) => summary.errors += 1,
            }
        }
        summary
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }
}

/// Loaded providers plus configuration. Immutable once prepared.
#[derive(Debug)]
pub struct Harness {
    primary: Arc<dyn InferenceOps>,
    fallback: Result<Arc<dyn InferenceOps>, String>,
    config: HarnessConfig,
    device: Device,
}

impl Harness {
    /// Load providers from `registry` and validate `config`.
    ///
    /// Returns `KernelError::Unavailable` when the fused provider cannot be
    /// loaded; callers should skip every trial in that case.
    pub fn prepare(registry: &ProviderRegistry, config: HarnessConfig) -> KernelResult<Self> {
        config.validate()?;
        let primary = registry.load(ProviderKind::Fused)?;
        let fallback = match registry.load(ProviderKind::Fallback) {
            Ok(ops) => Ok(ops),
            Err(e) if e.is_unavailable() => {
                log::warn!("Fallback checks will be skipped: {}", e);
                Err(e.to_string())
            }
            Err(e) => return Err(e),
        };
        log::info!(
            "Harness ready: primary={} fallback={} trials={}",
            primary.name(),
            fallback.as_ref().map(|ops| ops.name()).unwrap_or("unavailable"),
            config.grid.len()
        );
        Ok(Self {
            primary,
            fallback,
            config,
            device: default_device(),
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn fallback_available(&self) -> bool {
        self.fallback.is_ok()
    }

    /// Deterministic random inputs for `trial`: activations then bias from
    /// one seeded stream.
    pub fn generate_inputs(&self, trial: &Trial) -> KernelResult<(Tensor, Tensor)> {
        let mut rng = StdRng::seed_from_u64(trial.seed(self.config.seed));
        let activations = Tensor::randn(&trial.activation_shape(), trial.dtype, self.device, &mut rng)?;
        let bias = Tensor::randn(&trial.bias_shape(), trial.dtype, self.device, &mut rng)?;
        Ok((activations, bias))
    }

    pub fn run_trial(&self, trial: Trial) -> KernelResult<TrialReport> {
        let (activations, bias) = self.generate_inputs(&trial)?;
        self.evaluate(trial, &activations, &bias)
    }

    /// Run the pipeline on caller-supplied inputs.
    pub fn run_inputs(&self, activations: &Tensor, bias: &Tensor) -> KernelResult<TrialReport> {
        let channels = validate_bias_relu_inputs(activations, bias)?;
        let shape = activations.shape();
        let trial = Trial::new(shape[0], shape[1], channels, activations.dtype());
        self.evaluate(trial, activations, bias)
    }

    /// Every trial of the configured grid, in grid order.
    pub fn run_grid(&self) -> Vec<KernelResult<TrialReport>> {
        self.config
            .grid
            .trials()
            .into_iter()
            .map(|trial| self.run_trial(trial))
            .collect()
    }

    fn evaluate(&self, trial: Trial, activations: &Tensor, bias: &Tensor) -> KernelResult<TrialReport> {
        log::debug!("Running trial {}", trial);
        let (act_primary, bias_primary) = (activations.clone(), bias.clone());
        let (act_fallback, bias_fallback) = (activations.clone(), bias.clone());
        let (act_ref, bias_ref) = (activations.clone(), bias.clone());

        let primary_out = self.primary.bias_relu(&act_primary, &bias_primary)?;
        validate_output(&act_primary, &primary_out)?;

        let fallback_out = match &self.fallback {
            Ok(ops) => {
                let out = ops.bias_relu(&act_fallback, &bias_fallback)?;
                validate_output(&act_fallback, &out)?;
                Ok(out)
            }
            Err(reason) => Err(reason.clone()),
        };

        let reference = bias_relu_reference(&act_ref, &bias_ref)?;
        let tolerances = &self.config.tolerances;

        let primary = Check {
            provider: self.primary.name(),
            outcome: CheckOutcome::from_report(compare(&primary_out, &reference, tolerances)?),
        };
        let fallback = match fallback_out {
            Ok(out) => Check {
                provider: ProviderKind::Fallback.name(),
                outcome: CheckOutcome::from_report(compare(&out, &reference, tolerances)?),
            },
            Err(reason) => Check {
                provider: ProviderKind::Fallback.name(),
                outcome: CheckOutcome::Skipped { reason },
            },
        };

        let report = TrialReport {
            trial,
            primary,
            fallback,
        };
        if !report.passed() {
            log::warn!("Trial {} failed", trial);
        }
        Ok(report)
    }
}
