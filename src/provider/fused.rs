//! Fused single-pass provider backed by `cpu_kernels`.

use half::{bf16, f16};

use crate::cpu_kernels::{bias_relu_fused, get_isa_level, FusedElement};
use crate::provider::InferenceOps;
use crate::types::{KernelError, KernelResult};

pub const NAME: &str = "fused_inference_ops";

/// Probe the host. The scalar path runs anywhere, so this only fails when
/// the ISA probe itself cannot run on the target.
pub(crate) fn check_compatible() -> Result<(), String> {
    if cfg!(any(target_arch = "x86_64", target_arch = "aarch64", target_arch = "x86")) {
        Ok(())
    } else {
        Err(format!("no tested kernel path for {}", std::env::consts::ARCH))
    }
}

/// Row kernels are picked per call from the process-wide ISA level.
#[derive(Debug, Default)]
pub struct FusedInferenceOps;

impl FusedInferenceOps {
    pub fn new() -> Self {
        log::info!("Loaded {} (isa={:?})", NAME, get_isa_level());
        FusedInferenceOps
    }

    fn run<E: FusedElement>(&self, activations: &[E], bias: &[E]) -> KernelResult<Vec<E>> {
        check_rows(activations.len(), bias.len())?;
        let mut out = vec![E::ZERO; activations.len()];
        bias_relu_fused(activations, bias, &mut out);
        Ok(out)
    }
}

impl InferenceOps for FusedInferenceOps {
    fn name(&self) -> &'static str {
        NAME
    }

    fn bias_relu_fp16(&self, activations: &[f16], bias: &[f16]) -> KernelResult<Vec<f16>> {
        self.run(activations, bias)
    }

    fn bias_relu_bf16(&self, activations: &[bf16], bias: &[bf16]) -> KernelResult<Vec<bf16>> {
        self.run(activations, bias)
    }

    fn bias_relu_fp32(&self, activations: &[f32], bias: &[f32]) -> KernelResult<Vec<f32>> {
        self.run(activations, bias)
    }
}

/// Activations must be a whole number of `channels`-long rows.
pub(crate) fn check_rows(len: usize, channels: usize) -> KernelResult<()> {
    if channels == 0 || len % channels != 0 {
        return Err(KernelError::ShapeMismatch {
            expected: format!("a multiple of {} elements", channels),
            got: format!("{} elements", len),
        });
    }
    Ok(())
}
