//! Kernel providers for fused bias + ReLU.
//!
//! A provider exposes one entry point per element type
//! (`bias_relu_fp16`, `bias_relu_bf16`, `bias_relu_fp32`). The tensor-level
//! [`InferenceOps::bias_relu`] validates inputs and dispatches with a `match`
//! on [`DType`], so a new precision fails to compile until every provider
//! implements it.

use std::fmt;
use std::sync::Arc;

use half::{bf16, f16};

use crate::tensor::Tensor;
use crate::types::{DType, KernelResult};
use crate::validation::{validate_bias_relu_inputs, validate_input_len};

pub mod fallback;
pub mod fused;
pub mod registry;

pub use fallback::FallbackInferenceOps;
pub use fused::FusedInferenceOps;
pub use registry::ProviderRegistry;

/// Loaded bias + ReLU kernels.
///
/// Per-precision entry points take row-major activations whose length is a
/// multiple of `bias.len()` and return a fresh buffer of the same length.
/// Inputs are never mutated.
pub trait InferenceOps: Send + Sync + fmt::Debug {
    /// Provider name, as reported by [`ProviderKind::name`].
    fn name(&self) -> &'static str;

    fn bias_relu_fp16(&self, activations: &[f16], bias: &[f16]) -> KernelResult<Vec<f16>>;

    fn bias_relu_bf16(&self, activations: &[bf16], bias: &[bf16]) -> KernelResult<Vec<bf16>>;

    fn bias_relu_fp32(&self, activations: &[f32], bias: &[f32]) -> KernelResult<Vec<f32>>;

    /// `relu(activations + bias)` with bias broadcast over the last dimension.
    ///
    /// The output has the shape, dtype and device of `activations`.
    fn bias_relu(&self, activations: &Tensor, bias: &Tensor) -> KernelResult<Tensor> {
        validate_bias_relu_inputs(activations, bias)?;
        let shape = activations.shape();
        let device = activations.device();
        log::trace!("{}: bias_relu_{} {:?}", self.name(), activations.dtype(), shape);

        match activations.dtype() {
            DType::F16 => {
                let (a, b) = typed::<f16>(activations, bias)?;
                let out = self.bias_relu_fp16(a, b)?;
                validate_input_len(out.len(), a.len(), "output")?;
                Tensor::from_vec(out, shape, device)
            }
            DType::BF16 => {
                let (a, b) = typed::<bf16>(activations, bias)?;
                let out = self.bias_relu_bf16(a, b)?;
                validate_input_len(out.len(), a.len(), "output")?;
                Tensor::from_vec(out, shape, device)
            }
            DType::F32 => {
                let (a, b) = typed::<f32>(activations, bias)?;
                let out = self.bias_relu_fp32(a, b)?;
                validate_input_len(out.len(), a.len(), "output")?;
                Tensor::from_vec(out, shape, device)
            }
        }
    }
}

fn typed<'a, E: crate::traits::Element>(
    activations: &'a Tensor,
    bias: &'a Tensor,
) -> KernelResult<(&'a [E], &'a [E])> {
    let mismatch = |t: &Tensor| crate::types::KernelError::DTypeMismatch {
        expected: E::DTYPE,
        got: t.dtype(),
    };
    let a = activations.as_slice::<E>().ok_or_else(|| mismatch(activations))?;
    let b = bias.as_slice::<E>().ok_or_else(|| mismatch(bias))?;
    Ok((a, b))
}

/// Closed set of providers the registry can build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderKind {
    /// Fused single-pass CPU kernel, the kernel under test.
    Fused,
    /// Unfused bias add + ReLU in native precision, the alternate implementation.
    Fallback,
}

impl ProviderKind {
    pub const ALL: [ProviderKind; 2] = [ProviderKind::Fused, ProviderKind::Fallback];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Fused => fused::NAME,
            Self::Fallback => fallback::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Whether the host can run this provider. `Err` carries the reason.
    pub fn is_compatible(self) -> Result<(), String> {
        match self {
            Self::Fused => fused::check_compatible(),
            Self::Fallback => Ok(()),
        }
    }

    pub(crate) fn build(self) -> Arc<dyn InferenceOps> {
        match self {
            Self::Fused => Arc::new(FusedInferenceOps::new()),
            Self::Fallback => Arc::new(FallbackInferenceOps::new()),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Device;
    use crate::types::KernelError;

    #[test]
    fn test_provider_names_round_trip() {
        for kind in ProviderKind::ALL {
            assert_eq!(ProviderKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ProviderKind::from_name("nope"), None);
    }

    #[test]
    fn test_dispatch_keeps_shape_dtype_device() {
        for kind in ProviderKind::ALL {
            let ops = kind.build();
            for dtype in DType::ALL {
                let act = Tensor::full(&[2, 3, 8], 1.0, dtype, Device::Cpu).unwrap();
                let bias = Tensor::full(&[8], -0.5, dtype, Device::Cpu).unwrap();
                let out = ops.bias_relu(&act, &bias).unwrap();
                assert_eq!(out.shape(), act.shape());
                assert_eq!(out.dtype(), dtype);
                assert_eq!(out.device(), act.device());
                assert!(out.to_f32_vec().iter().all(|&v| v == 0.5), "{kind} {dtype}");
            }
        }
    }

    #[test]
    fn test_dispatch_rejects_mixed_dtypes() {
        let ops = ProviderKind::Fused.build();
        let act = Tensor::full(&[1, 1, 4], 1.0, DType::F16, Device::Cpu).unwrap();
        let bias = Tensor::full(&[4], 1.0, DType::F32, Device::Cpu).unwrap();
        assert!(matches!(
            ops.bias_relu(&act, &bias),
            Err(KernelError::DTypeMismatch { .. })
        ));
    }
}
