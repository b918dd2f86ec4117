//! Unfused provider: copy, broadcast bias add, then ReLU, each pass in the
//! element's own precision.

use half::{bf16, f16};

use crate::ops::{add_bias, relu_inplace};
use crate::provider::fused::check_rows;
use crate::provider::InferenceOps;
use crate::traits::Element;
use crate::types::KernelResult;

pub const NAME: &str = "fallback_inference_ops";

#[derive(Debug, Default)]
pub struct FallbackInferenceOps;

impl FallbackInferenceOps {
    pub fn new() -> Self {
        log::info!("Loaded {}", NAME);
        FallbackInferenceOps
    }

    fn run<E: Element>(&self, activations: &[E], bias: &[E]) -> KernelResult<Vec<E>> {
        check_rows(activations.len(), bias.len())?;
        let mut out = activations.to_vec();
        add_bias(&mut out, bias);
        relu_inplace(&mut out);
        Ok(out)
    }
}

impl InferenceOps for FallbackInferenceOps {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_fp16() {
        let ops = FallbackInferenceOps::new();
        let a = vec![f16::from_f32(1.0), f16::from_f32(-5.0)];
        let b = vec![f16::from_f32(1.0), f16::from_f32(2.0)];
        let out = ops.bias_relu_fp16(&a, &b).unwrap();
        assert_eq!(out[0].to_f32(), 2.0);
        assert_eq!(out[1].to_f32(), 0.0);
    }

    #[test]
    fn test_fallback_matches_fused_bitwise_on_fp32() {
        let fused = crate::provider::FusedInferenceOps::new();
        let ops = FallbackInferenceOps::new();
        let a: Vec<f32> = (0..64).map(|i| (i as f32 - 32.0) * 0.37).collect();
        let b: Vec<f32> = (0..16).map(|i| (i as f32 - 8.0) * 0.11).collect();
        assert_eq!(
            ops.bias_relu_fp32(&a, &b).unwrap(),
            fused.bias_relu_fp32(&a, &b).unwrap()
        );
    }
}
