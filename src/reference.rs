//! Reference evaluator for bias + ReLU.
//!
//! Defines "correct" as full-precision arithmetic:
//! `downcast(relu(f32(activations) + f32(bias)))`. Inputs are upcast before
//! the add and the result is rounded to the input dtype only after the ReLU.

use crate::ops::{add_bias, relu_inplace};
use crate::tensor::Tensor;
use crate::types::KernelResult;
use crate::validation::validate_bias_relu_inputs;

/// Reference bias + ReLU on a tensor pair. Pure; inputs are only read.
pub fn bias_relu_reference(activations: &Tensor, bias: &Tensor) -> KernelResult<Tensor> {
    validate_bias_relu_inputs(activations, bias)?;
    let out = bias_relu_reference_f32(&activations.to_f32_vec(), &bias.to_f32_vec());
    let out = Tensor::from_vec(out, activations.shape(), activations.device())?;
    Ok(out.to_dtype(activations.dtype()))
}

/// `relu(activations + bias)` on f32 rows, `bias` broadcast over each row.
pub fn bias_relu_reference_f32(activations: &[f32], bias: &[f32]) -> Vec<f32> {
    let mut out = activations.to_vec();
    add_bias(&mut out, bias);
    relu_inplace(&mut out);
    out
}
