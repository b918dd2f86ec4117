//! Input validation and tolerance comparison for bias + ReLU kernels.
//!
//! # Design
//!
//! - Shape and dtype problems are errors (`KernelError`), never tolerance failures
//! - Comparison upcasts both sides to f32 and applies `|c - r| <= atol + rtol * |r|`
//! - Tolerances are per dtype and loosen as precision drops
//! - Equal values are always close, so matching infinities from an fp16
//!   overflow pass; NaN is never close, not even to NaN
//!
//! Default tolerances:
//! - FP32: rtol=1e-5, atol=1e-6
//! - FP16: rtol=1e-3, atol=1e-4
//! - BF16: rtol=1e-2, atol=1e-3

use serde::{Deserialize, Serialize};

use crate::tensor::Tensor;
use crate::types::{DType, KernelError, KernelResult};

/// Relative and absolute tolerance pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Tolerance {
    pub rtol: f32,
    pub atol: f32,
}

impl Tolerance {
    pub const fn new(rtol: f32, atol: f32) -> Self {
        Self { rtol, atol }
    }

    /// Bound for a single reference value.
    #[inline]
    pub fn bound(&self, reference: f32) -> f32 {
        self.atol + self.rtol * reference.abs()
    }

    /// `|candidate - reference| <= atol + rtol * |reference|`.
    ///
    /// Same-signed infinities are close. NaN, or an infinity against any
    /// other value, is not.
    #[inline]
    pub fn is_close(&self, candidate: f32, reference: f32) -> bool {
        if candidate == reference {
            return true;
        }
        candidate.is_finite()
            && reference.is_finite()
            && (candidate - reference).abs() <= self.bound(reference)
    }
}

/// Per-dtype tolerances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ToleranceTable {
    pub fp32: Tolerance,
    pub fp16: Tolerance,
    pub bf16: Tolerance,
}

impl Default for ToleranceTable {
    fn default() -> Self {
        Self {
            fp32: Tolerance::new(1e-5, 1e-6),
            fp16: Tolerance::new(1e-3, 1e-4),
            bf16: Tolerance::new(1e-2, 1e-3),
        }
    }
}

impl ToleranceTable {
    pub fn get(&self, dtype: DType) -> Tolerance {
        match dtype {
            DType::F32 => self.fp32,
            DType::F16 => self.fp16,
            DType::BF16 => self.bf16,
        }
    }

    /// Reject negative/non-finite tolerances and tables where a lower
    /// precision is stricter than a higher one.
    pub fn validate(&self) -> KernelResult<()> {
        for dtype in DType::ALL {
            let tol = self.get(dtype);
            if !(tol.rtol.is_finite() && tol.atol.is_finite()) || tol.rtol < 0.0 || tol.atol < 0.0 {
                return Err(KernelError::InvalidConfig(format!(
                    "{} tolerance must be finite and >= 0, got rtol={} atol={}",
                    dtype, tol.rtol, tol.atol
                )));
            }
        }
        for low in [self.fp16, self.bf16] {
            if low.rtol < self.fp32.rtol || low.atol < self.fp32.atol {
                return Err(KernelError::InvalidConfig(
                    "16-bit tolerances must not be tighter than fp32".into(),
                ));
            }
        }
        Ok(())
    }
}

/// First element that fell outside tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Mismatch {
    pub index: usize,
    pub candidate: f32,
    pub reference: f32,
    pub bound: f32,
}

/// Result of comparing a candidate tensor to a reference tensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CloseReport {
    pub dtype: DType,
    pub numel: usize,
    pub tolerance: Tolerance,
    pub max_abs_diff: f32,
    pub mismatches: usize,
    pub first_mismatch: Option<Mismatch>,
}

impl CloseReport {
    #[inline]
    pub fn is_close(&self) -> bool {
        self.mismatches == 0
    }
}

/// Compare `candidate` against `reference` element by element.
///
/// Shapes, dtypes and devices must match exactly; otherwise this is a
/// harness defect and an error is returned.
pub fn compare(candidate: &Tensor, reference: &Tensor, table: &ToleranceTable) -> KernelResult<CloseReport> {
    if candidate.shape() != reference.shape() {
        return Err(KernelError::shape(reference.shape(), candidate.shape()));
    }
    if candidate.dtype() != reference.dtype() {
        return Err(KernelError::DTypeMismatch {
            expected: reference.dtype(),
            got: candidate.dtype(),
        });
    }
    if candidate.device() != reference.device() {
        return Err(KernelError::DeviceMismatch {
            expected: reference.device().to_string(),
            got: candidate.device().to_string(),
        });
    }

    let dtype = reference.dtype();
    let tolerance = table.get(dtype);
    let cand = candidate.to_f32_vec();
    let refr = reference.to_f32_vec();

    let mut max_abs_diff = 0.0f32;
    let mut mismatches = 0usize;
    let mut first_mismatch = None;
    for (index, (&c, &r)) in cand.iter().zip(refr.iter()).enumerate() {
        let diff = if c == r { 0.0 } else { (c - r).abs() };
        // NaN diffs propagate into the report instead of vanishing.
        if diff > max_abs_diff || diff.is_nan() {
            max_abs_diff = diff;
        }
        if !tolerance.is_close(c, r) {
            mismatches += 1;
            if first_mismatch.is_none() {
                first_mismatch = Some(Mismatch {
                    index,
                    candidate: c,
                    reference: r,
                    bound: tolerance.bound(r),
                });
            }
        }
    }

    Ok(CloseReport {
        dtype,
        numel: refr.len(),
        tolerance,
        max_abs_diff,
        mismatches,
        first_mismatch,
    })
}

/// `true` when every element of `candidate` is within tolerance of `reference`.
pub fn allclose(candidate: &Tensor, reference: &Tensor, table: &ToleranceTable) -> KernelResult<bool> {
    Ok(compare(candidate, reference, table)?.is_close())
}

/// Validate a bias + ReLU call: 3-D activations `(batch, sequence, channels)`,
/// 1-D bias `(channels,)`, matching dtype and device, no zero dimensions.
///
/// # Returns
/// - `Ok(channels)` if the inputs are well formed
pub fn validate_bias_relu_inputs(activations: &Tensor, bias: &Tensor) -> KernelResult<usize> {
    let shape = activations.shape();
    if shape.len() != 3 {
        return Err(KernelError::shape("(batch, sequence, channels)", shape));
    }
    if shape.iter().any(|&d| d == 0) {
        return Err(KernelError::InvalidConfig(format!(
            "activation dimensions must be > 0, got {:?}",
            shape
        )));
    }
    let channels = shape[2];
    if bias.shape() != [channels] {
        return Err(KernelError::shape([channels], bias.shape()));
    }
    if bias.dtype() != activations.dtype() {
        return Err(KernelError::DTypeMismatch {
            expected: activations.dtype(),
            got: bias.dtype(),
        });
    }
    if bias.device() != activations.device() {
        return Err(KernelError::DeviceMismatch {
            expected: activations.device().to_string(),
            got: bias.device().to_string(),
        });
    }
    Ok(channels)
}

/// Validate that a kernel output has the activations' shape, dtype and device.
pub fn validate_output(activations: &Tensor, output: &Tensor) -> KernelResult<()> {
    if output.shape() != activations.shape() {
        return Err(KernelError::shape(activations.shape(), output.shape()));
    }
    if output.dtype() != activations.dtype() {
        return Err(KernelError::DTypeMismatch {
            expected: activations.dtype(),
            got: output.dtype(),
        });
    }
    if output.device() != activations.device() {
        return Err(KernelError::DeviceMismatch {
            expected: activations.device().to_string(),
            got: output.device().to_string(),
        });
    }
    Ok(())
}

/// Validate input buffer length matches expected.
#[inline]
pub fn validate_input_len(actual: usize, expected: usize, name: &str) -> KernelResult<()> {
    if actual != expected {
        return Err(KernelError::ShapeMismatch {
            expected: format!("{} len {}", name, expected),
            got: format!("{} len {}", name, actual),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::Device;

    fn t(values: &[f32], shape: &[usize], dtype: DType) -> Tensor {
        Tensor::from_vec(values.to_vec(), shape, Device::Cpu).unwrap().to_dtype(dtype)
    }

    #[test]
    fn test_identical_tensors_are_close() {
        let a = t(&[1.0, -2.0, 3.5], &[3], DType::F32);
        let report = compare(&a, &a, &ToleranceTable::default()).unwrap();
        assert!(report.is_close());
        assert_eq!(report.max_abs_diff, 0.0);
        assert_eq!(report.numel, 3);
    }

    #[test]
    fn test_tolerance_scales_with_precision() {
        // 5e-4 off at magnitude 1.0: fine for fp16 (1e-4 + 1e-3), too far for fp32.
        let table = ToleranceTable::default();
        assert!(table.fp16.is_close(1.0005, 1.0));
        assert!(!table.fp32.is_close(1.0005, 1.0));

        let reference = t(&[1.0; 4], &[4], DType::F32);
        let candidate = t(&[1.0005; 4], &[4], DType::F32);
        let report = compare(&candidate, &reference, &table).unwrap();
        assert!(!report.is_close());
        assert_eq!(report.mismatches, 4);
        assert_eq!(report.first_mismatch.unwrap().index, 0);
    }

    #[test]
    fn test_shape_mismatch_is_error_not_failure() {
        let a = t(&[1.0; 4], &[2, 2], DType::F32);
        let b = t(&[1.0; 4], &[4], DType::F32);
        let err = compare(&a, &b, &ToleranceTable::default()).unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_dtype_mismatch_is_error() {
        let a = t(&[1.0; 4], &[4], DType::F16);
        let b = t(&[1.0; 4], &[4], DType::F32);
        let err = allclose(&a, &b, &ToleranceTable::default()).unwrap_err();
        assert!(matches!(err, KernelError::DTypeMismatch { .. }));
    }

    #[test]
    fn test_nan_is_never_close() {
        let a = t(&[f32::NAN], &[1], DType::F32);
        let report = compare(&a, &a, &ToleranceTable::default()).unwrap();
        assert!(!report.is_close());
        assert!(report.max_abs_diff.is_nan());
    }

    #[test]
    fn test_matching_infinities_are_close() {
        let tol = ToleranceTable::default().fp16;
        assert!(tol.is_close(f32::INFINITY, f32::INFINITY));
        assert!(tol.is_close(f32::NEG_INFINITY, f32::NEG_INFINITY));
        assert!(!tol.is_close(f32::INFINITY, f32::NEG_INFINITY));
        assert!(!tol.is_close(1.0, f32::INFINITY));
        assert!(!tol.is_close(f32::INFINITY, 65504.0));
        assert!(!tol.is_close(f32::NEG_INFINITY, 0.0));
    }

    #[test]
    fn test_overflowed_fp16_tensors_compare_clean() {
        let a = t(&[f32::INFINITY, 1.0], &[2], DType::F16);
        let report = compare(&a, &a, &ToleranceTable::default()).unwrap();
        assert!(report.is_close());
        assert_eq!(report.max_abs_diff, 0.0);

        let finite = t(&[65504.0, 1.0], &[2], DType::F16);
        let report = compare(&finite, &a, &ToleranceTable::default()).unwrap();
        assert_eq!(report.mismatches, 1);
        assert_eq!(report.first_mismatch.unwrap().index, 0);
    }

    #[test]
    fn test_validate_bias_relu_inputs() {
        let act = t(&[0.0; 24], &[2, 3, 4], DType::F16);
        let bias = t(&[0.0; 4], &[4], DType::F16);
        assert_eq!(validate_bias_relu_inputs(&act, &bias).unwrap(), 4);

        let wrong_len = t(&[0.0; 3], &[3], DType::F16);
        assert!(validate_bias_relu_inputs(&act, &wrong_len).is_err());

        let wrong_dtype = t(&[0.0; 4], &[4], DType::BF16);
        assert!(matches!(
            validate_bias_relu_inputs(&act, &wrong_dtype),
            Err(KernelError::DTypeMismatch { .. })
        ));

        let two_d = t(&[0.0; 8], &[2, 4], DType::F16);
        assert!(validate_bias_relu_inputs(&two_d, &bias).is_err());
    }

    #[test]
    fn test_default_table_validates() {
        assert!(ToleranceTable::default().validate().is_ok());
        let mut table = ToleranceTable::default();
        table.fp16 = Tolerance::new(1e-7, 1e-8);
        assert!(table.validate().is_err());
        table = ToleranceTable::default();
        table.bf16.atol = -1.0;
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_validate_input_len() {
        assert!(validate_input_len(4, 4, "bias").is_ok());
        assert!(validate_input_len(3, 4, "bias").is_err());
    }
}
