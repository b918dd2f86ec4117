//! AVX2 row kernels. Only selected when `get_isa_level()` reports `Avx2`,
//! which implies both `avx2` and `f16c`.
//!
//! ReLU is `v <= 0 ? +0 : v` with an ordered compare, so NaN lanes pass
//! through and the result is bit-identical to the scalar row.

use std::arch::x86_64::*;

use half::{bf16, f16};

use super::scalar;

const LANES: usize = 8;

pub(crate) fn bias_relu_row_f32(activations: &[f32], bias: &[f32], out: &mut [f32]) {
    // SAFETY: reachable only through FusedElement::row_kernel(IsaLevel::Avx2).
    unsafe { bias_relu_row_f32_avx2(activations, bias, out) }
}

pub(crate) fn bias_relu_row_f16(activations: &[f16], bias: &[f16], out: &mut [f16]) {
    // SAFETY: as above; Avx2 level requires f16c.
    unsafe { bias_relu_row_f16_avx2(activations, bias, out) }
}

pub(crate) fn bias_relu_row_bf16(activations: &[bf16], bias: &[bf16], out: &mut [bf16]) {
    // SAFETY: as above.
    unsafe { bias_relu_row_bf16_avx2(activations, bias, out) }
}

#[target_feature(enable = "avx2")]
unsafe fn bias_relu_row_f32_avx2(activations: &[f32], bias: &[f32], out: &mut [f32]) {
    let n = bias.len().min(activations.len()).min(out.len());
    let zero = _mm256_setzero_ps();
    let mut i = 0;
    while i + LANES <= n {
        let x = _mm256_loadu_ps(activations.as_ptr().add(i));
        let b = _mm256_loadu_ps(bias.as_ptr().add(i));
        let y = relu_ps(_mm256_add_ps(x, b), zero);
        _mm256_storeu_ps(out.as_mut_ptr().add(i), y);
        i += LANES;
    }
    scalar::bias_relu_row(&activations[i..n], &bias[i..n], &mut out[i..n]);
}

#[target_feature(enable = "avx2,f16c")]
unsafe fn bias_relu_row_f16_avx2(activations: &[f16], bias: &[f16], out: &mut [f16]) {
    let n = bias.len().min(activations.len()).min(out.len());
    let zero = _mm256_setzero_ps();
    let mut i = 0;
    while i + LANES <= n {
        // f16 is repr(transparent) over u16.
        let x = _mm256_cvtph_ps(_mm_loadu_si128(activations.as_ptr().add(i) as *const __m128i));
        let b = _mm256_cvtph_ps(_mm_loadu_si128(bias.as_ptr().add(i) as *const __m128i));
        let y = relu_ps(_mm256_add_ps(x, b), zero);
        let h = _mm256_cvtps_ph::<_MM_FROUND_TO_NEAREST_INT>(y);
        _mm_storeu_si128(out.as_mut_ptr().add(i) as *mut __m128i, h);
        i += LANES;
    }
    scalar::bias_relu_row(&activations[i..n], &bias[i..n], &mut out[i..n]);
}

#[target_feature(enable = "avx2")]
unsafe fn bias_relu_row_bf16_avx2(activations: &[bf16], bias: &[bf16], out: &mut [bf16]) {
    let n = bias.len().min(activations.len()).min(out.len());
    let zero = _mm256_setzero_ps();
    let mut lanes = [0.0f32; LANES];
    let mut i = 0;
    while i + LANES <= n {
        let x = load_bf16x8(activations.as_ptr().add(i));
        let b = load_bf16x8(bias.as_ptr().add(i));
        let y = relu_ps(_mm256_add_ps(x, b), zero);
        _mm256_storeu_ps(lanes.as_mut_ptr(), y);
        // Round-to-nearest-even and NaN handling stay with `half`.
        for (o, &v) in out[i..i + LANES].iter_mut().zip(lanes.iter()) {
            *o = bf16::from_f32(v);
        }
        i += LANES;
    }
    scalar::bias_relu_row(&activations[i..n], &bias[i..n], &mut out[i..n]);
}

/// Zero the lanes where `v <= 0`; NaN compares false and is kept.
#[inline]
#[target_feature(enable = "avx2")]
unsafe fn relu_ps(v: __m256, zero: __m256) -> __m256 {
    _mm256_andnot_ps(_mm256_cmp_ps::<_CMP_LE_OQ>(v, zero), v)
}

#[inline]
#[target_feature(enable = "avx2")]
unsafe fn load_bf16x8(ptr: *const bf16) -> __m256 {
    let raw = _mm_loadu_si128(ptr as *const __m128i);
    _mm256_castsi256_ps(_mm256_slli_epi32::<16>(_mm256_cvtepu16_epi32(raw)))
}

#[cfg(test)]
mod tests;
