use half::{bf16, f16};

use super::*;
use crate::cpu_kernels::scalar;

macro_rules! skip_without_avx2 {
    () => {
        if !(std::is_x86_feature_detected!("avx2") && std::is_x86_feature_detected!("f16c")) {
            eprintln!("AVX2/F16C not supported on this CPU, skipping");
            return;
        }
    };
}

fn pattern(n: usize, seed: u64) -> Vec<f32> {
    let mut state = seed;
    (0..n)
        .map(|_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            ((state >> 33) as f32) / (u32::MAX as f32) * 8.0 - 2.0
        })
        .collect()
}

#[test]
fn test_avx2_f32_matches_scalar() {
    skip_without_avx2!();
    // 29 = 3 full vectors + a 5 element tail
    let a = pattern(29, 1);
    let b = pattern(29, 2);
    let mut simd = vec![0.0; 29];
    let mut reference = vec![0.0; 29];
    bias_relu_row_f32(&a, &b, &mut simd);
    scalar::bias_relu_row(&a, &b, &mut reference);
    assert_eq!(simd, reference);
}

#[test]
fn test_avx2_f16_matches_scalar() {
    skip_without_avx2!();
    let a: Vec<f16> = pattern(67, 3).into_iter().map(f16::from_f32).collect();
    let b: Vec<f16> = pattern(67, 4).into_iter().map(f16::from_f32).collect();
    let mut simd = vec![f16::ZERO; 67];
    let mut reference = vec![f16::ZERO; 67];
    bias_relu_row_f16(&a, &b, &mut simd);
    scalar::bias_relu_row(&a, &b, &mut reference);
    assert_eq!(simd, reference);
}

#[test]
fn test_avx2_bf16_matches_scalar() {
    skip_without_avx2!();
    let a: Vec<bf16> = pattern(40, 5).into_iter().map(bf16::from_f32).collect();
    let b: Vec<bf16> = pattern(40, 6).into_iter().map(bf16::from_f32).collect();
    let mut simd = vec![bf16::ZERO; 40];
    let mut reference = vec![bf16::ZERO; 40];
    bias_relu_row_bf16(&a, &b, &mut simd);
    scalar::bias_relu_row(&a, &b, &mut reference);
    assert_eq!(simd, reference);
}

#[test]
fn test_avx2_nan_lanes_propagate() {
    skip_without_avx2!();
    let mut a = vec![1.0f32; 16];
    let mut b = vec![-2.0f32; 16];
    a[3] = f32::NAN;
    a[9] = f32::INFINITY;
    b[9] = f32::NEG_INFINITY;
    let mut out = vec![5.0; 16];
    bias_relu_row_f32(&a, &b, &mut out);
    for (i, v) in out.iter().enumerate() {
        match i {
            3 | 9 => assert!(v.is_nan(), "lane {i}"),
            _ => assert_eq!(v.to_bits(), 0.0f32.to_bits(), "lane {i}"),
        }
    }

    let a16: Vec<f16> = a.iter().map(|&v| f16::from_f32(v)).collect();
    let b16: Vec<f16> = b.iter().map(|&v| f16::from_f32(v)).collect();
    let mut out16 = vec![f16::ONE; 16];
    bias_relu_row_f16(&a16, &b16, &mut out16);
    assert!(out16[3].is_nan() && out16[9].is_nan());

    let ab: Vec<bf16> = a.iter().map(|&v| bf16::from_f32(v)).collect();
    let bb: Vec<bf16> = b.iter().map(|&v| bf16::from_f32(v)).collect();
    let mut outb = vec![bf16::ONE; 16];
    bias_relu_row_bf16(&ab, &bb, &mut outb);
    assert!(outb[3].is_nan() && outb[9].is_nan());
}

#[test]
fn test_avx2_f32_negative_lanes_clamp() {
    skip_without_avx2!();
    let a = vec![-5.0f32; 16];
    let b = vec![2.0f32; 16];
    let mut out = vec![1.0; 16];
    bias_relu_row_f32(&a, &b, &mut out);
    assert!(out.iter().all(|&v| v == 0.0));
}
