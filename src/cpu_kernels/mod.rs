//! # Fused bias + ReLU CPU kernels
//!
//! `out[r, c] = relu(f32(act[r, c]) + f32(bias[c]))`, rounded once to the
//! element type. One pass over memory, no intermediate buffer. NaN sums
//! propagate, as in `ops::relu_scalar`.
//!
//! Row kernels are selected per element type from the runtime ISA level:
//!
//! | ISA | f32 | f16 | bf16 |
//! |---|---|---|---|
//! | `Avx2` | AVX2 add/cmp | F16C load/store | shift load, scalar round |
//! | `Scalar` | scalar | scalar | scalar |
//!
//! Rows are independent, so large tensors are split across the rayon pool.

use std::sync::OnceLock;

use half::{bf16, f16};
use rayon::prelude::*;
use serde::Serialize;

use crate::traits::Element;

pub mod scalar;
#[cfg(target_arch = "x86_64")]
pub(crate) mod avx2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IsaLevel {
    Scalar,
    /// AVX2 with F16C conversions.
    Avx2,
}

static ISA_LEVEL: OnceLock<IsaLevel> = OnceLock::new();

pub fn get_isa_level() -> IsaLevel {
    *ISA_LEVEL.get_or_init(detect_isa_features)
}

#[cfg(target_arch = "x86_64")]
fn detect_isa_features() -> IsaLevel {
    if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("f16c") {
        IsaLevel::Avx2
    } else {
        IsaLevel::Scalar
    }
}

#[cfg(not(target_arch = "x86_64"))]
fn detect_isa_features() -> IsaLevel {
    IsaLevel::Scalar
}

/// Below this many elements the rayon split costs more than it saves.
pub const PARALLEL_MIN_ELEMS: usize = 1 << 16;

/// Kernel for one row: `(activations, bias, out)`, all `channels` long.
pub type RowKernel<E> = fn(&[E], &[E], &mut [E]);

/// Element types with a fused row kernel.
pub trait FusedElement: Element {
    fn row_kernel(isa: IsaLevel) -> RowKernel<Self>;
}

impl FusedElement for f32 {
    fn row_kernel(isa: IsaLevel) -> RowKernel<Self> {
        match isa {
            #[cfg(target_arch = "x86_64")]
            IsaLevel::Avx2 => avx2::bias_relu_row_f32,
            _ => scalar::bias_relu_row::<f32>,
        }
    }
}

impl FusedElement for f16 {
    fn row_kernel(isa: IsaLevel) -> RowKernel<Self> {
        match isa {
            #[cfg(target_arch = "x86_64")]
            IsaLevel::Avx2 => avx2::bias_relu_row_f16,
            _ => scalar::bias_relu_row::<f16>,
        }
    }
}

impl FusedElement for bf16 {
    fn row_kernel(isa: IsaLevel) -> RowKernel<Self> {
        match isa {
            #[cfg(target_arch = "x86_64")]
            IsaLevel::Avx2 => avx2::bias_relu_row_bf16,
            _ => scalar::bias_relu_row::<bf16>,
        }
    }
}

/// Fused bias + ReLU over `[rows, channels]`, where `channels = bias.len()`.
///
/// `activations.len()` must be a multiple of `bias.len()` and equal `out.len()`;
/// callers validate this before dispatch.
pub fn bias_relu_fused<E: FusedElement>(activations: &[E], bias: &[E], out: &mut [E]) {
    bias_relu_fused_with(E::row_kernel(get_isa_level()), activations, bias, out)
}

/// Same as [`bias_relu_fused`] with an explicit row kernel.
pub fn bias_relu_fused_with<E: FusedElement>(
    row: RowKernel<E>,
    activations: &[E],
    bias: &[E],
    out: &mut [E],
) {
    let channels = bias.len();
    debug_assert_eq!(activations.len(), out.len());
    if channels == 0 {
        return;
    }
    debug_assert_eq!(activations.len() % channels, 0);

    if activations.len() >= PARALLEL_MIN_ELEMS {
        out.par_chunks_mut(channels)
            .zip(activations.par_chunks(channels))
            .for_each(|(o, a)| row(a, bias, o));
    } else {
        for (o, a) in out.chunks_mut(channels).zip(activations.chunks(channels)) {
            row(a, bias, o);
        }
    }
}
