//! Zero-cost activation functions.
//!
//! Unfused building blocks used by the fallback provider. Operates in place to
//! avoid allocation.
//!
//! Computation happens in the element's own precision: for f16/bf16 each
//! call rounds once, which is what a framework running the ops separately
//! would do.
//!
//! NaN passes through ReLU unchanged, matching framework `relu`. Every
//! bias + ReLU path in the crate (reference, fallback, scalar and AVX2 fused
//! rows) shares this rule, so a NaN produced by `inf + -inf` reaches the
//! comparator, where it never counts as close.

use crate::traits::Element;

// ============================================================================
// ReLU Activation: max(0, x)
// ============================================================================

/// ReLU for a single value. NaN is returned as is; `-0.0` becomes `+0.0`.
#[inline(always)]
pub fn relu_scalar<E: Element>(x: E) -> E {
    // NaN fails `<=` and falls through.
    if x <= E::ZERO {
        E::ZERO
    } else {
        x
    }
}

/// ReLU activation in-place: `x = max(0, x)`.
#[inline(always)]
pub fn relu_inplace<E: Element>(data: &mut [E]) {
    for x in data.iter_mut() {
        *x = relu_scalar(*x);
    }
}
