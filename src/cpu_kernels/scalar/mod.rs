use crate::ops::relu_scalar;
use crate::traits::Element;

/// Portable fused row: compute in f32, round once on store. NaN propagates.
#[inline(always)]
pub fn bias_relu_row<E: Element>(activations: &[E], bias: &[E], out: &mut [E]) {
    debug_assert_eq!(activations.len(), bias.len());
    debug_assert_eq!(activations.len(), out.len());
    for ((o, &x), &b) in out.iter_mut().zip(activations).zip(bias) {
        *o = E::from_f32(relu_scalar(x.to_f32() + b.to_f32()));
    }
}
