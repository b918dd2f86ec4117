//! Broadcast bias addition.

use crate::traits::Element;

/// Add bias to each row of `[rows, features]` output in place.
///
/// Arithmetic is in the element's own precision.
#[inline]
pub fn add_bias<E: Element>(output: &mut [E], bias: &[E]) {
    let features = bias.len();
    if features == 0 {
        return;
    }
    debug_assert_eq!(output.len() % features, 0);

    for row in output.chunks_mut(features) {
        for (o, &b) in row.iter_mut().zip(bias.iter()) {
            *o = o.elem_add(b);
        }
    }
}
