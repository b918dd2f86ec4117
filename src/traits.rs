use std::fmt::Debug;

use half::{bf16, f16};

use crate::tensor::TensorData;
use crate::types::DType;

/// Core element trait for the bias/activation kernels.
///
/// Provides a unified interface for scalar conversion across precisions
/// (f32, f16, bf16). Compile-time monomorphization, zero runtime overhead.
pub trait Element: Debug + Clone + Copy + Send + Sync + Default + PartialOrd + 'static {
    const ZERO: Self;
    /// Element type discriminant: 0=f32, 1=f16, 2=bf16
    const ELEM_ID: u8;
    const DTYPE: DType;

    fn from_f32(v: f32) -> Self;
    fn to_f32(self) -> f32;

    /// Add in the element's own precision (one rounding per op).
    fn elem_add(self, other: Self) -> Self;

    /// Move a typed buffer into type-erased tensor storage.
    fn into_data(v: Vec<Self>) -> TensorData;

    /// Borrow typed storage; `None` when the tensor holds another dtype.
    fn view(data: &TensorData) -> Option<&[Self]>;

    /// Zero-cost transmute to f32 slice when Self == f32.
    /// Returns None for non-f32 types (caller must convert element-by-element).
    fn as_f32_slice(s: &[Self]) -> Option<&[f32]>;
}

impl Element for f32 {
    const ZERO: Self = 0.0;
    const ELEM_ID: u8 = 0;
    const DTYPE: DType = DType::F32;

    #[inline(always)] fn from_f32(v: f32) -> Self { v }
    #[inline(always)] fn to_f32(self) -> f32 { self }
    #[inline(always)] fn elem_add(self, other: Self) -> Self { self + other }

    fn into_data(v: Vec<Self>) -> TensorData { TensorData::F32(v) }

    fn view(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::F32(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)]
    fn as_f32_slice(s: &[Self]) -> Option<&[f32]> { Some(s) }
}

impl Element for f16 {
    const ZERO: Self = f16::ZERO;
    const ELEM_ID: u8 = 1;
    const DTYPE: DType = DType::F16;

    #[inline(always)] fn from_f32(v: f32) -> Self { f16::from_f32(v) }
    #[inline(always)] fn to_f32(self) -> f32 { f16::to_f32(self) }
    #[inline(always)] fn elem_add(self, other: Self) -> Self { self + other }

    fn into_data(v: Vec<Self>) -> TensorData { TensorData::F16(v) }

    fn view(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::F16(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)] fn as_f32_slice(_s: &[Self]) -> Option<&[f32]> { None }
}

impl Element for bf16 {
    const ZERO: Self = bf16::ZERO;
    const ELEM_ID: u8 = 2;
    const DTYPE: DType = DType::BF16;

    #[inline(always)] fn from_f32(v: f32) -> Self { bf16::from_f32(v) }
    #[inline(always)] fn to_f32(self) -> f32 { bf16::to_f32(self) }
    #[inline(always)] fn elem_add(self, other: Self) -> Self { self + other }

    fn into_data(v: Vec<Self>) -> TensorData { TensorData::BF16(v) }

    fn view(data: &TensorData) -> Option<&[Self]> {
        match data {
            TensorData::BF16(v) => Some(v),
            _ => None,
        }
    }

    #[inline(always)] fn as_f32_slice(_s: &[Self]) -> Option<&[f32]> { None }
}

/// Convert any Element slice to an f32 vec.
#[inline]
pub fn elem_to_f32_vec<E: Element>(src: &[E]) -> Vec<f32> {
    if let Some(f) = E::as_f32_slice(src) {
        return f.to_vec();
    }
    src.iter().map(|v| v.to_f32()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elem_ids_match_dtype() {
        assert_eq!(f32::ELEM_ID, DType::F32.elem_id());
        assert_eq!(f16::ELEM_ID, DType::F16.elem_id());
        assert_eq!(bf16::ELEM_ID, DType::BF16.elem_id());
    }

    #[test]
    fn test_view_rejects_other_dtype() {
        let data = f16::into_data(vec![f16::ONE; 4]);
        assert!(<f16 as Element>::view(&data).is_some());
        assert!(<f32 as Element>::view(&data).is_none());
        assert!(<bf16 as Element>::view(&data).is_none());
    }

    #[test]
    fn test_bf16_native_add_rounds() {
        // 1 + 2^-9 is below bf16 resolution at 1.0.
        let a = bf16::from_f32(1.0);
        let b = bf16::from_f32(1.0 / 512.0);
        assert_eq!(a.elem_add(b).to_f32(), 1.0);
    }
}
