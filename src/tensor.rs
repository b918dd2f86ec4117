//! Owned host tensors with a closed set of element types.

use std::fmt;

use half::{bf16, f16};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::traits::{elem_to_f32_vec, Element};
use crate::types::{DType, KernelError, KernelResult};

/// Device kind for tensor placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Device {
    #[default]
    Cpu,
}

impl Device {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Type-tagged element storage.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorData {
    F16(Vec<f16>),
    BF16(Vec<bf16>),
    F32(Vec<f32>),
}

impl TensorData {
    pub fn dtype(&self) -> DType {
        match self {
            Self::F16(_) => DType::F16,
            Self::BF16(_) => DType::BF16,
            Self::F32(_) => DType::F32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F16(v) => v.len(),
            Self::BF16(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn from_f32(values: Vec<f32>, dtype: DType) -> Self {
        match dtype {
            DType::F32 => Self::F32(values),
            DType::F16 => Self::F16(values.into_iter().map(f16::from_f32).collect()),
            DType::BF16 => Self::BF16(values.into_iter().map(bf16::from_f32).collect()),
        }
    }
}

/// A dense row-major tensor. `clone()` is a deep copy.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    data: TensorData,
    shape: Vec<usize>,
    device: Device,
}

impl Tensor {
    /// Build a tensor from typed data. Fails if `data.len()` disagrees with `shape`.
    pub fn from_vec<E: Element>(data: Vec<E>, shape: &[usize], device: Device) -> KernelResult<Self> {
        Self::from_data(E::into_data(data), shape, device)
    }

    pub fn from_data(data: TensorData, shape: &[usize], device: Device) -> KernelResult<Self> {
        let expected = numel(shape)?;
        if data.len() != expected {
            return Err(KernelError::ShapeMismatch {
                expected: format!("{} elements for shape {:?}", expected, shape),
                got: format!("{} elements", data.len()),
            });
        }
        Ok(Self {
            data,
            shape: shape.to_vec(),
            device,
        })
    }

    /// Tensor filled with `value`, rounded once to `dtype`.
    pub fn full(shape: &[usize], value: f32, dtype: DType, device: Device) -> KernelResult<Self> {
        let n = numel(shape)?;
        Self::from_data(TensorData::from_f32(vec![value; n], dtype), shape, device)
    }

    /// Standard-normal samples drawn in f32 and rounded to `dtype`.
    pub fn randn<R: Rng + ?Sized>(
        shape: &[usize],
        dtype: DType,
        device: Device,
        rng: &mut R,
    ) -> KernelResult<Self> {
        let n = numel(shape)?;
        let values: Vec<f32> = (0..n).map(|_| rng.sample::<f32, _>(StandardNormal)).collect();
        Self::from_data(TensorData::from_f32(values, dtype), shape, device)
    }

    #[inline]
    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }

    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    #[inline]
    pub fn numel(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn device(&self) -> Device {
        self.device
    }

    /// Typed view; `None` if `E` is not this tensor's element type.
    #[inline]
    pub fn as_slice<E: Element>(&self) -> Option<&[E]> {
        E::view(&self.data)
    }

    /// Upcast every element to f32.
    pub fn to_f32_vec(&self) -> Vec<f32> {
        match &self.data {
            TensorData::F16(v) => elem_to_f32_vec(v),
            TensorData::BF16(v) => elem_to_f32_vec(v),
            TensorData::F32(v) => v.clone(),
        }
    }

    /// Convert to another element type through f32.
    pub fn to_dtype(&self, dtype: DType) -> Self {
        if dtype == self.dtype() {
            return self.clone();
        }
        Self {
            data: TensorData::from_f32(self.to_f32_vec(), dtype),
            shape: self.shape.clone(),
            device: self.device,
        }
    }
}

fn numel(shape: &[usize]) -> KernelResult<usize> {
    shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| KernelError::InvalidConfig(format!("shape {:?} overflows usize", shape)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_from_vec_checks_len() {
        let ok = Tensor::from_vec(vec![0.0f32; 6], &[1, 2, 3], Device::Cpu);
        assert!(ok.is_ok());
        let err = Tensor::from_vec(vec![0.0f32; 5], &[1, 2, 3], Device::Cpu).unwrap_err();
        assert!(matches!(err, KernelError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_full_rounds_to_dtype() {
        let t = Tensor::full(&[2, 2], 0.1, DType::BF16, Device::Cpu).unwrap();
        assert_eq!(t.dtype(), DType::BF16);
        let v = t.to_f32_vec();
        assert_eq!(v[0], bf16::from_f32(0.1).to_f32());
        assert!(v.iter().all(|&x| x == v[0]));
    }

    #[test]
    fn test_randn_is_seeded() {
        let a = Tensor::randn(&[4, 8], DType::F16, Device::Cpu, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Tensor::randn(&[4, 8], DType::F16, Device::Cpu, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.numel(), 32);
        assert!(a.as_slice::<f16>().is_some());
    }

    #[test]
    fn test_clone_is_deep() {
        let a = Tensor::full(&[3], 1.0, DType::F32, Device::Cpu).unwrap();
        let mut b = a.clone();
        if let TensorData::F32(v) = &mut b.data {
            v[0] = 9.0;
        }
        assert_eq!(a.to_f32_vec(), vec![1.0; 3]);
    }

    #[test]
    fn test_to_dtype() {
        let a = Tensor::full(&[2], 1.5, DType::F32, Device::Cpu).unwrap();
        let h = a.to_dtype(DType::F16);
        assert_eq!(h.dtype(), DType::F16);
        assert_eq!(h.shape(), a.shape());
        assert_eq!(h.to_f32_vec(), vec![1.5, 1.5]);
    }
}
