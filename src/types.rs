//! Core types shared by the kernels, the reference path and the harness.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Data type for tensor elements.
///
/// This is a closed set: every provider must implement one entry point per
/// variant, so adding a precision is checked at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DType {
    #[serde(rename = "fp16")]
    F16,
    #[serde(rename = "bf16")]
    BF16,
    #[serde(rename = "fp32")]
    F32,
}

impl DType {
    /// All element types the kernels know about, lowest precision first.
    pub const ALL: [DType; 3] = [DType::F16, DType::BF16, DType::F32];

    /// Kernel-suffix name (`bias_relu_<name>`).
    pub const fn name(self) -> &'static str {
        match self {
            Self::F16 => "fp16",
            Self::BF16 => "bf16",
            Self::F32 => "fp32",
        }
    }

    /// Size in bytes per element.
    pub const fn size_bytes(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F16 | Self::BF16 => 2,
        }
    }

    /// Element ID matching `Element::ELEM_ID`.
    pub const fn elem_id(self) -> u8 {
        match self {
            Self::F32 => 0,
            Self::F16 => 1,
            Self::BF16 => 2,
        }
    }

    /// Parse a kernel-suffix name (`fp16`, `bf16`, `fp32`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "fp16" => Some(Self::F16),
            "bf16" => Some(Self::BF16),
            "fp32" => Some(Self::F32),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors from kernel providers, the comparator and the harness.
#[derive(Debug, Error)]
pub enum KernelError {
    /// The provider cannot supply a kernel on this host. Callers skip, not fail.
    #[error("provider {provider} unavailable: {reason}")]
    Unavailable { provider: &'static str, reason: String },
    /// A kernel output fell outside tolerance of the reference.
    #[error(
        "{provider} mismatch for {trial}: {mismatches} element(s) out of tolerance, max |diff| = {max_abs_diff}"
    )]
    NumericMismatch {
        trial: String,
        provider: &'static str,
        max_abs_diff: f32,
        mismatches: usize,
    },
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },
    #[error("dtype mismatch: expected {expected}, got {got}")]
    DTypeMismatch { expected: DType, got: DType },
    #[error("device mismatch: expected {expected}, got {got}")]
    DeviceMismatch { expected: String, got: String },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KernelError {
    /// True for the capability error that should turn into a skip.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }

    pub(crate) fn shape(expected: impl fmt::Debug, got: impl fmt::Debug) -> Self {
        Self::ShapeMismatch {
            expected: format!("{expected:?}"),
            got: format!("{got:?}"),
        }
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
