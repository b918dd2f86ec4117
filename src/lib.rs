//! bias-relu-kernels: fused bias + ReLU inference kernels and the harness
//! that grades them.
//!
//! This crate provides:
//! - **Fused kernels**: `relu(x + bias)` in one pass for fp16/bf16/fp32,
//!   ISA-dispatched at runtime (AVX2/F16C or scalar) and row-parallel
//! - **Fallback kernels**: the same op composed from unfused bias add and ReLU
//! - **Reference evaluator**: upcast to f32, add, ReLU, downcast
//! - **Correctness harness**: parameter grid, tolerance comparison, skip-aware
//!   provider loading
//!
//! # Quick Start
//!
//! ```no_run
//! use bias_relu_kernels::{Harness, HarnessConfig, ProviderRegistry};
//!
//! let harness = Harness::prepare(ProviderRegistry::global(), HarnessConfig::default())?;
//! for result in harness.run_grid() {
//!     result?.ensure_passed()?;
//! }
//! # Ok::<(), bias_relu_kernels::KernelError>(())
//! ```

pub mod cpu_kernels;
pub mod harness;
pub mod ops;
pub mod provider;
pub mod reference;
pub mod runtime_detection;
pub mod tensor;
pub mod traits;
pub mod types;
pub mod validation;

pub use harness::{Check, CheckOutcome, GridSummary, Harness, HarnessConfig, Trial, TrialGrid, TrialReport};
pub use provider::{
    FallbackInferenceOps, FusedInferenceOps, InferenceOps, ProviderKind, ProviderRegistry,
};
pub use reference::{bias_relu_reference, bias_relu_reference_f32};
pub use runtime_detection::{default_device, detect_device, device_name, supported_dtypes, DeviceInfo};
pub use tensor::{Device, Tensor, TensorData};
pub use traits::Element;
pub use types::{DType, KernelError, KernelResult};
pub use validation::{allclose, compare, CloseReport, Tolerance, ToleranceTable};
