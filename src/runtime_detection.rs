//! Runtime device detection with caching.

use std::sync::OnceLock;

use serde::Serialize;

use crate::cpu_kernels::{get_isa_level, IsaLevel};
use crate::tensor::Device;
use crate::types::DType;

/// Snapshot of what the host can run, computed once per process.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceInfo {
    pub device: &'static str,
    pub isa: IsaLevel,
    pub supported_dtypes: Vec<DType>,
    pub hostname: String,
}

/// Cached detection result.
static DEVICE_INFO: OnceLock<DeviceInfo> = OnceLock::new();

/// Detect the host device.
///
/// The first call probes the CPU; later calls return the cached result.
pub fn detect_device() -> &'static DeviceInfo {
    DEVICE_INFO.get_or_init(|| {
        let isa = get_isa_level();
        let info = DeviceInfo {
            device: Device::Cpu.name(),
            isa,
            supported_dtypes: probe_dtypes(),
            hostname: hostname(),
        };
        log::info!(
            "Detected device {} (isa={:?}, dtypes={:?})",
            info.device,
            info.isa,
            info.supported_dtypes
        );
        info
    })
}

/// Device that harness tensors are placed on.
pub fn default_device() -> Device {
    Device::Cpu
}

/// Name of the compute device (`"cpu"`).
pub fn device_name() -> &'static str {
    detect_device().device
}

/// Element types the kernels can be graded on for this host.
///
/// fp16 and fp32 are always present; bf16 is appended when supported.
pub fn supported_dtypes() -> Vec<DType> {
    detect_device().supported_dtypes.clone()
}

/// bf16 support. On CPU this is a software conversion, so always true.
pub fn is_bf16_supported() -> bool {
    detect_device().supported_dtypes.contains(&DType::BF16)
}

fn probe_dtypes() -> Vec<DType> {
    // bf16 <-> f32 is a 16-bit shift on every CPU.
    vec![DType::F16, DType::F32, DType::BF16]
}

/// Get system hostname.
fn hostname() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| {
        std::env::var("COMPUTERNAME").unwrap_or_else(|_| "unknown".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detection_is_cached() {
        let a = detect_device() as *const DeviceInfo;
        let b = detect_device() as *const DeviceInfo;
        assert_eq!(a, b);
    }

    #[test]
    fn test_supported_dtypes_order() {
        let dtypes = supported_dtypes();
        assert_eq!(&dtypes[..2], &[DType::F16, DType::F32]);
        assert_eq!(is_bf16_supported(), dtypes.contains(&DType::BF16));
    }

    #[test]
    fn test_device_name() {
        assert_eq!(device_name(), "cpu");
        assert_eq!(default_device(), Device::Cpu);
    }
}
