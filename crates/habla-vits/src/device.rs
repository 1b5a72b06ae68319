//! Compute device selection.
//!
//! Auto mode probes Metal, then CUDA, then falls back to CPU. Forcing a
//! device that is unavailable is a hard error so misconfigured deployments
//! fail at startup instead of silently running on the wrong hardware.

use std::str::FromStr;

use candle_core::Device;
use tracing::{info, warn};

use habla_core::{TtsError, TtsResult};

/// Device preference for model loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePreference {
    /// Probe for the best available device.
    #[default]
    Auto,
    /// Force CPU.
    Cpu,
    /// Force CUDA (NVIDIA).
    Cuda,
    /// Force Metal (Apple Silicon).
    Metal,
}

impl FromStr for DevicePreference {
    type Err = TtsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" | "nvidia" => Ok(Self::Cuda),
            "metal" | "mps" => Ok(Self::Metal),
            other => Err(TtsError::config(format!("unknown device: {other}"))),
        }
    }
}

impl DevicePreference {
    /// Select a device according to the preference.
    pub fn select(self) -> TtsResult<Device> {
        match self {
            Self::Cpu => {
                info!("using CPU device (forced)");
                Ok(Device::Cpu)
            }
            Self::Cuda => cuda(),
            Self::Metal => metal(),
            Self::Auto => Ok(auto()),
        }
    }
}

/// Probe Metal, then CUDA, then fall back to CPU.
fn auto() -> Device {
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(device) => {
            info!("auto-selected Metal GPU");
            return device;
        }
        Err(e) => warn!("Metal GPU not available: {e}"),
    }

    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(device) => {
            info!("auto-selected CUDA GPU");
            return device;
        }
        Err(e) => warn!("CUDA GPU not available: {e}"),
    }

    info!("using CPU device (no GPU available)");
    Device::Cpu
}

fn cuda() -> TtsResult<Device> {
    #[cfg(feature = "cuda")]
    {
        Device::new_cuda(0).map_err(|e| {
            TtsError::config(format!("CUDA GPU requested but not available: {e}"))
        })
    }

    #[cfg(not(feature = "cuda"))]
    Err(TtsError::config(
        "CUDA GPU requested but the 'cuda' feature is not enabled; \
         rebuild with: cargo build --features cuda",
    ))
}

fn metal() -> TtsResult<Device> {
    #[cfg(feature = "metal")]
    {
        Device::new_metal(0).map_err(|e| {
            TtsError::config(format!("Metal GPU requested but not available: {e}"))
        })
    }

    #[cfg(not(feature = "metal"))]
    Err(TtsError::config(
        "Metal GPU requested but the 'metal' feature is not enabled; \
         rebuild with: cargo build --features metal",
    ))
}

/// Short device label for logs and the info endpoint.
pub fn device_label(device: &Device) -> &'static str {
    match device {
        Device::Cpu => "cpu",
        Device::Cuda(_) => "cuda",
        Device::Metal(_) => "metal",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preference_parsing() {
        assert_eq!("cpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cpu);
        assert_eq!("CUDA".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("gpu".parse::<DevicePreference>().unwrap(), DevicePreference::Cuda);
        assert_eq!("mps".parse::<DevicePreference>().unwrap(), DevicePreference::Metal);
        assert_eq!("auto".parse::<DevicePreference>().unwrap(), DevicePreference::Auto);
        assert!("tpu".parse::<DevicePreference>().is_err());
    }

    #[test]
    fn test_select_cpu() {
        let device = DevicePreference::Cpu.select().unwrap();
        assert!(matches!(device, Device::Cpu));
    }

    #[test]
    fn test_select_auto_never_fails() {
        let device = DevicePreference::Auto.select().unwrap();
        assert!(matches!(device, Device::Cpu | Device::Cuda(_) | Device::Metal(_)));
    }

    #[test]
    fn test_device_label() {
        assert_eq!(device_label(&Device::Cpu), "cpu");
    }
}
