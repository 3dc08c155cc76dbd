//! Device selection for model backends

use anyhow::Result;
use serde::{Deserialize, Serialize};

#[cfg(feature = "candle")]
use candle_core::Device;

/// Device preference for the model backends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    Cuda,
    Metal,
    Cpu,
    #[default]
    Auto,
}

impl std::str::FromStr for DevicePreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "cuda" | "gpu" => Ok(Self::Cuda),
            "metal" => Ok(Self::Metal),
            "cpu" => Ok(Self::Cpu),
            "auto" => Ok(Self::Auto),
            _ => Err(anyhow::anyhow!(
                "Invalid device preference: {}. Valid options: cuda, metal, cpu, auto",
                s
            )),
        }
    }
}

impl std::fmt::Display for DevicePreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cuda => write!(f, "cuda"),
            Self::Metal => write!(f, "metal"),
            Self::Cpu => write!(f, "cpu"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Select a Candle device based on preference, falling back to CPU
///
/// An explicit GPU request that cannot be honoured logs a warning and uses the
/// CPU; `Auto` tries CUDA, then Metal, then the CPU.
#[cfg(feature = "candle")]
pub fn select_device(preference: DevicePreference) -> Result<Device> {
    let device = match preference {
        DevicePreference::Cpu => Device::Cpu,
        DevicePreference::Cuda => gpu(DevicePreference::Cuda).unwrap_or_else(|reason| {
            tracing::warn!("CUDA unavailable ({}), using CPU", reason);
            Device::Cpu
        }),
        DevicePreference::Metal => gpu(DevicePreference::Metal).unwrap_or_else(|reason| {
            tracing::warn!("Metal unavailable ({}), using CPU", reason);
            Device::Cpu
        }),
        DevicePreference::Auto => gpu(DevicePreference::Cuda)
            .or_else(|_| gpu(DevicePreference::Metal))
            .unwrap_or(Device::Cpu),
    };

    tracing::info!("Selected device: {:?}", device);
    Ok(device)
}

#[cfg(feature = "candle")]
fn gpu(kind: DevicePreference) -> std::result::Result<Device, String> {
    match kind {
        #[cfg(feature = "cuda")]
        DevicePreference::Cuda => Device::new_cuda(0).map_err(|e| e.to_string()),
        #[cfg(feature = "metal")]
        DevicePreference::Metal => Device::new_metal(0).map_err(|e| e.to_string()),
        other => Err(format!("not compiled with the '{}' feature", other)),
    }
}
