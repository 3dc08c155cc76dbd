//! Shared plumbing for the pretrained-model backends
//!
//! Device preference is always available (it is part of the configuration);
//! device selection and Hub access need the `candle` feature.

pub mod device;

#[cfg(feature = "candle")]
pub mod hub;

pub use device::DevicePreference;

#[cfg(feature = "candle")]
pub use device::select_device;

#[cfg(feature = "candle")]
pub use hub::{ModelFiles, ModelLoader};
