//! Execution-device probe.
//!
//! Runs once at startup. The result is handed unchanged to every adapter.

#[cfg(feature = "nvml")]
use nvml_wrapper::Nvml;
use tracing::info;
#[cfg(feature = "nvml")]
use tracing::warn;

use crate::adapter::Device;

pub const AUTO: &str = "auto";

/// Decide the device hint. `auto` (or an empty value) probes for a GPU; any
/// other value is taken as-is.
pub fn probe(requested: &str) -> Device {
    let requested = requested.trim();
    if requested.is_empty() || requested.eq_ignore_ascii_case(AUTO) {
        let device = detect();
        info!("Auto-detected device: {}", device);
        return device;
    }

    let device = Device::new(requested.to_lowercase());
    info!("Using configured device: {}", device);
    device
}

#[cfg(feature = "nvml")]
fn detect() -> Device {
    match Nvml::init() {
        Ok(nvml) => match nvml.device_count() {
            Ok(count) if count > 0 => {
                if let Ok(gpu) = nvml.device_by_index(0) {
                    if let Ok(name) = gpu.name() {
                        info!("Found {} GPU(s), first: {}", count, name);
                    }
                }
                Device::cuda()
            }
            Ok(_) => Device::cpu(),
            Err(e) => {
                warn!("Failed to count GPUs, using cpu: {}", e);
                Device::cpu()
            }
        },
        Err(_) => Device::cpu(),
    }
}

#[cfg(not(feature = "nvml"))]
fn detect() -> Device {
    Device::cpu()
}
