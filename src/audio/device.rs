use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, SupportedStreamConfig};

use crate::types::SAMPLE_RATE;

/// Output device information
#[derive(Debug, Clone)]
pub struct AudioDeviceInfo {
    pub index: usize,
    pub name: String,
    pub is_default: bool,
    pub max_output_channels: usize,
    pub sample_rate: u32,
}

/// Get the default audio host
pub fn get_host() -> Host {
    cpal::default_host()
}

/// Get the default output device
pub fn get_default_output_device() -> Result<Device> {
    let host = get_host();
    host.default_output_device()
        .context("No default output device available")
}

fn device_name(device: &Device) -> Option<String> {
    device.description().ok().map(|desc| desc.name().to_string())
}

/// List all available output devices
pub fn list_output_devices() -> Result<Vec<AudioDeviceInfo>> {
    let host = get_host();
    let default_name = host.default_output_device().as_ref().and_then(device_name);

    let mut devices = Vec::new();

    for (index, device) in host.output_devices()?.enumerate() {
        let Some(name) = device_name(&device) else {
            continue;
        };
        let is_default = Some(&name) == default_name.as_ref();

        let (max_channels, sample_rate) = match device.default_output_config() {
            Ok(cfg) => (cfg.channels() as usize, cfg.sample_rate()),
            Err(_) => (0, 0),
        };

        devices.push(AudioDeviceInfo {
            index,
            name,
            is_default,
            max_output_channels: max_channels,
            sample_rate,
        });
    }

    Ok(devices)
}

/// Get the output configuration with the maximum number of channels.
/// Falls back to the default config if supported configs can't be queried.
pub fn get_max_channels_output_config(device: &Device) -> Result<SupportedStreamConfig> {
    match device.supported_output_configs() {
        Ok(configs) => {
            let mut max_config: Option<SupportedStreamConfig> = None;
            let mut max_channels: u16 = 0;

            for config_range in configs {
                let channels = config_range.channels();
                if channels > max_channels {
                    max_channels = channels;
                    // Prefer 48kHz, otherwise the lowest supported rate
                    let sample_rate = if config_range.min_sample_rate() <= SAMPLE_RATE
                        && SAMPLE_RATE <= config_range.max_sample_rate()
                    {
                        SAMPLE_RATE
                    } else {
                        config_range.min_sample_rate()
                    };
                    max_config = Some(config_range.with_sample_rate(sample_rate));
                }
            }

            max_config.context("No supported output configurations found")
        }
        Err(_) => device
            .default_output_config()
            .context("Failed to get default output config"),
    }
}

/// Get output device by name (case-insensitive substring match)
pub fn get_device_by_name(name: &str) -> Result<Device> {
    let host = get_host();
    let name_lower = name.to_lowercase();

    for device in host.output_devices()? {
        if device_name(&device).is_some_and(|n| n.to_lowercase().contains(&name_lower)) {
            return Ok(device);
        }
    }

    anyhow::bail!("Output device '{}' not found", name)
}

/// Get output device by index (as printed by `--list-devices`)
pub fn get_device_by_index(index: usize) -> Result<Device> {
    let host = get_host();
    let devices: Vec<Device> = host.output_devices()?.collect();

    if index >= devices.len() {
        anyhow::bail!(
            "Device index {} out of range (found {} devices)",
            index,
            devices.len()
        );
    }

    Ok(devices[index].clone())
}

/// Resolve a configured device selector: a numeric index, a name, or the
/// system default when absent
pub fn resolve_output_device(selector: Option<&str>) -> Result<Device> {
    match selector.map(str::trim).filter(|s| !s.is_empty()) {
        None => get_default_output_device(),
        Some(s) => match s.parse::<usize>() {
            Ok(index) => get_device_by_index(index),
            Err(_) => get_device_by_name(s),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // This test may fail on systems without audio devices
        if let Ok(devices) = list_output_devices() {
            println!("Found {} output devices", devices.len());
            for device in devices {
                println!(
                    "  {}: {} ({}ch @ {}Hz) {}",
                    device.index,
                    device.name,
                    device.max_output_channels,
                    device.sample_rate,
                    if device.is_default { "[DEFAULT]" } else { "" }
                );
            }
        }
    }

    #[test]
    fn test_get_default_device() {
        // This test may fail on systems without audio devices
        if let Ok(device) = resolve_output_device(None) {
            println!("Default output device: {:?}", device_name(&device));
        }
    }

    #[test]
    fn test_index_out_of_range() {
        if let Ok(devices) = list_output_devices() {
            assert!(get_device_by_index(devices.len() + 100).is_err());
        }
    }
}
