use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{BufferSize, Device, Host, StreamConfig};

pub fn input_device_names(host: &Host) -> Vec<String> {
    let mut devices = Vec::new();

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(name) = device.name() {
                devices.push(name);
            }
        }
    }

    devices
}

/// Index of the host's default input within `devices`, or 0.
pub fn default_input_index(host: &Host, devices: &[String]) -> usize {
    host.default_input_device()
        .and_then(|device| device.name().ok())
        .and_then(|name| devices.iter().position(|d| *d == name))
        .unwrap_or(0)
}

/// Input device by exact name, falling back to the default input when no
/// name is given.
pub fn find_input_device(host: &Host, name: Option<&str>) -> Option<Device> {
    let Some(name) = name else {
        return host.default_input_device();
    };

    if let Ok(input_devices) = host.input_devices() {
        for device in input_devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Some(device);
                }
            }
        }
    }

    None
}

pub fn create_stream_config(channels: u16, sample_rate: cpal::SampleRate) -> StreamConfig {
    StreamConfig {
        channels,
        sample_rate,
        buffer_size: BufferSize::Default,
    }
}
