use anyhow::{Context, Result, anyhow};
use cpal::Device;
use cpal::traits::{DeviceTrait, HostTrait};

fn get_host() -> cpal::Host {
    cpal::default_host()
}

/// Finds the named input device, or the host's default one.
pub fn get_or_default_input(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    tracing::debug!("Host: {:?}", host.id());
    let Some(target) = device_name else {
        return host
            .default_input_device()
            .ok_or_else(|| anyhow!("No default input device"));
    };
    host.input_devices()
        .context("Failed to list input devices")?
        .find(|d| d.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow!("No input device named {target}"))
}

pub fn get_or_default_output(device_name: Option<String>) -> Result<Device> {
    let host = get_host();
    let Some(target) = device_name else {
        return host
            .default_output_device()
            .ok_or_else(|| anyhow!("No default output device"));
    };
    host.output_devices()
        .context("Failed to list output devices")?
        .find(|d| d.name().is_ok_and(|name| name == target))
        .ok_or_else(|| anyhow!("No output device named {target}"))
}

fn describe(device: &Device, config: Option<cpal::SupportedStreamConfig>, default: &str) -> String {
    let name = device.name().unwrap_or_else(|_| "<unnamed>".to_string());
    let mut line = match config {
        Some(cfg) => format!(" * {}({}ch, {}hz)", name, cfg.channels(), cfg.sample_rate().0),
        None => format!(" * {}", name),
    };
    if name == default {
        line.push_str(" [default]");
    }
    line
}

/// One line per input device, the default one marked.
pub fn get_available_inputs() -> Result<String> {
    let host = get_host();
    let default = host
        .default_input_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();
    let lines: Vec<String> = host
        .input_devices()
        .context("No input devices found")?
        .map(|d| {
            let config = d.default_input_config().ok();
            describe(&d, config, &default)
        })
        .collect();
    Ok(lines.join("\n"))
}

pub fn get_available_outputs() -> Result<String> {
    let host = get_host();
    let default = host
        .default_output_device()
        .and_then(|d| d.name().ok())
        .unwrap_or_default();
    let lines: Vec<String> = host
        .output_devices()
        .context("No output devices found")?
        .map(|d| {
            let config = d.default_output_config().ok();
            describe(&d, config, &default)
        })
        .collect();
    Ok(lines.join("\n"))
}
