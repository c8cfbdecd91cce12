use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::haptic::SignalType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_latency_ms")]
    pub latency_ms: f32,
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
}

impl AudioConfig {
    fn default_latency_ms() -> f32 {
        50.0
    }
    fn default_sample_rate() -> u32 {
        48_000
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            latency_ms: Self::default_latency_ms(),
            sample_rate: Self::default_sample_rate(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateConfig {
    #[serde(default = "PlateConfig::default_sensor_rate_hz")]
    pub sensor_rate_hz: f32,
}

impl PlateConfig {
    fn default_sensor_rate_hz() -> f32 {
        60.0
    }
}

impl Default for PlateConfig {
    fn default() -> Self {
        Self {
            sensor_rate_hz: Self::default_sensor_rate_hz(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationConfig {
    #[serde(default = "CompensationConfig::default_harmonics")]
    pub harmonics: usize,
    #[serde(default = "CompensationConfig::default_step_size")]
    pub step_size: f32,
    #[serde(default)]
    pub use_notch: bool,
}

impl CompensationConfig {
    fn default_harmonics() -> usize {
        3
    }
    fn default_step_size() -> f32 {
        0.5
    }
}

impl Default for CompensationConfig {
    fn default() -> Self {
        Self {
            harmonics: Self::default_harmonics(),
            step_size: Self::default_step_size(),
            use_notch: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SignalSetting {
    Sine,
    BandNoise,
    Snow,
}

impl Default for SignalSetting {
    fn default() -> Self {
        Self::Sine
    }
}

impl From<SignalSetting> for SignalType {
    fn from(s: SignalSetting) -> Self {
        match s {
            SignalSetting::Sine => SignalType::Sine,
            SignalSetting::BandNoise => SignalType::BandNoise,
            SignalSetting::Snow => SignalType::Snow,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HapticConfig {
    #[serde(default = "HapticConfig::default_frequency_hz")]
    pub frequency_hz: f32,
    #[serde(default = "HapticConfig::default_amplitude")]
    pub amplitude: f32,
    #[serde(default)]
    pub signal: SignalSetting,
    #[serde(default = "HapticConfig::default_velocity")]
    pub velocity: f32,
    #[serde(default = "HapticConfig::default_noise_bandwidth_hz")]
    pub noise_bandwidth_hz: f32,
}

impl HapticConfig {
    fn default_frequency_hz() -> f32 {
        40.0
    }
    fn default_amplitude() -> f32 {
        0.5
    }
    fn default_velocity() -> f32 {
        0.5
    }
    fn default_noise_bandwidth_hz() -> f32 {
        20.0
    }
}

impl Default for HapticConfig {
    fn default() -> Self {
        Self {
            frequency_hz: Self::default_frequency_hz(),
            amplitude: Self::default_amplitude(),
            signal: SignalSetting::default(),
            velocity: Self::default_velocity(),
            noise_bandwidth_hz: Self::default_noise_bandwidth_hz(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub plate: PlateConfig,
    #[serde(default)]
    pub compensation: CompensationConfig,
    #[serde(default)]
    pub haptic: HapticConfig,
}

impl AppConfig {
    /// Read the TOML config at `path`; fall back to defaults on a missing
    /// or malformed file. A missing file is written back as commented
    /// defaults so the knobs are discoverable.
    pub fn load_or_default(path: &str) -> Self {
        let path_obj = Path::new(path);
        if path_obj.exists() {
            match fs::read_to_string(path_obj) {
                Ok(contents) => match toml::from_str(&contents) {
                    Ok(cfg) => return cfg,
                    Err(err) => {
                        warn!("Failed to parse config {path}: {err}. Using defaults.");
                    }
                },
                Err(err) => {
                    warn!("Failed to read config {path}: {err}. Using defaults.");
                }
            }
            return Self::default();
        }

        let default_cfg = Self::default();
        match toml::to_string_pretty(&default_cfg) {
            Ok(text) => {
                let mut commented = String::new();
                for line in text.lines() {
                    let trimmed = line.trim();
                    if trimmed.is_empty() || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
                        commented.push_str(line);
                    } else {
                        commented.push_str("# ");
                        commented.push_str(line);
                    }
                    commented.push('\n');
                }
                if let Err(err) = fs::write(path_obj, commented) {
                    warn!("Failed to write default config to {path}: {err}");
                }
            }
            Err(err) => {
                warn!("Failed to serialize default config: {err}");
            }
        }
        default_cfg
    }
}
