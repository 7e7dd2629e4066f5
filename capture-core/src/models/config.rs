use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::device_models::{DevicePosition, FlashMode, QualityPreset, StabilizationMode};
use super::error::CaptureError;

/// Desired capture configuration for the hardware session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub position: DevicePosition,
    pub flash_mode: FlashMode,
    pub preset: QualityPreset,
    pub stabilization: StabilizationMode,
}

/// Configuration for a recording controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfiguration {
    #[serde(flatten)]
    pub session: SessionConfig,

    /// Maximum recording duration in seconds (default: 60).
    pub max_duration_secs: f64,

    /// Duration timer granularity in milliseconds (default: 100).
    pub tick_interval_ms: u64,

    /// Directory where per-session container files are allocated.
    pub output_directory: PathBuf,

    /// Container file extension, without the dot (default: "mov").
    pub file_extension: String,
}

impl CaptureConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !self.max_duration_secs.is_finite() || self.max_duration_secs <= 0.0 {
            return Err(format!("max duration must be positive: {}", self.max_duration_secs));
        }
        if self.tick_interval_ms == 0 {
            return Err("tick interval must be non-zero".into());
        }
        if self.tick_interval() >= self.max_duration() {
            return Err("tick interval must be shorter than the max duration".into());
        }
        if self.file_extension.is_empty() || self.file_extension.contains('.') {
            return Err(format!("invalid file extension: {:?}", self.file_extension));
        }
        Ok(())
    }

    pub fn max_duration(&self) -> Duration {
        Duration::from_secs_f64(self.max_duration_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&json).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }
}

impl Default for CaptureConfiguration {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            max_duration_secs: 60.0,
            tick_interval_ms: 100,
            output_directory: std::env::temp_dir(),
            file_extension: "mov".into(),
        }
    }
}
