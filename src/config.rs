use crate::common::Rotation;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Base name of the optional configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "landmark-lens";
/// Prefix for environment overrides, e.g. `LANDMARK_LENS__VISION__API_KEY`.
pub const ENV_PREFIX: &str = "LANDMARK_LENS";

pub const DEFAULT_VISION_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub log_level: String,
    pub trigger: TriggerConfiguration,
    pub camera: CameraConfiguration,
    pub vision: VisionConfiguration,
    pub presentation: PresentationConfiguration,
    pub channels: ChannelConfiguration,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            trigger: TriggerConfiguration::default(),
            camera: CameraConfiguration::default(),
            vision: VisionConfiguration::default(),
            presentation: PresentationConfiguration::default(),
            channels: ChannelConfiguration::default(),
        }
    }
}

impl Configuration {
    /// Defaults, then `landmark-lens.toml` if present, then `LANDMARK_LENS__*` variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::with_name(CONFIG_FILE_NAME).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    pub fn from_toml(contents: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(contents, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    Gpio,
    Keyboard,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TriggerConfiguration {
    pub kind: TriggerKind,
    pub gpio_line: u32,
    pub gpio_root: PathBuf,
    // Button pulls the line low when pressed.
    pub active_low: bool,
    pub poll_interval_ms: u64,
}

impl Default for TriggerConfiguration {
    fn default() -> Self {
        Self {
            kind: TriggerKind::Gpio,
            gpio_line: 21,
            gpio_root: PathBuf::from("/sys/class/gpio"),
            active_low: true,
            poll_interval_ms: 20,
        }
    }
}

impl TriggerConfiguration {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CameraConfiguration {
    pub image_path: PathBuf,
    pub rotation: Rotation,
}

impl Default for CameraConfiguration {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from("capture.jpg"),
            rotation: Rotation::Deg0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VisionConfiguration {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_results: u32,
    pub timeout_secs: u64,
}

impl Default for VisionConfiguration {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_VISION_ENDPOINT.to_string(),
            api_key: None,
            max_results: 10,
            timeout_secs: 30,
        }
    }
}

impl VisionConfiguration {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PresentationConfiguration {
    pub preview_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelConfiguration {
    pub trigger_buffer_size: usize,
    pub completion_buffer_size: usize,
}

impl Default for ChannelConfiguration {
    fn default() -> Self {
        Self {
            trigger_buffer_size: 16,
            completion_buffer_size: 8,
        }
    }
}
