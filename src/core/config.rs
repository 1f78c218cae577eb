use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const GENERATE_STORY_PATH: &str = "/api/generate-story";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_output")]
    pub output_folder: String,

    #[serde(default = "default_duration")]
    pub default_duration: u32,

    #[serde(default = "default_download_prefix")]
    pub download_prefix: String,

    #[serde(default)]
    pub timings: Timings,
}

/// Delays driving the cosmetic parts of the page, in milliseconds.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Timings {
    #[serde(default = "default_step_dwell")]
    pub step_dwell_ms: u64,
    #[serde(default = "default_error_auto_hide")]
    pub error_auto_hide_ms: u64,
    #[serde(default = "default_autoplay_delay")]
    pub autoplay_delay_ms: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_output() -> String {
    "output".to_string()
}
fn default_duration() -> u32 {
    3
}
fn default_download_prefix() -> String {
    "narrate-ai-story".to_string()
}
fn default_step_dwell() -> u64 {
    2000
}
fn default_error_auto_hide() -> u64 {
    5000
}
fn default_autoplay_delay() -> u64 {
    1000
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            step_dwell_ms: default_step_dwell(),
            error_auto_hide_ms: default_error_auto_hide(),
            autoplay_delay_ms: default_autoplay_delay(),
        }
    }
}

impl Timings {
    pub fn step_dwell(&self) -> Duration {
        Duration::from_millis(self.step_dwell_ms)
    }

    pub fn error_auto_hide(&self) -> Duration {
        Duration::from_millis(self.error_auto_hide_ms)
    }

    pub fn autoplay_delay(&self) -> Duration {
        Duration::from_millis(self.autoplay_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            output_folder: default_output(),
            default_duration: default_duration(),
            download_prefix: default_download_prefix(),
            timings: Timings::default(),
        }
    }
}

impl Config {
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml_ng::from_str(content).context("Failed to parse config.yml")
    }

    /// Reads `path` if it exists, otherwise returns the defaults.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load_or_default(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using default settings", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.output_folder)
            .with_context(|| format!("Failed to create {}", self.output_folder))?;
        Ok(())
    }

    pub fn base(&self) -> Result<Url> {
        Url::parse(&self.base_url).with_context(|| format!("Invalid base_url: {}", self.base_url))
    }

    pub fn endpoint(&self) -> Result<Url> {
        let endpoint = self
            .base()?
            .join(GENERATE_STORY_PATH)
            .context("Failed to build generate-story endpoint")?;
        Ok(endpoint)
    }
}
