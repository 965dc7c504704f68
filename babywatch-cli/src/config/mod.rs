use anyhow::{Context, Result};
use babywatch_engine::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub replay: ReplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Directory for annotated snapshots; snapshots are off when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_dir: Option<PathBuf>,

    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,

    #[serde(default)]
    pub record_audio: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,

    #[serde(default = "default_frame_height")]
    pub frame_height: u32,

    #[serde(default = "default_chunk_ms")]
    pub audio_chunk_ms: u32,
}

// Default value functions
fn default_audio_dir() -> PathBuf {
    PathBuf::from("recordings")
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    480
}

fn default_chunk_ms() -> u32 {
    20
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: None,
            audio_dir: default_audio_dir(),
            record_audio: false,
        }
    }
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            audio_chunk_ms: default_chunk_ms(),
        }
    }
}

impl CliConfig {
    /// Get default config file path (<config dir>/babywatch/config.toml)
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not find configuration directory")?;
        Ok(dir.join("babywatch").join("config.toml"))
    }

    /// Resolve an explicit path or fall back to the default location
    pub fn resolve_path(path: Option<&Path>) -> Result<PathBuf> {
        match path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::default_path(),
        }
    }

    /// Load configuration, using defaults when the file does not exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_file = Self::resolve_path(path)?;

        if !config_file.exists() {
            tracing::info!("Config file not found at {}, using defaults", config_file.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_file)
            .with_context(|| format!("Failed to read config file {}", config_file.display()))?;
        let config: CliConfig = toml::from_str(&contents).context("Failed to parse config file")?;

        config.analyzer.validate().context("Invalid analyzer configuration")?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}
