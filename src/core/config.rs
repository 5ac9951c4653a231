//! Configuration management for Stepguide.
//!
//! Handles loading configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::input::{CommandSpeech, InputMode, DEFAULT_VOICE_SENTINEL};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// File locations
    pub paths: PathsConfig,

    /// Voice input settings
    pub voice: VoiceConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Input mode a session starts in
    pub input_mode: InputMode,

    /// Typed answer that switches to voice input
    pub voice_sentinel: String,

    /// Whether a resumed run asks for the prerequisites again
    pub reconfirm_prerequisites_on_resume: bool,
}

/// File locations. `~` is expanded.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Procedure library file (JSON or YAML)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedures: Option<String>,

    /// Directory holding checkpoint files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saves_dir: Option<String>,
}

/// Voice input settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Whether voice input is available at all
    pub enabled: bool,

    /// Shell command that streams recorded audio to stdout (`{rate}` is substituted)
    pub record_command: String,

    /// Shell command that prints the transcript of `{file}`
    pub transcribe_command: String,

    /// Recording sample rate in Hz
    pub sample_rate: u32,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.stepguide.toml` in current directory
    /// 2. `~/.config/stepguide/config.toml`
    /// 3. Falls back to defaults
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".stepguide.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Some(config_dir) = Self::config_dir() {
            let global_config = config_dir.join("config.toml");
            if global_config.exists() {
                return Self::load_from_file(&global_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read config {}: {e}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        tracing::debug!(path = ?path, "Loaded configuration");
        Ok(config)
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("stepguide"))
    }

    /// Get the data directory path (procedures, saves).
    pub fn data_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|d| d.join("stepguide"))
    }

    /// Resolved procedure library path.
    pub fn procedures_path(&self) -> PathBuf {
        self.paths.procedures.as_deref().map(expand_path).unwrap_or_else(|| {
            Self::data_dir()
                .map(|d| d.join("procedures.json"))
                .unwrap_or_else(|| PathBuf::from("procedures.json"))
        })
    }

    /// Resolved checkpoint directory.
    pub fn saves_dir(&self) -> PathBuf {
        self.paths.saves_dir.as_deref().map(expand_path).unwrap_or_else(|| {
            Self::data_dir()
                .map(|d| d.join("saves"))
                .unwrap_or_else(|| PathBuf::from(".stepguide/saves"))
        })
    }

    /// Voice backend described by this configuration, if enabled.
    pub fn speech(&self) -> Option<CommandSpeech> {
        if !self.voice.enabled {
            return None;
        }
        Some(CommandSpeech::new(
            self.voice.record_command.clone(),
            self.voice.transcribe_command.clone(),
            self.voice.sample_rate,
        ))
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            input_mode: InputMode::Text,
            voice_sentinel: DEFAULT_VOICE_SENTINEL.to_string(),
            reconfirm_prerequisites_on_resume: false,
        }
    }
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            record_command: "arecord -q -f S16_LE -c 1 -r {rate} -t wav -".to_string(),
            transcribe_command: "whisper-cli -nt -np -f {file}".to_string(),
            sample_rate: 16000,
        }
    }
}

fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}
