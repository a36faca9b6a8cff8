use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub grading: GradingConfig,
    pub transcription: TranscriptionConfig,
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the dispatcher store.
    pub data_dir: PathBuf,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    /// Grading service base URL.
    pub endpoint: String,
    /// API key (or set CALLGRADE_API_KEY). Empty means unauthenticated.
    pub api_key: String,
    /// Request timeout for one grading call in seconds.
    pub timeout_secs: u64,
}

impl fmt::Debug for GradingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GradingConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Transcription service base URL (archive forwarding, transcript fetch).
    pub endpoint: String,
    /// Request timeout for archive uploads in seconds.
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Polling interval of the playback sync loop in milliseconds.
    pub tick_interval_ms: u64,
}

// --- Default implementations ---

impl Default for StorageConfig {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callgrade");
        Self { data_dir }
    }
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5001".to_string(),
            api_key: String::new(),
            timeout_secs: 300,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:5001".to_string(),
            timeout_secs: 300,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { tick_interval_ms: 100 }
    }
}

// --- Config loading ---

impl Config {
    /// Load config and return the resolved file path (if any).
    pub fn load_with_path(path: Option<&Path>) -> anyhow::Result<(Self, Option<PathBuf>)> {
        // 1. Check explicit path
        if let Some(p) = path {
            let content = std::fs::read_to_string(p).map_err(|e| {
                anyhow::anyhow!("Failed to read config file {}: {}", p.display(), e)
            })?;
            let config: Config = toml::from_str(&content)?;
            return Ok((config, Some(p.to_path_buf())));
        }

        // 2. Check beside the executable
        if let Ok(exe_path) = std::env::current_exe() {
            let beside_exe = exe_path.parent().map(|p| p.join("callgrade.toml"));
            if let Some(p) = beside_exe {
                if p.exists() {
                    let content = std::fs::read_to_string(&p)?;
                    let config: Config = toml::from_str(&content)?;
                    return Ok((config, Some(p)));
                }
            }
        }

        // 3. Check platform config directory (e.g. ~/.config/callgrade/config.toml)
        if let Some(config_dir) = dirs::config_dir() {
            let platform_config = config_dir.join("callgrade").join("config.toml");
            if platform_config.exists() {
                let content = std::fs::read_to_string(&platform_config)?;
                let config: Config = toml::from_str(&content)?;
                return Ok((config, Some(platform_config)));
            }
        }

        // 4. Fall back to defaults
        tracing::info!("No config file found, using defaults");
        Ok((Config::default(), None))
    }

    /// Load config (without tracking the resolved path).
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_with_path(path).map(|(config, _)| config)
    }

    /// Generate a default config file with all fields and inline documentation.
    pub fn generate_default_commented() -> String {
        let default_data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("callgrade");
        let data_dir_str = default_data_dir.to_string_lossy().replace('\\', "\\\\");

        format!(
            r#"# callgrade configuration
# Edit this file to customize storage, grading, and playback settings.

[storage]
# Directory where the dispatcher store is kept.
data_dir = "{data_dir}"

[grading]
# Base URL of the transcript grading service.
endpoint = "http://localhost:5001"
# API key (or set CALLGRADE_API_KEY environment variable).
# Leave empty for an unauthenticated local service.
# api_key = ""
# Request timeout for a single grading call in seconds.
# AI grading of a long transcript can take minutes.
timeout_secs = 300

[transcription]
# Base URL of the transcription service (zip archive uploads and
# transcript fetch by id).
endpoint = "http://localhost:5001"
# Request timeout for archive uploads in seconds.
timeout_secs = 300

[playback]
# Polling interval of the playback sync loop in milliseconds.
tick_interval_ms = 100
"#,
            data_dir = data_dir_str
        )
    }
}
