use crate::error::{CoreError, Result};
use crate::paths::DEFAULT_SHARED_MEMORY_PATH;
use crate::poller::DEFAULT_POLL_INTERVAL_MS;
use const_format::concatcp;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NowLyricConfig {
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Upper bound for a single bus round trip
    #[serde(default = "default_bus_timeout")]
    pub bus_timeout_ms: u64,
    /// Upper bound for probing a track's duration
    #[serde(default = "default_probe_timeout")]
    pub probe_timeout_ms: u64,
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

const fn default_bus_timeout() -> u64 {
    2000
}

const fn default_probe_timeout() -> u64 {
    5000
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            bus_timeout_ms: default_bus_timeout(),
            probe_timeout_ms: default_probe_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Wrap played/unplayed parts in Pango `<span>` markup
    #[serde(default)]
    pub rich_text: bool,
    /// Show only the text after the first double space
    #[serde(default)]
    pub only_translation: bool,
    /// Prefix output with `<executor.markup.true>` for the Executor GNOME extension
    #[serde(default)]
    pub support_execute: bool,
    #[serde(default = "default_text_color")]
    pub played_text_color: String,
    #[serde(default = "default_text_color")]
    pub unplayed_text_color: String,
    /// Added to line progress before splitting played from unplayed text
    #[serde(default = "default_progress_offset")]
    pub progress_offset: f64,
    /// Also write each rendered line to this file
    #[serde(default)]
    pub output_path: Option<PathBuf>,
    /// Publish rendered lines in a fixed-size shared buffer
    #[serde(default)]
    pub shared_memory: bool,
    #[serde(default = "default_shared_memory_path")]
    pub shared_memory_path: PathBuf,
    #[serde(default = "default_shared_memory_size")]
    pub shared_memory_size: usize,
    /// Written to the shared buffer at start-up
    #[serde(default)]
    pub default_content: String,
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

const fn default_progress_offset() -> f64 {
    0.05
}

fn default_shared_memory_path() -> PathBuf {
    PathBuf::from(DEFAULT_SHARED_MEMORY_PATH)
}

const fn default_shared_memory_size() -> usize {
    1024
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            rich_text: false,
            only_translation: false,
            support_execute: false,
            played_text_color: default_text_color(),
            unplayed_text_color: default_text_color(),
            progress_offset: default_progress_offset(),
            output_path: None,
            shared_memory: false,
            shared_memory_path: default_shared_memory_path(),
            shared_memory_size: default_shared_memory_size(),
            default_content: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Also write logs to ~/.cache/nowlyric/nowlyric.log
    #[serde(default)]
    pub enabled: bool,
}

impl NowLyricConfig {
    /// Get the config file path (~/.config/nowlyric/config.toml)
    #[must_use]
    pub fn config_path() -> PathBuf {
        crate::paths::config_path()
    }

    /// Load config from the default path, creating a template on first run
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read or parsed.
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_at(&Self::config_path())
    }

    /// Load config from `config_path`, creating a template there if it is missing
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ConfigNotFound`] after writing the template, or an
    /// error if the file cannot be read or parsed.
    pub fn load_or_create_at(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            // Create config directory if it doesn't exist
            if let Some(parent) = config_path.parent() {
                fs::create_dir_all(parent)?;
            }

            fs::write(config_path, CONFIG_TEMPLATE)?;

            return Err(CoreError::ConfigNotFound {
                path: config_path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(config_path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Written to the config path on first run
pub const CONFIG_TEMPLATE: &str = concatcp!(
    r#"# nowlyric configuration
# ~/.config/nowlyric/config.toml
# Command line flags override these values.

[sync]
# How often the player position is polled while playing
poll_interval_ms = "#,
    DEFAULT_POLL_INTERVAL_MS,
    r##"
# Upper bound for one D-Bus round trip
bus_timeout_ms = 2000
# Upper bound for probing a track's duration with ffprobe
probe_timeout_ms = 5000

[output]
rich_text = false
only_translation = false
support_execute = false
played_text_color = "#FFFFFF"
unplayed_text_color = "#FFFFFF"
progress_offset = 0.05
# output_path = "/tmp/nowlyric.txt"
shared_memory = false
"##,
    "shared_memory_path = \"",
    DEFAULT_SHARED_MEMORY_PATH,
    r#""
shared_memory_size = 1024
default_content = ""

[logging]
# Write logs to ~/.cache/nowlyric/nowlyric.log
enabled = false
"#
);
