//! Configuration file support.
//!
//! Settings are read from `config.ini` in the platform config directory
//! (`~/.config/framestream/config.ini` on Linux). Every key is optional;
//! anything missing falls back to the library defaults. CLI flags take
//! precedence over the file.
//!
//! ```ini
//! [pipeline]
//! channel_capacity = 100
//! flush_every = 1000
//! poll_interval_ms = 500
//! deadline_secs = 1800
//!
//! [output]
//! directory = reports
//!
//! [logging]
//! level = warn
//! file = /var/log/framestream.log
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::{Ini, Properties};
use thiserror::Error;

use crate::pipeline::{PipelineConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEADLINE, DEFAULT_FLUSH_EVERY};
use crate::progress::DEFAULT_POLL_INTERVAL;

/// Name of the configuration file.
pub const CONFIG_FILENAME: &str = "config.ini";

/// Default report directory, relative to the working directory.
pub const DEFAULT_OUTPUT_DIR: &str = "reports";

/// Default log level directive.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Errors that can occur while loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read or parsed.
    #[error("Failed to read config {}: {source}", path.display())]
    Read { path: PathBuf, source: ini::Error },

    /// The file could not be written.
    #[error("Failed to write config {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A key holds a value of the wrong type.
    #[error("Invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
    },

    /// No platform config directory could be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// `[pipeline]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub channel_capacity: usize,
    pub flush_every: u64,
    pub poll_interval_ms: u64,
    pub deadline_secs: u64,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            flush_every: DEFAULT_FLUSH_EVERY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            deadline_secs: DEFAULT_DEADLINE.as_secs(),
        }
    }
}

impl PipelineSettings {
    /// Convert to a [`PipelineConfig`].
    pub fn to_pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_channel_capacity(self.channel_capacity)
            .with_flush_every(self.flush_every)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_deadline(Duration::from_secs(self.deadline_secs))
    }
}

/// `[output]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    /// Directory reports are written to.
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `framestream=debug`.
    pub level: String,
    /// Optional log file.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// Parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub pipeline: PipelineSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

/// Default location of the configuration file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("framestream").join(CONFIG_FILENAME))
}

impl ConfigFile {
    /// Load from the default location, or defaults if the file is absent.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ini(&ini)
    }

    /// Parse from INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Read {
            path: PathBuf::from("<string>"),
            source: ini::Error::Parse(e),
        })?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("pipeline")) {
            let p = &mut config.pipeline;
            p.channel_capacity = parse_key(section, "pipeline", "channel_capacity", p.channel_capacity)?;
            p.flush_every = parse_key(section, "pipeline", "flush_every", p.flush_every)?;
            p.poll_interval_ms = parse_key(section, "pipeline", "poll_interval_ms", p.poll_interval_ms)?;
            p.deadline_secs = parse_key(section, "pipeline", "deadline_secs", p.deadline_secs)?;
        }

        if let Some(section) = ini.section(Some("output")) {
            if let Some(dir) = section.get("directory").filter(|v| !v.trim().is_empty()) {
                config.output.directory = PathBuf::from(dir.trim());
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(level) = section.get("level").filter(|v| !v.trim().is_empty()) {
                config.logging.level = level.trim().to_string();
            }
            config.logging.file = section
                .get("file")
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from);
        }

        Ok(config)
    }

    /// Render as INI.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some("pipeline"))
            .set("channel_capacity", self.pipeline.channel_capacity.to_string())
            .set("flush_every", self.pipeline.flush_every.to_string())
            .set("poll_interval_ms", self.pipeline.poll_interval_ms.to_string())
            .set("deadline_secs", self.pipeline.deadline_secs.to_string());
        ini.with_section(Some("output"))
            .set("directory", self.output.directory.to_string_lossy());
        let mut logging = ini.with_section(Some("logging"));
        logging.set("level", self.logging.level.as_str());
        if let Some(file) = &self.logging.file {
            logging.set("file", file.to_string_lossy());
        }
        ini
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source: std::io::Error| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    /// Write to the default location, returning the path used.
    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }
}

fn parse_key<T: FromStr>(
    section: &Properties,
    section_name: &str,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match section.get(key).map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            section: section_name.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }),
    }
}
