//! Layered runtime configuration.
//!
//! Values resolve in three layers, later layers winning:
//!
//! 1. compiled-in defaults
//! 2. a TOML file, when a path is given
//! 3. `TENTACLE_*` environment variables
//!
//! Every field has a default, so an empty file and no environment is a
//! valid configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tentacle_types::ErrorCode;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid value in {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io { .. } => "CONFIG_IO",
            Self::Parse { .. } => "CONFIG_PARSE",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Runtime tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TentacleConfig {
    /// TCP address the frontend listens on.
    pub listen_addr: String,
    /// Bound of the scheduler inbox. Full inbox blocks session readers.
    pub queue_depth: usize,
    /// Per-stream result channel capacity.
    pub result_buffer: usize,
    /// Largest accepted frame payload in bytes.
    pub max_frame_len: usize,
    /// Quiet window before a commit triggers a compile pass.
    pub debounce_ms: u64,
    /// Bounded wait for one compile pass.
    pub compile_timeout_ms: u64,
}

impl Default for TentacleConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7464".to_string(),
            queue_depth: 64,
            result_buffer: 64,
            max_frame_len: 1024 * 1024,
            debounce_ms: 50,
            compile_timeout_ms: 5_000,
        }
    }
}

impl TentacleConfig {
    /// Loads configuration: defaults, then `path` (if any), then
    /// environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] on an unreadable or unparseable file,
    /// or a malformed environment value.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Parses a TOML file over the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "config file loaded");
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(addr) = std::env::var("TENTACLE_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        Self::env_number("TENTACLE_QUEUE_DEPTH", &mut self.queue_depth)?;
        Self::env_number("TENTACLE_RESULT_BUFFER", &mut self.result_buffer)?;
        Self::env_number("TENTACLE_MAX_FRAME_LEN", &mut self.max_frame_len)?;
        Self::env_number("TENTACLE_DEBOUNCE_MS", &mut self.debounce_ms)?;
        Self::env_number("TENTACLE_COMPILE_TIMEOUT_MS", &mut self.compile_timeout_ms)?;
        Ok(())
    }

    fn env_number<T: std::str::FromStr>(var: &str, slot: &mut T) -> Result<(), ConfigError>
    where
        T::Err: std::fmt::Display,
    {
        if let Ok(raw) = std::env::var(var) {
            *slot = raw.parse().map_err(|e: T::Err| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    #[must_use]
    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_complete() {
        let config = TentacleConfig::default();
        assert_eq!(config.listen_addr, "127.0.0.1:7464");
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.compile_timeout(), Duration::from_millis(5_000));
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_depth = 8\ndebounce_ms = 10").unwrap();

        let config = TentacleConfig::from_file(file.path()).unwrap();
        assert_eq!(config.queue_depth, 8);
        assert_eq!(config.debounce_ms, 10);
        assert_eq!(config.max_frame_len, TentacleConfig::default().max_frame_len);
    }

    #[test]
    fn unparseable_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "queue_depth = \"many\"").unwrap();

        match TentacleConfig::from_file(file.path()) {
            Err(ConfigError::Parse { .. }) => {}
            other => panic!("expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn missing_file_is_an_io_error() {
        match TentacleConfig::from_file(Path::new("/nonexistent/tentacle.toml")) {
            Err(ConfigError::Io { .. }) => {}
            other => panic!("expected Io error, got {:?}", other),
        }
    }

    #[test]
    fn env_number_rejects_garbage() {
        // Uses a name no other layer reads so parallel tests cannot
        // observe the temporary variable.
        let mut slot = 1usize;
        std::env::set_var("TENTACLE_TEST_GARBAGE_DEPTH", "not-a-number");
        let result = TentacleConfig::env_number("TENTACLE_TEST_GARBAGE_DEPTH", &mut slot);
        std::env::remove_var("TENTACLE_TEST_GARBAGE_DEPTH");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }
}
