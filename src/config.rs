//! Session configuration: baud rate and every protocol timing.
//!
//! Defaults match the timings GSM modules tolerate in practice: a generous
//! boot settle before the first command, short pauses between handshake
//! steps, and a long window for the network round-trip after the SMS body.
//! All values can be overridden from a TOML file.
//!
//! ```toml
//! baud_rate = 115200
//! command_timeout_ms = 8000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default baud rate for GSM modules (bps).
pub const DEFAULT_BAUD_RATE: u32 = 9600;
/// Pause after opening the port, letting modem boot chatter clear (ms).
pub const DEFAULT_BOOT_SETTLE_MS: u64 = 2000;
/// Pause between initialization handshake steps (ms).
pub const DEFAULT_STEP_SETTLE_MS: u64 = 500;
/// Timeout for each initialization command (ms).
pub const DEFAULT_INIT_TIMEOUT_MS: u64 = 2000;
/// Timeout for regular queued commands (ms).
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
/// Pause after `AT+CMGS` before writing the body, standing in for the
/// modem's `>` prompt (ms).
pub const DEFAULT_PROMPT_SETTLE_MS: u64 = 1000;
/// Timeout for the SMS body acknowledgement (ms).
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 30_000;

/// Configuration for a [`ModemSession`](crate::session::ModemSession).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModemConfig {
    /// Serial line speed in bits per second.
    pub baud_rate: u32,
    /// Settle delay after opening the port.
    pub boot_settle_ms: u64,
    /// Settle delay between handshake steps.
    pub step_settle_ms: u64,
    /// Timeout for each handshake command.
    pub init_timeout_ms: u64,
    /// Timeout for regular queued commands.
    pub command_timeout_ms: u64,
    /// Settle delay between `AT+CMGS` and the body write.
    pub prompt_settle_ms: u64,
    /// Timeout for the SMS body acknowledgement.
    pub send_timeout_ms: u64,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            boot_settle_ms: DEFAULT_BOOT_SETTLE_MS,
            step_settle_ms: DEFAULT_STEP_SETTLE_MS,
            init_timeout_ms: DEFAULT_INIT_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            prompt_settle_ms: DEFAULT_PROMPT_SETTLE_MS,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
        }
    }
}

impl ModemConfig {
    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&text)?)
    }

    pub fn boot_settle(&self) -> Duration {
        Duration::from_millis(self.boot_settle_ms)
    }

    pub fn step_settle(&self) -> Duration {
        Duration::from_millis(self.step_settle_ms)
    }

    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn prompt_settle(&self) -> Duration {
        Duration::from_millis(self.prompt_settle_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Errors that can occur loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read configuration file '{path}': {source}")]
    Read {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ModemConfig::default();
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.boot_settle(), Duration::from_secs(2));
        assert_eq!(config.step_settle(), Duration::from_millis(500));
        assert_eq!(config.init_timeout(), Duration::from_secs(2));
        assert_eq!(config.command_timeout(), Duration::from_secs(5));
        assert_eq!(config.prompt_settle(), Duration::from_secs(1));
        assert_eq!(config.send_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_takes_defaults() {
        let parsed: ModemConfig = toml::from_str("baud_rate = 115200").unwrap();
        assert_eq!(parsed.baud_rate, 115200);
        assert_eq!(parsed.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud_rate = 19200\nsend_timeout_ms = 45000").unwrap();

        let config = ModemConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.send_timeout(), Duration::from_secs(45));
    }

    #[test]
    fn test_missing_file_errors() {
        let result = ModemConfig::from_toml_file("/nonexistent/sms-modem.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_invalid_toml_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "baud_rate = \"fast\"").unwrap();

        let result = ModemConfig::from_toml_file(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
