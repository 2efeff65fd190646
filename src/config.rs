//! Optional plugin configuration.
//!
//! Read once per process from `maxdb_provider.json` next to the plugin
//! module. A missing file means defaults.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;

pub const CONFIG_FILE_NAME: &str = "maxdb_provider.json";

const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Write a debug log next to the module.
    pub debug: bool,
    /// How long each wait slice blocks before redraw events are drained.
    pub poll_interval_ms: u64,
    /// Upper bound on the whole wait. `None` waits for as long as the child runs.
    pub timeout_ms: Option<u64>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            debug: false,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: None,
        }
    }
}

/// How the process runner waits for its child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        PluginConfig::default().wait_policy()
    }
}

impl PluginConfig {
    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            timeout: self.timeout_ms.map(Duration::from_millis),
        }
    }
}

/// Parse a config file. A file that does not exist yields the defaults.
pub fn load_from(path: &Path) -> Result<PluginConfig> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(PluginConfig::default())
        }
        Err(e) => return Err(e.into()),
    };

    if content.trim().is_empty() {
        return Ok(PluginConfig::default());
    }

    Ok(serde_json::from_str(&content)?)
}

static CONFIG: OnceLock<PluginConfig> = OnceLock::new();

/// Process-wide configuration, loaded on first use. Also brings up the
/// debug log when the config asks for it.
pub fn get() -> &'static PluginConfig {
    CONFIG.get_or_init(|| {
        let dir = crate::util::module_dir();
        let loaded = match dir.as_deref() {
            Some(d) => load_from(&d.join(CONFIG_FILE_NAME)),
            None => Ok(PluginConfig::default()),
        };

        let (config, problem) = match loaded {
            Ok(c) => (c, None),
            Err(e) => (PluginConfig::default(), Some(e)),
        };

        crate::log::init(config.debug, dir.as_deref());
        if let Some(e) = problem {
            crate::debug_log!("Config ignored: {}", e);
        }
        crate::debug_log!("Config: {:?}", config);
        config
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_from(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, PluginConfig::default());
        assert_eq!(config.wait_policy().poll_interval, Duration::from_millis(100));
        assert_eq!(config.wait_policy().timeout, None);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{ "timeout_ms": 5000 }"#).unwrap();

        let config = load_from(&path).unwrap();
        assert!(!config.debug);
        assert_eq!(config.poll_interval_ms, 100);
        assert_eq!(config.wait_policy().timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_poll_interval_is_clamped() {
        let config = PluginConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(config.wait_policy().poll_interval, Duration::from_millis(1));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ debug: yes").unwrap();

        let err = load_from(&path).unwrap_err();
        assert!(matches!(err, crate::error::PluginError::Config(_)));
    }

    #[test]
    fn empty_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "  \n").unwrap();
        assert_eq!(load_from(&path).unwrap(), PluginConfig::default());
    }
}
