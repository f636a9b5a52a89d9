/*!
 * CLI Configuration
 * Optional TOML settings for adapter selection and D-Bus timeouts
 */

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Restrict commands to one adapter (e.g. "hci0"); all adapters when unset.
    pub adapter: Option<String>,
    /// Timeout for individual D-Bus calls into BlueZ.
    pub dbus_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            adapter: None,
            dbus_timeout_secs: 5,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            // No config file is required, fall back to defaults
            Err(_) => Ok(Self::default()),
        }
    }
}
