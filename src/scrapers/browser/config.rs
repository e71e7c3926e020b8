//! Browser engine configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Browser engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserEngineConfig {
    /// Run in headless mode (default: true).
    /// Set to false for debugging.
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Page load timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Explicit Chrome/Chromium executable. Searched for when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chrome_path: Option<PathBuf>,

    /// Pass `--no-sandbox`; containers usually need it.
    #[serde(default = "default_no_sandbox")]
    pub no_sandbox: bool,

    /// Additional Chrome arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chrome_args: Vec<String>,
}

pub fn default_headless() -> bool {
    true
}

pub fn default_timeout() -> u64 {
    30
}

pub fn default_no_sandbox() -> bool {
    true
}

impl Default for BrowserEngineConfig {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            timeout: default_timeout(),
            chrome_path: None,
            no_sandbox: default_no_sandbox(),
            chrome_args: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_table() {
        let config: BrowserEngineConfig = toml::from_str("").unwrap();
        assert_eq!(config, BrowserEngineConfig::default());
        assert!(config.headless);
        assert_eq!(config.timeout, 30);
    }
}
