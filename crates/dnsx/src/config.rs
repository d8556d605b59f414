use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

/// Defaults read from an optional JSON config file. Every field may be
/// absent; command-line flags override whatever is present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub nameserver: Option<String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub retries: Option<u32>,
    #[serde(default)]
    pub edns: Option<String>,
}

impl FileConfig {
    /// Load from `path`, or from `$HOME/.config/dnsx/config.json` when no
    /// path is given. A missing file just means defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match default_path() {
                Some(p) => p,
                None => return Ok(Self::default()),
            },
        };
        if !path.exists() {
            debug!("no config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

fn default_path() -> Option<PathBuf> {
    std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config/dnsx/config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config() {
        let config: FileConfig =
            serde_json::from_str(r#"{"nameserver": "9.9.9.9", "retries": 5}"#).unwrap();
        assert_eq!(config.nameserver.as_deref(), Some("9.9.9.9"));
        assert_eq!(config.retries, Some(5));
        assert_eq!(config.timeout_ms, None);
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let config = FileConfig::load(Some(Path::new("/no/such/dnsx-config.json"))).unwrap();
        assert!(config.nameserver.is_none());
        assert!(config.retries.is_none());
    }
}
