use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{NotedError, NotedResult};

/// Top-level client configuration (loaded from noted.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotedConfig {
    pub log: LogConfig,
    pub kdf: KdfConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Argon2id parameters used when an account is set up or re-keyed.
///
/// Unlock always uses the parameters recorded on the account, not these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB (default: 65536 = 64 MiB)
    pub mem_cost_kib: u32,
    /// Time cost / iterations (default: 4)
    pub time_cost: u32,
    /// Parallelism (default: 3)
    pub parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON document holding accounts, notes, and versions
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            mem_cost_kib: 65536,
            time_cost: 4,
            parallelism: 3,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("~/.local/share/noted/store.json"),
        }
    }
}

impl NotedConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &Path) -> NotedResult<Self> {
        if !path.exists() {
            tracing::warn!("config file not found: {}  (using defaults)", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| NotedError::Config(format!("parsing {}: {e}", path.display())))
    }
}

/// Expand `~` in path to the user's home directory
pub fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_default();
            PathBuf::from(home).join(rest)
        }
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[log]
level = "debug"
format = "json"

[kdf]
mem_cost_kib = 131072
time_cost = 5
parallelism = 2

[store]
path = "/var/lib/noted/store.json"
"#;
        let config: NotedConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        assert_eq!(config.kdf.mem_cost_kib, 131072);
        assert_eq!(config.kdf.time_cost, 5);
        assert_eq!(config.kdf.parallelism, 2);
        assert_eq!(config.store.path, PathBuf::from("/var/lib/noted/store.json"));
    }

    #[test]
    fn test_parse_defaults() {
        let config: NotedConfig = toml::from_str("").unwrap();

        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, "text");
        assert_eq!(config.kdf, KdfConfig::default());
        assert_eq!(config.kdf.mem_cost_kib, 65536);
        assert_eq!(config.kdf.time_cost, 4);
        assert_eq!(config.kdf.parallelism, 3);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[kdf]
time_cost = 6
"#;
        let config: NotedConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.kdf.time_cost, 6);
        // Defaults
        assert_eq!(config.kdf.mem_cost_kib, 65536);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let config = NotedConfig::load(&tmp.path().join("absent.toml")).unwrap();
        assert_eq!(config.kdf, KdfConfig::default());
    }

    #[test]
    fn test_load_rejects_malformed_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("noted.toml");
        std::fs::write(&path, "[kdf\ntime_cost = ").unwrap();

        let err = NotedConfig::load(&path).unwrap_err();
        assert!(matches!(err, NotedError::Config(_)));
    }

    #[test]
    fn test_load_unreadable_path_is_io_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = NotedConfig::load(tmp.path()).unwrap_err();
        assert!(matches!(err, NotedError::Io(_)));
    }

    #[test]
    fn test_expand_tilde() {
        std::env::set_var("HOME", "/home/tester");
        assert_eq!(
            expand_tilde(Path::new("~/notes/store.json")),
            PathBuf::from("/home/tester/notes/store.json")
        );
        assert_eq!(expand_tilde(Path::new("/abs/path")), PathBuf::from("/abs/path"));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = NotedConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: NotedConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.kdf, parsed.kdf);
        assert_eq!(config.store.path, parsed.store.path);
    }
}
