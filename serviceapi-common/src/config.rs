//! Configuration loading and root folder resolution
//!
//! Settings come from an optional TOML file. A missing file is never fatal:
//! the compiled defaults are used and a warning is logged. The root folder
//! holding the database is resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `SERVICEAPI_ROOT` environment variable
//! 3. `root_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_ENV_VAR: &str = "SERVICEAPI_ROOT";

/// Database file name used when the config does not name one
pub const DEFAULT_DATABASE_FILE: &str = "serviceapi.db";

/// Settings read from `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub database_file: String,
    pub busy_timeout_ms: u64,
    pub log_level: String,
    pub import: ImportConfig,
}

/// `[import]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Abort a batch on the first document that fails validation
    pub stop_on_invalid: bool,
    /// Deadline applied to each storage statement during an import
    pub statement_timeout_ms: Option<u64>,
}

impl ImportConfig {
    pub fn statement_timeout(&self) -> Option<Duration> {
        self.statement_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            database_file: DEFAULT_DATABASE_FILE.to_string(),
            busy_timeout_ms: 5000,
            log_level: "info".to_string(),
            import: ImportConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Full path of the SQLite database under `root`
    pub fn database_path(&self, root: &Path) -> PathBuf {
        root.join(&self.database_file)
    }
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load configuration
///
/// An explicitly requested file must exist. Without one, the platform
/// locations are searched and defaults are used when nothing is found.
pub fn load_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        return load_toml_config(path);
    }

    match find_config_file() {
        Some(path) => {
            info!("Loading config from {}", path.display());
            load_toml_config(&path)
        }
        None => {
            warn!("No config file found, using defaults");
            Ok(TomlConfig::default())
        }
    }
}

/// Locate the config file: user config directory first, then /etc
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("serviceapi").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/serviceapi/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the root folder following the documented priority order
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(ROOT_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        dirs::data_local_dir()
            .map(|d| d.join("serviceapi"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/serviceapi"))
    } else if cfg!(target_os = "windows") {
        dirs::data_local_dir()
            .map(|d| d.join("serviceapi"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\serviceapi"))
    } else {
        dirs::data_dir()
            .map(|d| d.join("serviceapi"))
            .unwrap_or_else(|| PathBuf::from("./serviceapi_data"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.database_file, "serviceapi.db");
        assert_eq!(config.busy_timeout_ms, 5000);
        assert_eq!(config.log_level, "info");
        assert!(!config.import.stop_on_invalid);
        assert!(config.import.statement_timeout().is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            log_level = "debug"

            [import]
            stop_on_invalid = true
            statement_timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.log_level, "debug");
        assert_eq!(config.database_file, "serviceapi.db");
        assert!(config.import.stop_on_invalid);
        assert_eq!(
            config.import.statement_timeout(),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_database_path_joins_root() {
        let config = TomlConfig {
            database_file: "rra.db".to_string(),
            ..TomlConfig::default()
        };
        assert_eq!(
            config.database_path(Path::new("/srv/serviceapi")),
            PathBuf::from("/srv/serviceapi/rra.db")
        );
    }
}
