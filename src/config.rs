//! Irvana Configuration
//!
//! Handles parsing of irvana.toml configuration files. Every value has a
//! default, so an absent file and an empty file behave the same.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::{EngineOptions, OptLevel, SymbolPrecedence};

/// File name searched for by [`IrvanaConfig::find_and_load`].
pub const CONFIG_FILE_NAME: &str = "irvana.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching irvana.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct IrvanaConfig {
    /// Execution engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Entry point argument settings
    #[serde(default)]
    pub arguments: ArgumentsConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl IrvanaConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: IrvanaConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE_NAME);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Load `explicit` if given, otherwise search from the current directory.
    pub fn resolve(explicit: Option<&Path>) -> ConfigResult<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_from_cwd(),
        }
    }

    /// Engine options described by the `[engine]` section.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            libraries: self.engine.libraries.clone(),
            host_symbols: self.engine.host_symbols,
            precedence: self.engine.precedence,
            opt_level: self.engine.opt_level,
        }
    }
}

/// Execution engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EngineConfig {
    /// Entry point symbol
    #[serde(default = "default_entry")]
    pub entry: String,

    /// Code generation optimization level
    #[serde(default)]
    pub opt_level: OptLevel,

    /// Resolve externals against the host process
    #[serde(default = "default_true")]
    pub host_symbols: bool,

    /// Tie-break when a symbol exists in several sources
    #[serde(default)]
    pub precedence: SymbolPrecedence,

    /// Shared libraries loaded before any `--load=` libraries
    #[serde(default)]
    pub libraries: Vec<PathBuf>,
}

fn default_entry() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            entry: default_entry(),
            opt_level: OptLevel::default(),
            host_symbols: true,
            precedence: SymbolPrecedence::default(),
            libraries: Vec::new(),
        }
    }
}

/// Entry point argument settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArgumentsConfig {
    /// argv[0] to synthesize; none by default
    #[serde(default)]
    pub program_name: Option<String>,
}

/// Log output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `irvana::engine=debug`
    #[serde(default)]
    pub level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env::temp_dir;

    #[test]
    fn test_default_config() {
        let config = IrvanaConfig::default();
        assert_eq!(config.engine.entry, "main");
        assert!(config.engine.host_symbols);
        assert_eq!(config.engine.precedence, SymbolPrecedence::LibraryFirst);
        assert_eq!(config.engine.opt_level, OptLevel::Default);
        assert!(config.arguments.program_name.is_none());
        assert!(config.logging.level.is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
[engine]
entry = "start"
opt_level = "aggressive"
host_symbols = false
precedence = "host-first"
libraries = ["/opt/lib/libhelper.so"]

[arguments]
program_name = "payload"

[logging]
level = "debug"
"#;
        let config: IrvanaConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.engine.entry, "start");
        assert_eq!(config.engine.opt_level, OptLevel::Aggressive);
        assert!(!config.engine.host_symbols);
        assert_eq!(config.engine.precedence, SymbolPrecedence::HostFirst);
        assert_eq!(config.engine.libraries, vec![PathBuf::from("/opt/lib/libhelper.so")]);
        assert_eq!(config.arguments.program_name.as_deref(), Some("payload"));
        assert_eq!(config.logging.level.as_deref(), Some("debug"));

        let options = config.engine_options();
        assert!(!options.host_symbols);
        assert_eq!(options.libraries.len(), 1);
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: IrvanaConfig = toml::from_str("[engine]\nopt_level = \"none\"\n").unwrap();
        assert_eq!(config.engine.opt_level, OptLevel::None);
        assert_eq!(config.engine.entry, "main");
        assert!(config.engine.host_symbols);
    }

    #[test]
    fn test_invalid_value_rejected() {
        let err = toml::from_str::<IrvanaConfig>("[engine]\nprecedence = \"random\"\n").unwrap_err();
        assert!(err.to_string().contains("precedence") || err.to_string().contains("variant"));
    }

    #[test]
    fn test_missing_explicit_path() {
        let path = temp_dir().join("irvana_test_config_missing.toml");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(
            IrvanaConfig::resolve(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_find_and_load_walks_up() {
        let root = temp_dir().join(format!("irvana_test_find_{}", std::process::id()));
        let nested = root.join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join(CONFIG_FILE_NAME), "[engine]\nentry = \"found\"\n").unwrap();

        let config = IrvanaConfig::find_and_load(&nested).unwrap();
        assert_eq!(config.engine.entry, "found");

        std::fs::remove_dir_all(&root).unwrap();
    }
}
