//! Bridge configuration
//!
//! Loaded from a TOML file by the command line front end; embedders build it
//! directly and pass it to `Externals::with_config`.

use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("Config error: {message}")]
    Parse { message: String },
}

/// Settings read by host-facing shims
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Reported by `runtime.getgoroot`; falls back to `$GOROOT`
    pub goroot: Option<PathBuf>,
    /// Initial `runtime.GOMAXPROCS` setting; defaults to the CPU count
    pub gomaxprocs: Option<usize>,
    /// Whether `runtime.Breakpoint` raises a real trap signal
    pub trap_breakpoints: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            goroot: None,
            gomaxprocs: None,
            trap_breakpoints: true,
        }
    }
}

impl BridgeConfig {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        toml::from_str(source).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&source)
    }

    /// GOROOT as seen by interpreted code, empty when unknown
    pub fn goroot(&self) -> OsString {
        match &self.goroot {
            Some(path) => path.clone().into_os_string(),
            None => std::env::var_os("GOROOT").unwrap_or_default(),
        }
    }

    /// Initial parallelism limit, never below 1
    pub fn initial_gomaxprocs(&self) -> usize {
        self.gomaxprocs
            .unwrap_or_else(host_cpu_count)
            .max(1)
    }
}

/// Number of CPUs usable by this process
pub fn host_cpu_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert!(config.trap_breakpoints);
        assert!(config.initial_gomaxprocs() >= 1);
    }

    #[test]
    fn test_parse_toml() {
        let config = BridgeConfig::from_toml_str(
            r#"
            goroot = "/opt/go"
            gomaxprocs = 3
            trap_breakpoints = false
            "#,
        )
        .unwrap();
        assert_eq!(config.goroot(), "/opt/go");
        assert_eq!(config.initial_gomaxprocs(), 3);
        assert!(!config.trap_breakpoints);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = BridgeConfig::from_toml_str("gomaxprocs = 0").unwrap();
        assert!(config.trap_breakpoints);
        assert_eq!(config.initial_gomaxprocs(), 1);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = BridgeConfig::from_toml_str("gomaxproc = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().starts_with("Config error:"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "trap_breakpoints = false").unwrap();
        let config = BridgeConfig::load(file.path()).unwrap();
        assert!(!config.trap_breakpoints);
    }

    #[test]
    fn test_load_missing_file() {
        let err = BridgeConfig::load(Path::new("/nonexistent/ssainterp.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
