//! HTTP service configuration

use crate::constants::{
    DEFAULT_BODY_LIMIT_MIB, DEFAULT_CONFIG_PATH, DEFAULT_SERVER_BIND, DEFAULT_SERVER_OUTPUT,
    DEFAULT_SERVER_PORT,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    /// Where every run's archive is written, overwritten each time
    pub output_path: PathBuf,
    pub body_limit_mib: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_SERVER_BIND.to_string(),
            port: DEFAULT_SERVER_PORT,
            output_path: PathBuf::from(DEFAULT_SERVER_OUTPUT),
            body_limit_mib: DEFAULT_BODY_LIMIT_MIB,
        }
    }
}

impl ServerConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ServerConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn default_path() -> &'static Path {
        Path::new(DEFAULT_CONFIG_PATH)
    }

    /// Loads `path` if given, else the default file when present, else defaults.
    pub fn resolve(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None if Self::default_path().exists() => Self::load(Self::default_path()),
            None => Ok(Self::default()),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_mib.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.address(), "0.0.0.0:3000");
        assert_eq!(config.output_path, PathBuf::from("public/output/images.zip"));
        assert_eq!(config.body_limit_bytes(), 256 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("img-zipper.toml");
        std::fs::write(&path, "port = 8080\noutput_path = \"/tmp/out/archive.zip\"\n").unwrap();

        let config = ServerConfig::resolve(Some(&path)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.output_path, PathBuf::from("/tmp/out/archive.zip"));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("broken.toml");
        std::fs::write(&path, "port = \"not a number\"").unwrap();

        assert!(ServerConfig::resolve(Some(&path)).is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(ServerConfig::resolve(Some(Path::new("/nonexistent/img-zipper.toml"))).is_err());
    }
}
