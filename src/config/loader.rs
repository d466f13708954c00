// file: src/config/loader.rs
// version: 1.0.0
// guid: de68462e-485c-4f2c-824a-5d5f7a73c4dd

//! Configuration file loading and environment variable substitution

use super::{Config, DEFAULT_CONFIG_PATH};
use crate::{error::ZnxError, Result};
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
    env_vars: HashMap<String, String>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self {
            env_vars: std::env::vars().collect(),
        }
    }

    /// Resolve the configuration for this invocation.
    ///
    /// An explicitly requested file must exist. Without one, the default
    /// location is read if present and built-in defaults are used otherwise.
    pub fn load(&self, explicit: Option<&Path>) -> Result<Config> {
        let config = match explicit {
            Some(path) => self.load_file(expand_path(path))?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    self.load_file(&default)?
                } else {
                    debug!("No configuration file at {}, using defaults", default.display());
                    Config::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Config> {
        let content = fs::read_to_string(&path).map_err(|e| {
            ZnxError::config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let expanded = self.expand_env_vars(&content)?;
        let config: Config = toml::from_str(&expanded)?;

        debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Expand `${VAR}` references in configuration content
    fn expand_env_vars(&self, content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ZnxError::config(format!("Invalid regex pattern: {}", e)))?;

        let mut result = content.to_string();
        let mut missing_vars = Vec::new();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let placeholder = &cap[0];

            if let Some(value) = self.env_vars.get(var_name) {
                result = result.replace(placeholder, value);
            } else {
                missing_vars.push(var_name.to_string());
            }
        }

        if !missing_vars.is_empty() {
            return Err(ZnxError::config(format!(
                "Missing environment variables: {}",
                missing_vars.join(", ")
            )));
        }

        Ok(result)
    }

    /// Set environment variable for substitution
    pub fn set_env_var(&mut self, key: String, value: String) {
        self.env_vars.insert(key, value);
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(&raw).as_ref())
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_file_with_env_substitution() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(
            &path,
            "zsync_binary = \"${ZNX_TEST_ZSYNC}\"\nunmount_retries = 2\n",
        )
        .unwrap();

        let mut loader = ConfigLoader::new();
        loader.set_env_var("ZNX_TEST_ZSYNC".to_string(), "/opt/bin/zsync".to_string());

        let config = loader.load(Some(&path)).unwrap();
        assert_eq!(config.zsync_binary, "/opt/bin/zsync");
        assert_eq!(config.unmount_retries, 2);
        assert_eq!(config.boot_partition_size, "+132M");
    }

    #[test]
    fn test_missing_env_var_is_reported() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "bootloader_dir = \"${ZNX_TEST_UNSET_VAR_1234}\"\n").unwrap();

        let loader = ConfigLoader::new();
        let err = loader.load_file(&path).unwrap_err();
        assert!(err.to_string().contains("ZNX_TEST_UNSET_VAR_1234"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new();
        assert!(loader.load(Some(&temp_dir.path().join("absent.toml"))).is_err());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "data_label = \"OTHER\"\n").unwrap();

        let loader = ConfigLoader::new();
        assert!(matches!(loader.load_file(&path), Err(ZnxError::Toml(_))));
    }

    #[test]
    fn test_invalid_values_fail_validation() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "unmount_retries = 0\n").unwrap();

        let loader = ConfigLoader::new();
        assert!(matches!(loader.load(Some(&path)), Err(ZnxError::Config(_))));
    }
}
