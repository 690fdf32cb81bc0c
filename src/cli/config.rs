// FILE: src/cli/config.rs

use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub url_mode: Option<String>,
    pub include_directories: Option<Vec<String>>,
    pub custom_variables: Option<HashMap<String, String>>,
    /// Where `compile` writes its output when `-o` is not given
    pub output_directory: Option<String>,
}

pub fn load(config_path: &str) -> Result<ConfigFile> {
    let config_content = fs::read_to_string(config_path).map_err(|e| CompilerError::FileNotFound {
        path: format!("Config file {}: {}", config_path, e),
    })?;

    let config = if config_path.ends_with(".json") {
        serde_json::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid JSON config: {}", e),
        })?
    } else if config_path.ends_with(".toml") {
        toml::from_str(&config_content).map_err(|e| CompilerError::InvalidFormat {
            message: format!("Invalid TOML config: {}", e),
        })?
    } else {
        return Err(CompilerError::InvalidFormat {
            message: "Config file must be .json or .toml format".to_string(),
        });
    };
    log::info!("Loaded configuration from {}", config_path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scssc.toml");
        fs::write(
            &path,
            "url_mode = \"relative\"\ninclude_directories = [\"vendor\"]\n\n[custom_variables]\naccent = \"#336699\"\n",
        )
        .unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.url_mode.as_deref(), Some("relative"));
        assert_eq!(config.include_directories, Some(vec!["vendor".to_string()]));
        assert_eq!(config.custom_variables.unwrap()["accent"], "#336699");
        assert!(config.output_directory.is_none());
    }

    #[test]
    fn test_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scssc.json");
        fs::write(&path, r#"{ "output_directory": "dist", "url_mode": "mixed" }"#).unwrap();

        let config = load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.output_directory.as_deref(), Some("dist"));
        assert_eq!(config.url_mode.as_deref(), Some("mixed"));
    }

    #[test]
    fn test_load_rejects_bad_files() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("scssc.yaml");
        fs::write(&yaml, "url_mode: mixed").unwrap();
        assert!(matches!(load(yaml.to_str().unwrap()), Err(CompilerError::InvalidFormat { .. })));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ url_mode").unwrap();
        assert!(matches!(load(broken.to_str().unwrap()), Err(CompilerError::InvalidFormat { .. })));

        let missing = dir.path().join("missing.toml");
        assert!(matches!(load(missing.to_str().unwrap()), Err(CompilerError::FileNotFound { .. })));
    }
}
