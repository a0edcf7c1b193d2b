//! Configuration management for the model compiler
//!
//! Supports loading configuration from:
//! - Default values
//! - Config file (curator.toml)
//! - Environment variables (CURATOR_*)
//!
//! ## Example config file (curator.toml):
//! ```toml
//! [synthesis]
//! bound_arrays = true
//! schema_id_base = "http://example.com"
//!
//! [explorer]
//! max_ancestor_paths = 1000
//!
//! [checks]
//! reserved_names = ["entityId"]
//! blacklisted_characters = "().-"
//! ```

use config_crate::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Main configuration for the model compiler
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    /// JSON Schema synthesis settings
    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Graph explorer settings
    #[serde(default)]
    pub explorer: ExplorerConfig,

    /// Structural check settings
    #[serde(default)]
    pub checks: ChecksConfig,
}

/// JSON Schema synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Bound list-valued enums with maxItems equal to the range size
    #[serde(default = "default_true")]
    pub bound_arrays: bool,

    /// Base URL for the emitted document's $id
    #[serde(default = "default_schema_id_base")]
    pub schema_id_base: String,
}

/// Graph explorer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Cap on ancestor path enumeration; densely connected hierarchies can
    /// make simple-path counts explode
    #[serde(default = "default_max_ancestor_paths")]
    pub max_ancestor_paths: usize,
}

/// Structural check configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecksConfig {
    /// Labels that collide with internal identifiers (matched
    /// case-insensitively)
    #[serde(default = "default_reserved_names")]
    pub reserved_names: Vec<String>,

    /// Characters a downstream annotation store strips from display names
    #[serde(default = "default_blacklisted_characters")]
    pub blacklisted_characters: String,
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_schema_id_base() -> String {
    "http://example.com".to_string()
}

fn default_max_ancestor_paths() -> usize {
    1000
}

fn default_reserved_names() -> Vec<String> {
    vec!["entityId".to_string()]
}

fn default_blacklisted_characters() -> String {
    crate::labels::BLACKLISTED_CHARACTERS.iter().collect()
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            bound_arrays: true,
            schema_id_base: default_schema_id_base(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_ancestor_paths: default_max_ancestor_paths(),
        }
    }
}

impl Default for ChecksConfig {
    fn default() -> Self {
        Self {
            reserved_names: default_reserved_names(),
            blacklisted_characters: default_blacklisted_characters(),
        }
    }
}

impl ModelConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from a specific file
    pub fn load_from(config_path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        let config_locations = ["curator.toml", ".curator.toml", "config/curator.toml"];
        for location in config_locations {
            builder = builder.add_source(File::with_name(location).required(false));
        }

        // Load from XDG config directory
        if let Some(config_dir) = directories::ProjectDirs::from("dev", "curator", "schemas") {
            let xdg_config = config_dir.config_dir().join("curator.toml");
            if xdg_config.exists() {
                builder = builder.add_source(File::from(xdg_config).required(false));
            }
        }

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Load from environment variables (CURATOR_*)
        builder = builder.add_source(
            Environment::with_prefix("CURATOR")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Save configuration to a file
    pub fn save(&self, path: &str) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ModelConfig::default();
        assert!(config.synthesis.bound_arrays);
        assert_eq!(config.explorer.max_ancestor_paths, 1000);
        assert_eq!(config.checks.reserved_names, vec!["entityId".to_string()]);
    }

    #[test]
    fn test_serialize_config() {
        let config = ModelConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[synthesis]"));
        assert!(toml_str.contains("[checks]"));
    }

    #[test]
    fn test_blacklisted_characters_cover_label_strip_set() {
        let config = ChecksConfig::default();
        for c in crate::labels::BLACKLISTED_CHARACTERS {
            assert!(config.blacklisted_characters.contains(*c));
        }
    }
}
