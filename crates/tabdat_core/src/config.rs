//! Factory configuration

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TabResult;

/// How construction treats a primary key that appears more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKeyPolicy {
    /// The later row replaces the earlier one.
    #[default]
    LastWriteWins,
    /// A later row with different values is an error; identical repeats are accepted.
    Strict,
}

/// Options shared by the factory and every adapter built on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryConfig {
    #[serde(default)]
    pub duplicate_keys: DuplicateKeyPolicy,

    /// Empty cells in a present column take the field's declared default.
    /// When false (or no default is declared) they read as the empty string.
    #[serde(default = "default_empty_cell_as_default")]
    pub empty_cell_as_default: bool,
}

fn default_empty_cell_as_default() -> bool {
    true
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::default(),
            empty_cell_as_default: default_empty_cell_as_default(),
        }
    }
}

impl FactoryConfig {
    pub fn strict() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::Strict,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> TabResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: FactoryConfig = toml::from_str(&content)
            .with_context(|| format!("Invalid config: {}", path.display()))?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> TabResult<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FactoryConfig::default();
        assert_eq!(config.duplicate_keys, DuplicateKeyPolicy::LastWriteWins);
        assert!(config.empty_cell_as_default);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: FactoryConfig = toml::from_str("duplicate_keys = \"strict\"").unwrap();
        assert_eq!(config, FactoryConfig::strict());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tabdat.toml");
        let config = FactoryConfig {
            duplicate_keys: DuplicateKeyPolicy::Strict,
            empty_cell_as_default: false,
        };
        config.save(&path).unwrap();
        assert_eq!(FactoryConfig::load(&path).unwrap(), config);
    }
}
