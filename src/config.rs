//! Pool configuration
//!
//! Layered from built-in defaults, an optional TOML file and `NODEHEAP_*`
//! environment variables, later sources winning.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Size of the handle universe. One million seems plenty.
pub const MAX_HEAP_HANDLES: i32 = 1_000_000;

/// Default number of heaps a pool can hold
pub const DEFAULT_MAX_HEAPS: i32 = 100;

/// Default node capacity for heaps created by the CLI
pub const DEFAULT_HEAP_NODES: i32 = 112;

/// Heap pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of live heaps
    pub max_heaps: i32,
    /// Upper bound accepted for `max_heaps`
    pub handle_space: i32,
    /// Node capacity used when a heap size is not given
    pub default_heap_nodes: i32,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_heaps: DEFAULT_MAX_HEAPS,
            handle_space: MAX_HEAP_HANDLES,
            default_heap_nodes: DEFAULT_HEAP_NODES,
        }
    }
}

impl PoolConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();
        let mut builder = config::Config::builder()
            .set_default("max_heaps", i64::from(defaults.max_heaps))
            .and_then(|b| b.set_default("handle_space", i64::from(defaults.handle_space)))
            .and_then(|b| {
                b.set_default("default_heap_nodes", i64::from(defaults.default_heap_nodes))
            })
            .map_err(|e| Error::Config(format!("Failed to set defaults: {}", e)))?;

        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }

        let settings = builder
            .add_source(config::Environment::with_prefix("NODEHEAP").try_parsing(true))
            .build()
            .map_err(|e| Error::Config(format!("Failed to load configuration: {}", e)))?;

        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to render TOML: {}", e)))
    }

    pub fn validate(&self) -> Result<()> {
        if self.handle_space <= 0 {
            return Err(Error::Config(format!(
                "handle_space must be positive, got {}",
                self.handle_space
            )));
        }
        if self.max_heaps <= 0 || self.max_heaps > self.handle_space {
            return Err(Error::Config(format!(
                "max_heaps must be in 1..={}, got {}",
                self.handle_space, self.max_heaps
            )));
        }
        if self.default_heap_nodes <= 0 {
            return Err(Error::Config(format!(
                "default_heap_nodes must be positive, got {}",
                self.default_heap_nodes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    // Serializes tests that read or write NODEHEAP_* variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults_are_valid() {
        let config = PoolConfig::default();
        assert_eq!(config.max_heaps, 100);
        assert_eq!(config.handle_space, MAX_HEAP_HANDLES);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip_keeps_values() -> Result<()> {
        let config = PoolConfig::from_toml("max_heaps = 8\ndefault_heap_nodes = 16\n")?;
        assert_eq!(config.max_heaps, 8);
        assert_eq!(config.default_heap_nodes, 16);
        // Missing keys fall back to defaults
        assert_eq!(config.handle_space, MAX_HEAP_HANDLES);

        let rendered = config.to_toml()?;
        assert!(rendered.contains("max_heaps = 8"));
        Ok(())
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let too_many = PoolConfig {
            max_heaps: 11,
            handle_space: 10,
            ..PoolConfig::default()
        };
        assert!(matches!(too_many.validate(), Err(Error::Config(_))));

        assert!(PoolConfig::from_toml("max_heaps = 0").is_err());
        assert!(PoolConfig::from_toml("default_heap_nodes = -3").is_err());
    }

    #[test]
    fn test_load_from_file() -> Result<()> {
        let _env = ENV_LOCK.lock();
        let path = std::env::temp_dir().join(format!("nodeheap_config_{}.toml", std::process::id()));
        std::fs::write(&path, "max_heaps = 7\n")
            .map_err(|e| Error::Config(e.to_string()))?;

        let config = PoolConfig::load(Some(&path))?;
        assert_eq!(config.max_heaps, 7);

        std::fs::remove_file(path).ok();
        Ok(())
    }

    #[test]
    fn test_load_missing_file_fails() {
        let path = std::env::temp_dir().join("nodeheap_config_missing.toml");
        assert!(matches!(
            PoolConfig::load(Some(&path)),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_environment_overrides_file_and_defaults() -> Result<()> {
        let _env = ENV_LOCK.lock();
        let saved = std::env::var("NODEHEAP_MAX_HEAPS").ok();
        let path = std::env::temp_dir().join(format!("nodeheap_env_{}.toml", std::process::id()));
        std::fs::write(&path, "max_heaps = 7\ndefault_heap_nodes = 9\n")
            .map_err(|e| Error::Config(e.to_string()))?;

        std::env::set_var("NODEHEAP_MAX_HEAPS", "42");
        let from_env = PoolConfig::load(None);
        let over_file = PoolConfig::load(Some(&path));

        std::env::set_var("NODEHEAP_MAX_HEAPS", "0");
        let zero = PoolConfig::load(Some(&path));

        match saved {
            Some(value) => std::env::set_var("NODEHEAP_MAX_HEAPS", value),
            None => std::env::remove_var("NODEHEAP_MAX_HEAPS"),
        }
        std::fs::remove_file(&path).ok();

        let from_env = from_env?;
        assert_eq!(from_env.max_heaps, 42);
        assert_eq!(from_env.default_heap_nodes, DEFAULT_HEAP_NODES);

        let over_file = over_file?;
        assert_eq!(over_file.max_heaps, 42);
        assert_eq!(over_file.default_heap_nodes, 9);

        assert!(matches!(zero, Err(Error::Config(_))));
        Ok(())
    }
}
