//! Configuration read once when a store is built.
//!
//! Environment variables:
//! - `STAGEHAND_REGION` (falls back to `AWS_REGION`, then `us-east-1`)
//! - `STAGEHAND_ENDPOINT` optional custom endpoint for S3-compatible stores
//! - `STAGEHAND_POOL_SIZE` session pool bound, default `5 × available cores`
//!
//! With the `config` feature a TOML file can supply the same settings; the
//! environment still wins over the file.

use crate::error::{Result, StagehandError};
use crate::pool::default_pool_size;

pub const REGION_VAR: &str = "STAGEHAND_REGION";
pub const FALLBACK_REGION_VAR: &str = "AWS_REGION";
pub const ENDPOINT_VAR: &str = "STAGEHAND_ENDPOINT";
pub const POOL_SIZE_VAR: &str = "STAGEHAND_POOL_SIZE";

pub const DEFAULT_REGION: &str = "us-east-1";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct StoreConfig {
    pub region: String,
    pub endpoint: Option<String>,
    pub pool_size: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            pool_size: default_pool_size(),
        }
    }
}

impl StoreConfig {
    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Defaults overridden through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().with_overrides(lookup)
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup(REGION_VAR).or_else(|| lookup(FALLBACK_REGION_VAR)) {
            self.region = region;
        }
        if let Some(endpoint) = lookup(ENDPOINT_VAR).filter(|e| !e.is_empty()) {
            self.endpoint = Some(endpoint);
        }
        if let Some(raw) = lookup(POOL_SIZE_VAR) {
            self.pool_size = parse_pool_size(&raw)?;
        }
        Ok(self)
    }

    /// Parse a TOML document; missing keys keep their defaults
    #[cfg(feature = "config")]
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Self = toml::from_str(document)
            .map_err(|e| StagehandError::config(format!("invalid configuration file: {e}")))?;
        if config.pool_size == 0 {
            return Err(StagehandError::config("pool_size must be a positive integer"));
        }
        Ok(config)
    }

    /// Load `<config dir>/stagehand/config.toml` if present, then apply the environment
    #[cfg(feature = "config")]
    pub fn load_default_file() -> Result<Self> {
        let path = dirs::config_dir().map(|dir| dir.join("stagehand").join("config.toml"));
        let base = match path {
            Some(path) if path.is_file() => {
                let document = std::fs::read_to_string(&path).map_err(|e| {
                    StagehandError::file_error(
                        format!("Failed to read configuration {}", path.display()),
                        e,
                    )
                })?;
                Self::from_toml_str(&document)?
            }
            _ => Self::default(),
        };
        base.with_overrides(|name| std::env::var(name).ok())
    }
}

fn parse_pool_size(raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(size) if size > 0 => Ok(size),
        _ => Err(StagehandError::config(format!(
            "{POOL_SIZE_VAR} must be a positive integer, got {raw:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StoreConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.endpoint, None);
        assert_eq!(config.pool_size, default_pool_size());
    }

    #[test]
    fn test_overrides() {
        let config = StoreConfig::from_lookup(lookup(&[
            (REGION_VAR, "eu-west-1"),
            (FALLBACK_REGION_VAR, "ap-south-1"),
            (ENDPOINT_VAR, "http://127.0.0.1:9000"),
            (POOL_SIZE_VAR, " 12 "),
        ]))
        .unwrap();
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert_eq!(config.pool_size, 12);
    }

    #[test]
    fn test_region_fallback() {
        let config = StoreConfig::from_lookup(lookup(&[(FALLBACK_REGION_VAR, "ap-south-1")])).unwrap();
        assert_eq!(config.region, "ap-south-1");
    }

    #[test]
    fn test_invalid_pool_size() {
        for raw in ["0", "-3", "many"] {
            let result = StoreConfig::from_lookup(lookup(&[(POOL_SIZE_VAR, raw)]));
            assert!(matches!(result, Err(StagehandError::ConfigError { .. })));
        }
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_toml_document() {
        let config = StoreConfig::from_toml_str("region = \"us-west-2\"\npool_size = 3\n").unwrap();
        assert_eq!(config.region, "us-west-2");
        assert_eq!(config.pool_size, 3);
        assert_eq!(config.endpoint, None);

        assert!(StoreConfig::from_toml_str("pool_size = 0").is_err());
    }
}
