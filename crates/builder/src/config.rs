use crate::error::{BuilderError, Result};
use serde::{Deserialize, Serialize};
use sheet_context_chunker::{CompressorConfig, DetectorConfig};
use sheet_context_search::{parse_flag, LocatorConfig};
use std::path::Path;

/// Env var switching off the `_diagnostic` wire block
pub const PRODUCTION_ENV: &str = "SHEET_CONTEXT_PRODUCTION";

/// Everything the context builder needs, constructed once at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Production mode omits diagnostics from the wire payload
    pub production: bool,
    pub compressor: CompressorConfig,
    pub detector: DetectorConfig,
    pub locator: LocatorConfig,
}

impl ContextConfig {
    /// Load from a TOML file; missing keys take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        log::debug!("Loaded context config from {}", path.display());
        Ok(config)
    }

    /// Optional file, then process environment
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.compressor
            .validate()
            .map_err(|e| BuilderError::Config(format!("compressor: {e}")))?;
        self.detector
            .validate()
            .map_err(|e| BuilderError::Config(format!("detector: {e}")))?;
        self.locator
            .validate()
            .map_err(|e| BuilderError::Config(format!("locator: {e}")))?;
        Ok(())
    }

    /// Apply `SHEET_CONTEXT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|var| std::env::var(var).ok());
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup(PRODUCTION_ENV).as_deref().and_then(parse_flag) {
            self.production = flag;
        }
        self.locator.apply_overrides_from(lookup);
    }
}
