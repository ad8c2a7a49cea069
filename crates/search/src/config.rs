use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Env var toggling model-assisted refinement
pub const MODEL_REFINEMENT_ENV: &str = "SHEET_CONTEXT_MODEL_REFINEMENT";

/// Env var toggling naive (name-only) selection
pub const NAIVE_SELECTION_ENV: &str = "SHEET_CONTEXT_NAIVE_SELECTION";

/// Chunk Locator options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Ask the refinement collaborator for a final judgment
    pub enable_model_refinement: bool,

    /// Skip scoring; pick sheets named in the conversation plus the active sheet
    pub use_naive_selection: bool,

    /// Upper bound on one refinement call
    pub refinement_timeout_ms: u64,

    /// How many top candidates are sent for refinement
    pub refinement_candidates: usize,

    /// Chunks scoring below this are not returned
    pub min_confidence: f32,

    /// Maximum number of located chunks
    pub max_results: usize,

    /// Added to every chunk on the active sheet
    pub active_sheet_bonus: f32,

    /// Score range chunks alongside sheet chunks
    pub include_ranges: bool,

    /// Number of recent user messages mixed into the query
    pub history_window: usize,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            enable_model_refinement: false,
            use_naive_selection: false,
            refinement_timeout_ms: 3_000,
            refinement_candidates: 8,
            min_confidence: 0.35,
            max_results: 5,
            active_sheet_bonus: 0.15,
            include_ranges: true,
            history_window: 4,
        }
    }
}

impl LocatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(SearchError::Config(format!(
                "min_confidence must be in [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self.max_results == 0 {
            return Err(SearchError::Config("max_results must be > 0".to_string()));
        }
        if self.enable_model_refinement && self.refinement_timeout_ms == 0 {
            return Err(SearchError::Config(
                "refinement_timeout_ms must be > 0 when refinement is enabled".to_string(),
            ));
        }
        if self.enable_model_refinement && self.refinement_candidates == 0 {
            return Err(SearchError::Config(
                "refinement_candidates must be > 0 when refinement is enabled".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub const fn refinement_timeout(&self) -> Duration {
        Duration::from_millis(self.refinement_timeout_ms)
    }

    /// Apply `SHEET_CONTEXT_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|var| std::env::var(var).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(flag) = lookup(MODEL_REFINEMENT_ENV).as_deref().and_then(parse_flag) {
            self.enable_model_refinement = flag;
        }
        if let Some(flag) = lookup(NAIVE_SELECTION_ENV).as_deref().and_then(parse_flag) {
            self.use_naive_selection = flag;
        }
    }
}

/// `1/true/yes/on` and `0/false/no/off`, case-insensitive; anything else is ignored
#[must_use]
pub fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if ["1", "true", "yes", "on"].iter().any(|v| raw.eq_ignore_ascii_case(v)) {
        Some(true)
    } else if ["0", "false", "no", "off"].iter().any(|v| raw.eq_ignore_ascii_case(v)) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_valid() {
        let config = LocatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.refinement_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_validation() {
        let mut config = LocatorConfig {
            min_confidence: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.min_confidence = 0.3;
        config.enable_model_refinement = true;
        config.refinement_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [(MODEL_REFINEMENT_ENV, "TRUE"), (NAIVE_SELECTION_ENV, "maybe")]
            .into_iter()
            .collect();
        let mut config = LocatorConfig::default();
        config.apply_overrides_from(|var| vars.get(var).map(|v| (*v).to_string()));

        assert!(config.enable_model_refinement);
        assert!(!config.use_naive_selection);
    }

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag(" on "), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(""), None);
    }
}
