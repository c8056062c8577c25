//! Workspace configuration model.
//!
//! Stored as `.gait/config.toml`. Every field has a default, so a missing file
//! or a partial one is always usable.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{GaitError, Result};
use crate::matching::{ExactMatchOptions, FuzzyMatchOptions};

pub const MIN_MONITOR_INTERVAL_MS: u64 = 250;
pub const MAX_MONITOR_INTERVAL_MS: u64 = 60_000;

/// What the monitor does with an observed chat that is not stored yet.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
pub enum StashPolicy {
    /// Store every new chat immediately
    #[default]
    AddAllChats,
    /// Hold new chats in the staging area until promoted
    OnlyMatchedChats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GaitConfig {
    /// State file name inside the `.gait` directory
    pub state_file: String,
    /// Write the state file gzip-compressed
    pub compress_state: bool,
    pub monitor_interval_ms: u64,
    pub stash_policy: StashPolicy,
    /// Minimum fuzzy block similarity, in (0, 1]
    pub similarity_threshold: f64,
    pub exact_min_added_lines: usize,
    pub exact_min_alphanumeric_lines: usize,
    pub fuzzy_max_document_lines: usize,
    pub fuzzy_max_added_lines: usize,
    /// Skip fuzzy matching above this many added × document line pairs
    pub fuzzy_max_line_comparisons: usize,
    /// Fuzzy windows scored per document before giving up
    pub fuzzy_max_window_evaluations: u64,
    /// Extra regexes stripped from message text
    pub sanitize_patterns: Vec<String>,
    /// Record matched document paths in `kv_store.file_paths`
    pub record_file_associations: bool,
}

impl Default for GaitConfig {
    fn default() -> Self {
        let exact = ExactMatchOptions::default();
        let fuzzy = FuzzyMatchOptions::default();
        Self {
            state_file: "stashed_state.json".to_string(),
            compress_state: false,
            monitor_interval_ms: 2_000,
            stash_policy: StashPolicy::default(),
            similarity_threshold: fuzzy.threshold,
            exact_min_added_lines: exact.min_added_lines,
            exact_min_alphanumeric_lines: exact.min_alphanumeric_lines,
            fuzzy_max_document_lines: fuzzy.max_document_lines,
            fuzzy_max_added_lines: fuzzy.max_added_lines,
            fuzzy_max_line_comparisons: fuzzy.max_line_comparisons,
            fuzzy_max_window_evaluations: fuzzy.max_window_evaluations,
            sanitize_patterns: Vec::new(),
            record_file_associations: true,
        }
    }
}

impl GaitConfig {
    /// Checks value ranges and pattern syntax.
    ///
    /// # Errors
    ///
    /// Returns [`GaitError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        if self.state_file.trim().is_empty() {
            return Err(GaitError::config("state_file must not be empty"));
        }
        if self.state_file.contains(['/', '\\']) {
            return Err(GaitError::config(format!(
                "state_file must be a plain file name, got '{}'",
                self.state_file
            )));
        }
        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(GaitError::config(format!(
                "similarity_threshold must be in (0, 1], got {}",
                self.similarity_threshold
            )));
        }
        if self.fuzzy_max_added_lines == 0 {
            return Err(GaitError::config("fuzzy_max_added_lines must be positive"));
        }
        for pattern in &self.sanitize_patterns {
            regex::Regex::new(pattern)
                .map_err(|e| GaitError::config(format!("invalid sanitize pattern '{}': {}", pattern, e)))?;
        }
        Ok(())
    }

    /// Tick interval, clamped to the supported range.
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(
            self.monitor_interval_ms
                .clamp(MIN_MONITOR_INTERVAL_MS, MAX_MONITOR_INTERVAL_MS),
        )
    }

    pub fn exact_options(&self) -> ExactMatchOptions {
        ExactMatchOptions {
            min_added_lines: self.exact_min_added_lines,
            min_alphanumeric_lines: self.exact_min_alphanumeric_lines,
        }
    }

    pub fn fuzzy_options(&self) -> FuzzyMatchOptions {
        FuzzyMatchOptions {
            threshold: self.similarity_threshold,
            max_document_lines: self.fuzzy_max_document_lines,
            max_added_lines: self.fuzzy_max_added_lines,
            max_line_comparisons: self.fuzzy_max_line_comparisons,
            max_window_evaluations: self.fuzzy_max_window_evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: GaitConfig = toml::from_str(
            r#"
stash_policy = "OnlyMatchedChats"
similarity_threshold = 0.9
"#,
        )
        .unwrap();
        assert_eq!(config.stash_policy, StashPolicy::OnlyMatchedChats);
        assert_eq!(config.similarity_threshold, 0.9);
        assert_eq!(config.state_file, "stashed_state.json");
        assert!(config.record_file_associations);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let config = GaitConfig {
            similarity_threshold: 0.0,
            ..GaitConfig::default()
        };
        assert!(matches!(config.validate(), Err(GaitError::Config(_))));

        let config = GaitConfig {
            sanitize_patterns: vec!["[".to_string()],
            ..GaitConfig::default()
        };
        assert!(config.validate().is_err());

        let config = GaitConfig {
            state_file: "../escape.json".to_string(),
            ..GaitConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_is_clamped() {
        let mut config = GaitConfig::default();
        assert_eq!(config.monitor_interval(), Duration::from_millis(2_000));
        config.monitor_interval_ms = 10;
        assert_eq!(config.monitor_interval(), Duration::from_millis(250));
        config.monitor_interval_ms = 3_600_000;
        assert_eq!(config.monitor_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_policy_strings() {
        assert_eq!(StashPolicy::AddAllChats.to_string(), "AddAllChats");
        assert_eq!(
            StashPolicy::from_str("OnlyMatchedChats").unwrap(),
            StashPolicy::OnlyMatchedChats
        );
    }

    #[test]
    fn test_fuzzy_limits_reach_matcher_options() {
        let config: GaitConfig = toml::from_str("fuzzy_max_window_evaluations = 1000").unwrap();
        let options = config.fuzzy_options();
        assert_eq!(options.max_window_evaluations, 1000);
        assert_eq!(
            options.max_line_comparisons,
            FuzzyMatchOptions::default().max_line_comparisons
        );
    }
}
