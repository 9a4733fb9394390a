//! TOML configuration for a harvest run.
//!
//! Every section is optional; omitted values fall back to the defaults a
//! rate-limit-friendly collection of a few hundred posts needs.

use crate::error::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "harvest.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    pub listing: ListingConfig,
    pub collection: CollectionConfig,
    pub retry: RetrySettings,
    pub pacing: PacingConfig,
    pub source: SourceConfig,
    pub output_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Listing categories fetched in order, e.g. `hot`, `top`, `new`.
    pub categories: Vec<String>,
    /// Total listing budget, split evenly across categories.
    pub initial_fetch_limit: usize,
    /// Time window for `top`/`controversial` listings.
    pub time_filter: String,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            categories: vec!["hot".to_string(), "top".to_string()],
            initial_fetch_limit: 700,
            time_filter: "all".to_string(),
        }
    }
}

impl ListingConfig {
    pub fn per_category_limit(&self) -> usize {
        (self.initial_fetch_limit / self.categories.len().max(1)).max(1)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResumeMode {
    /// Finalize straight from a non-empty checkpoint without refetching listings.
    #[default]
    Checkpoint,
    /// Refetch and re-rank, skipping posts the checkpoint already holds.
    Rerank,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub target_posts: usize,
    pub batch_size: usize,
    /// Newly collected posts between checkpoint saves.
    pub checkpoint_interval: usize,
    pub resume: ResumeMode,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            target_posts: 500,
            batch_size: 10,
            checkpoint_interval: 10,
            resume: ResumeMode::Checkpoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Attempts per call, including the first.
    pub max_attempts: u32,
    pub base_delay_secs: f64,
    pub rate_limit_base_delay_secs: f64,
    pub max_delay_secs: f64,
    /// Jitter is a fraction of the capped delay drawn from `[jitter_min, jitter_max)`.
    pub jitter_min: f64,
    pub jitter_max: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_secs: 1.0,
            rate_limit_base_delay_secs: 60.0,
            max_delay_secs: 300.0,
            jitter_min: 0.1,
            jitter_max: 0.3,
        }
    }
}

/// Inclusive-exclusive range of seconds a paced wait is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayRange(pub f64, pub f64);

impl DelayRange {
    pub fn min(&self) -> Duration {
        Duration::from_secs_f64(self.0)
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs_f64(self.1)
    }

    fn check(&self, field: &str) -> Result<(), ConfigError> {
        if !(self.0.is_finite() && self.1.is_finite()) || self.0 < 0.0 || self.0 > self.1 {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                value: format!("[{}, {}]", self.0, self.1),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    pub category_delay_secs: DelayRange,
    pub item_delay_secs: DelayRange,
    pub batch_delay_secs: DelayRange,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            category_delay_secs: DelayRange(2.0, 5.0),
            item_delay_secs: DelayRange(1.0, 3.0),
            batch_delay_secs: DelayRange(10.0, 20.0),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.reddit.com".to_string(),
            user_agent: concat!("harvest/", env!("CARGO_PKG_VERSION")).to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl HarvestConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: HarvestConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from an explicit path; the file must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&raw)
    }

    /// Load `path` if given, else `harvest.toml` from the working directory
    /// if present, else defaults.
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(explicit) => Self::load(explicit),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    debug!("No configuration file found, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listing.categories.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "at least one listing category is required".to_string(),
            });
        }
        if self.collection.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.collection.checkpoint_interval == 0 {
            return Err(ConfigError::InvalidValue {
                field: "collection.checkpoint_interval".to_string(),
                value: "0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "retry.max_attempts".to_string(),
                value: "0".to_string(),
            });
        }

        let retry = &self.retry;
        for (field, value) in [
            ("retry.base_delay_secs", retry.base_delay_secs),
            (
                "retry.rate_limit_base_delay_secs",
                retry.rate_limit_base_delay_secs,
            ),
            ("retry.max_delay_secs", retry.max_delay_secs),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: value.to_string(),
                });
            }
        }
        if !(0.0..1.0).contains(&retry.jitter_min)
            || !(0.0..1.0).contains(&retry.jitter_max)
            || retry.jitter_min > retry.jitter_max
        {
            return Err(ConfigError::ValidationFailed {
                reason: format!(
                    "jitter range [{}, {}) must lie within [0, 1)",
                    retry.jitter_min, retry.jitter_max
                ),
            });
        }

        self.pacing
            .category_delay_secs
            .check("pacing.category_delay_secs")?;
        self.pacing.item_delay_secs.check("pacing.item_delay_secs")?;
        self.pacing.batch_delay_secs.check("pacing.batch_delay_secs")?;
        Ok(())
    }

    /// `{subreddit}_posts_text.json` under the output directory.
    pub fn output_path(&self, subreddit: &str) -> PathBuf {
        self.output_dir.join(output_file_name(subreddit))
    }
}

pub fn output_file_name(subreddit: &str) -> String {
    format!("{}_posts_text.json", subreddit)
}

/// Subreddit names are non-empty ASCII letters, digits and underscores,
/// which also keeps derived file names inside the output directory.
pub fn validate_subreddit(subreddit: &str) -> Result<(), CoreError> {
    if subreddit.is_empty() {
        return Err(CoreError::InvalidInput {
            message: "subreddit name is required".to_string(),
        });
    }
    if !subreddit
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(CoreError::InvalidInput {
            message: format!(
                "'{}' is not a valid subreddit name (letters, digits and underscores only)",
                subreddit
            ),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subreddit_names() {
        assert!(validate_subreddit("rust").is_ok());
        assert!(validate_subreddit("Ask_Science2").is_ok());

        for bad in ["", "../escaped", "a/b", "r/rust", "with space", "dot.name"] {
            assert!(
                matches!(validate_subreddit(bad), Err(CoreError::InvalidInput { .. })),
                "{:?} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_defaults_match_reference_run() {
        let config = HarvestConfig::default();
        assert_eq!(config.listing.categories, vec!["hot", "top"]);
        assert_eq!(config.listing.per_category_limit(), 350);
        assert_eq!(config.collection.target_posts, 500);
        assert_eq!(config.collection.batch_size, 10);
        assert_eq!(config.collection.checkpoint_interval, 10);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.max_delay_secs, 300.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = HarvestConfig::from_toml_str(
            r#"
            output_dir = "out"

            [listing]
            categories = ["new"]

            [collection]
            resume = "rerank"

            [pacing]
            item_delay_secs = [0.5, 0.5]
            "#,
        )
        .unwrap();

        assert_eq!(config.listing.categories, vec!["new"]);
        assert_eq!(config.listing.initial_fetch_limit, 700);
        assert_eq!(config.collection.resume, ResumeMode::Rerank);
        assert_eq!(config.pacing.item_delay_secs, DelayRange(0.5, 0.5));
        assert_eq!(config.pacing.batch_delay_secs, DelayRange(10.0, 20.0));
        assert_eq!(
            config.output_path("rust"),
            PathBuf::from("out").join("rust_posts_text.json")
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = HarvestConfig::default();
        config.collection.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let mut config = HarvestConfig::default();
        config.listing.categories.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationFailed { .. })
        ));

        let mut config = HarvestConfig::default();
        config.pacing.batch_delay_secs = DelayRange(20.0, 10.0);
        assert!(config.validate().is_err());

        let mut config = HarvestConfig::default();
        config.retry.jitter_max = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let result = HarvestConfig::from_toml_str("[listing\ncategories = 3");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        assert!(matches!(
            HarvestConfig::load(&path),
            Err(ConfigError::FileNotFound { .. })
        ));
    }
}
