//! Provider-level configuration shared by every reconciler.

use driftguard_types::{DefaultTagRemoval, IgnoreTagsConfig, TagPolicy, TagSet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading provider configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("parsing provider configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid provider configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Settings applied across all managed entities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Tags applied to every taggable entity.
    pub default_tags: TagSet,
    /// Tag keys never shown back and never written.
    pub ignore_tags: IgnoreTagsConfig,
    /// How default tags are hidden from the declared-tags view.
    pub default_tag_removal: DefaultTagRemoval,
}

impl ProviderConfig {
    /// Parses and validates a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that could never be applied.
    pub fn validate(&self) -> ConfigResult<()> {
        for key in self.default_tags.keys() {
            if key.is_empty() {
                return Err(ConfigError::Invalid("default tag with empty key".into()));
            }
            if self.ignore_tags.ignores(key) {
                return Err(ConfigError::Invalid(format!(
                    "default tag {key:?} matches an ignore pattern and would never be written"
                )));
            }
        }
        if self.ignore_tags.keys.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid("empty ignored tag key".into()));
        }
        let prefixes = self
            .ignore_tags
            .key_prefixes
            .iter()
            .chain(&self.ignore_tags.system_prefixes);
        for prefix in prefixes {
            if prefix.is_empty() {
                // Would ignore every key.
                return Err(ConfigError::Invalid("empty ignored tag prefix".into()));
            }
        }
        Ok(())
    }

    /// The tag settings as a [`TagPolicy`].
    pub fn tag_policy(&self) -> TagPolicy {
        TagPolicy {
            default_tags: self.default_tags.clone(),
            ignore: self.ignore_tags.clone(),
            removal: self.default_tag_removal,
        }
    }
}
