//! Typed platform configuration.
//!
//! Configuration is assembled from layered [`ConfigOverrides`] (defaults,
//! an optional YAML file, environment variables, CLI flags) and resolved into
//! a fully typed [`PlatformConfig`] before any resource is declared.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    MANAGED_BY, PROJECT_NAME, RESERVED_TAG_KEYS, STACK_DESCRIPTION_PREFIX, STACK_NAME_PREFIX,
    TAG_ENVIRONMENT, TAG_MANAGED_BY, TAG_PROJECT,
};
use crate::error::{InfraError, Result};
use crate::tags::TagSet;
use crate::types::{AccountId, Environment, Region};

const MAX_STACK_NAME_LEN: usize = 128;
const MAX_DESCRIPTION_LEN: usize = 1024;
const MAX_TAG_KEY_LEN: usize = 128;
const MAX_TAG_VALUE_LEN: usize = 256;

/// Root configuration of one synthesis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformConfig {
    /// Deployment environment; selects the retention policy set.
    pub environment: Environment,
    /// Target account.
    pub account: AccountId,
    /// Target region.
    pub region: Region,
    /// Name of the deployed stack.
    pub stack_name: String,
    /// Human-readable stack description.
    pub description: String,
    /// Additional tags applied to every resource; may not use reserved keys.
    pub extra_tags: TagSet,
}

impl PlatformConfig {
    /// Creates a configuration with the default stack name and description
    /// for `environment`.
    #[must_use]
    pub fn new(environment: Environment, account: AccountId, region: Region) -> Self {
        Self {
            stack_name: default_stack_name(environment),
            description: default_description(environment),
            environment,
            account,
            region,
            extra_tags: TagSet::new(),
        }
    }

    /// Validates every field that is not already guaranteed by its type.
    ///
    /// # Errors
    ///
    /// Returns a [`InfraError::Config`] describing the first invalid field.
    pub fn validate(&self) -> Result<()> {
        tracing::debug!(stack = %self.stack_name, "validating platform configuration");
        validate_stack_name(&self.stack_name)?;
        if self.description.len() > MAX_DESCRIPTION_LEN {
            return Err(InfraError::config(format!(
                "stack description exceeds {MAX_DESCRIPTION_LEN} characters"
            )));
        }
        for (key, value) in self.extra_tags.iter() {
            if RESERVED_TAG_KEYS.contains(&key) {
                return Err(InfraError::config(format!(
                    "tag \"{key}\" is reserved and cannot be overridden"
                )));
            }
            if key.trim().is_empty() || key.len() > MAX_TAG_KEY_LEN {
                return Err(InfraError::config(format!(
                    "tag key \"{key}\" must be 1-{MAX_TAG_KEY_LEN} characters"
                )));
            }
            if value.len() > MAX_TAG_VALUE_LEN {
                return Err(InfraError::config(format!(
                    "value of tag \"{key}\" exceeds {MAX_TAG_VALUE_LEN} characters"
                )));
            }
        }
        Ok(())
    }

    /// Tags applied to the root scope, before any component is built.
    #[must_use]
    pub fn stack_tags(&self) -> TagSet {
        self.extra_tags.merge(
            &TagSet::new()
                .with(TAG_PROJECT, PROJECT_NAME)
                .with(TAG_ENVIRONMENT, self.environment.as_str())
                .with(TAG_MANAGED_BY, MANAGED_BY),
        )
    }
}

fn default_stack_name(environment: Environment) -> String {
    format!("{STACK_NAME_PREFIX}-{environment}")
}

fn default_description(environment: Environment) -> String {
    format!("{STACK_DESCRIPTION_PREFIX} - {environment}")
}

fn validate_stack_name(name: &str) -> Result<()> {
    let starts_alpha = name.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let charset_ok = name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
    if !starts_alpha || !charset_ok || name.len() > MAX_STACK_NAME_LEN {
        return Err(InfraError::config(format!(
            "stack name \"{name}\" must start with a letter, contain only letters, digits and hyphens, and be at most {MAX_STACK_NAME_LEN} characters"
        )));
    }
    Ok(())
}

/// One layer of partial configuration.
///
/// Every field is optional; [`ConfigOverrides::layer`] stacks layers with the
/// later one winning, and [`ConfigOverrides::resolve`] fills defaults and
/// validates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverrides {
    /// Environment name.
    pub environment: Option<String>,
    /// Account id.
    pub account: Option<String>,
    /// Region name.
    pub region: Option<String>,
    /// Stack name.
    pub stack_name: Option<String>,
    /// Stack description.
    pub description: Option<String>,
    /// Extra tags.
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

impl ConfigOverrides {
    /// Parses a YAML configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid YAML or names an
    /// unknown field.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Loads a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!(path = %path.display(), "loading configuration file");
        let content = std::fs::read_to_string(path).map_err(|e| InfraError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Stacks `higher` over `self`. Scalars in `higher` win when set; tag
    /// maps are merged with `higher` winning per key.
    #[must_use]
    pub fn layer(self, higher: Self) -> Self {
        let mut tags = self.tags;
        tags.extend(higher.tags);
        Self {
            environment: higher.environment.or(self.environment),
            account: higher.account.or(self.account),
            region: higher.region.or(self.region),
            stack_name: higher.stack_name.or(self.stack_name),
            description: higher.description.or(self.description),
            tags,
        }
    }

    /// Resolves into a validated [`PlatformConfig`].
    ///
    /// The environment defaults to `dev` and the region to the platform
    /// default; the account is required.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or any value is invalid.
    pub fn resolve(self) -> Result<PlatformConfig> {
        let environment = self
            .environment
            .as_deref()
            .map_or_else(|| Ok(Environment::default()), str::parse::<Environment>)?;
        let account = self
            .account
            .ok_or_else(|| InfraError::config("missing account context (set --account or SANDERS_ACCOUNT)"))
            .and_then(AccountId::parse)?;
        let region = self.region.map_or_else(|| Ok(Region::default()), Region::parse)?;

        let mut config = PlatformConfig::new(environment, account, region);
        if let Some(name) = self.stack_name {
            config.stack_name = name;
        }
        if let Some(description) = self.description {
            config.description = description;
        }
        config.extra_tags = self.tags.into_iter().collect();
        config.validate()?;
        Ok(config)
    }
}
