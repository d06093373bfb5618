//! Fluent API for configuring and synthesizing the platform.

use sanders_common::config::{ConfigOverrides, PlatformConfig};
use sanders_common::error::Result;
use sanders_common::types::Environment;

use crate::platform::synthesize;
use crate::stack::Stack;

/// Builder for a [`PlatformConfig`], resolved and synthesized in one call.
///
/// Values set on the builder win over the `base` layer given to
/// [`PlatformBuilder::from_overrides`].
#[derive(Debug, Default)]
pub struct PlatformBuilder {
    base: ConfigOverrides,
    top: ConfigOverrides,
}

impl PlatformBuilder {
    /// Creates a builder with nothing set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder on top of an already layered configuration.
    #[must_use]
    pub fn from_overrides(base: ConfigOverrides) -> Self {
        Self {
            base,
            top: ConfigOverrides::default(),
        }
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.top.environment = Some(environment.as_str().to_owned());
        self
    }

    /// Sets the target account id.
    #[must_use]
    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.top.account = Some(account.into());
        self
    }

    /// Sets the target region.
    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.top.region = Some(region.into());
        self
    }

    /// Overrides the stack name.
    #[must_use]
    pub fn stack_name(mut self, name: impl Into<String>) -> Self {
        self.top.stack_name = Some(name.into());
        self
    }

    /// Overrides the stack description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.top.description = Some(description.into());
        self
    }

    /// Adds a tag applied to every resource.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.top.tags.insert(key.into(), value.into());
        self
    }

    /// Resolves and validates the configuration without synthesizing.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is missing or any value is invalid.
    pub fn config(self) -> Result<PlatformConfig> {
        self.base.layer(self.top).resolve()
    }

    /// Resolves the configuration and synthesizes the stack.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration or synthesis fails.
    pub fn build(self) -> Result<Stack> {
        let config = self.config()?;
        synthesize(&config)
    }
}
