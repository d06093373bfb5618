//! Domain primitive types used across the sanders-infra workspace.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{InfraError, Result};

/// Deployment environment.
///
/// Drives the retention policy of every stateful resource: `prod` retains
/// and protects, everything else is destroyed and auto-cleaned.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Development; the least destructive default.
    #[default]
    Dev,
    /// Production.
    Prod,
}

impl Environment {
    /// Every recognized environment, in declaration order.
    pub const ALL: [Self; 2] = [Self::Dev, Self::Prod];

    /// Returns the lowercase name used in physical names and tags.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Whether this is the production environment.
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Prod)
    }

    /// Retention policy applied to stateful resources in this environment.
    #[must_use]
    pub const fn removal_policy(self) -> RemovalPolicy {
        if self.is_production() {
            RemovalPolicy::Retain
        } else {
            RemovalPolicy::Destroy
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = InfraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == s.trim())
            .ok_or_else(|| {
                InfraError::config(format!(
                    "unrecognized environment \"{s}\" (expected one of: dev, prod)"
                ))
            })
    }
}

/// What happens to a resource (and its contents) when the stack is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemovalPolicy {
    /// Keep the resource; contents are never emptied.
    Retain,
    /// Delete the resource, emptying it first.
    Destroy,
}

impl RemovalPolicy {
    /// The provider's `DeletionPolicy` attribute value.
    #[must_use]
    pub const fn deletion_policy(self) -> &'static str {
        match self {
            Self::Retain => "Retain",
            Self::Destroy => "Delete",
        }
    }

    /// Whether contents are removed before the resource is deleted.
    #[must_use]
    pub const fn auto_empty(self) -> bool {
        matches!(self, Self::Destroy)
    }
}

impl fmt::Display for RemovalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retain => write!(f, "retain"),
            Self::Destroy => write!(f, "destroy"),
        }
    }
}

/// Twelve-digit cloud account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Parses and validates an account id.
    ///
    /// # Errors
    ///
    /// Returns an error unless the input is exactly 12 ASCII digits.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.len() != 12 || !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(InfraError::config(format!(
                "account id must be 12 digits, got \"{id}\""
            )));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Cloud region name such as `eu-central-1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region(String);

impl Region {
    /// Parses and validates a region name.
    ///
    /// Accepts lowercase `area-location-N` forms, including longer
    /// partition-qualified ones such as `us-gov-west-1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the name does not have that shape.
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let parts: Vec<&str> = name.split('-').collect();
        let words_ok = parts.len() >= 3
            && parts[..parts.len() - 1]
                .iter()
                .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_lowercase()));
        let number_ok = parts
            .last()
            .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
        if !(words_ok && number_ok) {
            return Err(InfraError::config(format!("invalid region \"{name}\"")));
        }
        Ok(Self(name))
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Region {
    fn default() -> Self {
        Self(crate::constants::DEFAULT_REGION.to_owned())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_defaults_to_dev() {
        assert_eq!(Environment::default(), Environment::Dev);
    }

    #[test]
    fn environment_parses_known_values() {
        assert_eq!("dev".parse::<Environment>().expect("dev"), Environment::Dev);
        assert_eq!(
            " prod ".parse::<Environment>().expect("prod"),
            Environment::Prod
        );
    }

    #[test]
    fn environment_rejects_unknown_values() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(err.to_string().contains("staging"), "got: {err}");
    }

    #[test]
    fn removal_policy_follows_environment() {
        assert_eq!(Environment::Prod.removal_policy(), RemovalPolicy::Retain);
        assert_eq!(Environment::Dev.removal_policy(), RemovalPolicy::Destroy);
        assert!(!RemovalPolicy::Retain.auto_empty());
        assert!(RemovalPolicy::Destroy.auto_empty());
        assert_eq!(RemovalPolicy::Destroy.deletion_policy(), "Delete");
    }

    #[test]
    fn account_id_requires_twelve_digits() {
        assert!(AccountId::parse("123456789012").is_ok());
        assert!(AccountId::parse("12345").is_err());
        assert!(AccountId::parse("12345678901a").is_err());
    }

    #[test]
    fn region_validation() {
        assert!(Region::parse("eu-central-1").is_ok());
        assert!(Region::parse("us-gov-west-1").is_ok());
        assert!(Region::parse("EU-central-1").is_err());
        assert!(Region::parse("central").is_err());
        assert!(Region::parse("eu-central-").is_err());
        assert_eq!(Region::default().as_str(), "eu-central-1");
    }
}
