//! # sanders-constructs
//!
//! The leaf components of the platform. Each is a pure function from
//! `(scope, id, props)` to a [`Component`]: the declarations it owns plus the
//! accessor values downstream components reference.
//!
//! Leaf-first order:
//! - [`bucket`]: object storage.
//! - [`table`]: keyed table.
//! - [`registry`]: container image repository.
//! - [`network`]: VPC, subnets, NAT egress, security group.
//! - [`roles`]: batch service, task execution and job roles.
//! - [`compute`]: compute environment, job queue, job definitions.
//! - [`workflow`]: state machine orchestrating the batch jobs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::panic))]

pub mod bucket;
pub mod compute;
pub mod network;
pub mod policy;
pub mod registry;
pub mod roles;
pub mod table;
pub mod workflow;

use sanders_common::constants::{SERVICE_NAME, SHORT_PREFIX, TAG_ENVIRONMENT, TAG_SERVICE};
use sanders_common::error::{InfraError, Result};
use sanders_common::tags::TagSet;
use sanders_common::types::Environment;
use sanders_manifest::set::ResourceSet;

/// Declarations owned by one component, plus what it exposes.
#[derive(Debug, Clone)]
pub struct Component<A> {
    /// Every declaration the component owns.
    pub resources: ResourceSet,
    /// Accessor values for downstream components.
    pub accessors: A,
}

/// Tags every component adds to its own scope.
#[must_use]
pub fn component_tags(environment: Environment) -> TagSet {
    TagSet::new()
        .with(TAG_ENVIRONMENT, environment.as_str())
        .with(TAG_SERVICE, SERVICE_NAME)
}

/// `sanders-{purpose}-{environment}`.
#[must_use]
pub fn physical_name(purpose: &str, environment: Environment) -> String {
    format!("{SHORT_PREFIX}-{purpose}-{environment}")
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(InfraError::config(format!("{what} must not be empty")));
    }
    Ok(())
}
