//! Container image repository.
//!
//! Images are scanned on push and capped at [`MAX_IMAGE_COUNT`]; once the cap
//! is exceeded the oldest images are expired regardless of tag status.

use sanders_common::error::{InfraError, Result};
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::Reference;
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde::Serialize;
use serde_json::json;

use crate::{Component, component_tags};

/// Images kept before the oldest are expired.
pub const MAX_IMAGE_COUNT: u32 = 10;

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryProps {
    /// Repository name.
    pub repository_name: String,
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    /// Pullable repository URI (without tag).
    pub repository_uri: Reference,
    /// Repository ARN.
    pub repository_arn: Reference,
    /// Repository name.
    pub repository_name: Reference,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecyclePolicy {
    rules: Vec<LifecycleRule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LifecycleRule {
    rule_priority: u32,
    description: &'static str,
    selection: Selection,
    action: Action,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Selection {
    tag_status: &'static str,
    count_type: &'static str,
    count_number: u32,
}

#[derive(Serialize)]
struct Action {
    #[serde(rename = "type")]
    kind: &'static str,
}

fn lifecycle_policy_text() -> Result<String> {
    let policy = LifecyclePolicy {
        rules: vec![LifecycleRule {
            rule_priority: 1,
            description: "Keep last 10 images",
            selection: Selection {
                tag_status: "any",
                count_type: "imageCountMoreThan",
                count_number: MAX_IMAGE_COUNT,
            },
            action: Action { kind: "expire" },
        }],
    };
    Ok(serde_json::to_string(&policy)?)
}

/// Declares the repository.
///
/// `EmptyOnDelete` is the inverse of retention: `false` in `prod`, `true`
/// elsewhere.
///
/// # Errors
///
/// Returns an error if the repository name is invalid.
pub fn declare(scope: &Scope, id: &str, props: &RegistryProps) -> Result<Component<Registry>> {
    validate_repository_name(&props.repository_name)?;
    let scope = scope.child(id, &component_tags(props.environment));
    let policy = props.environment.removal_policy();
    tracing::info!(scope = %scope, repository = %props.repository_name, removal = %policy, "declaring registry");

    let repository = scope
        .declare("Repository", ResourceKind::EcrRepository)
        .property("RepositoryName", json!(props.repository_name))
        .property("ImageScanningConfiguration", json!({ "ScanOnPush": true }))
        .property("EmptyOnDelete", json!(policy.auto_empty()))
        .property(
            "LifecyclePolicy",
            json!({ "LifecyclePolicyText": lifecycle_policy_text()? }),
        )
        .removal_policy(policy);

    let logical_id = repository.logical_id().to_owned();
    let mut resources = ResourceSet::new();
    resources.insert(repository)?;

    Ok(Component {
        resources,
        accessors: Registry {
            repository_uri: Reference::attr(&logical_id, "RepositoryUri"),
            repository_arn: Reference::attr(&logical_id, "Arn"),
            repository_name: Reference::of(&logical_id),
        },
    })
}

fn validate_repository_name(name: &str) -> Result<()> {
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '/'));
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric());
    if !(2..=256).contains(&name.len()) || !charset_ok || !starts_ok {
        return Err(InfraError::config(format!(
            "invalid repository name \"{name}\""
        )));
    }
    Ok(())
}
