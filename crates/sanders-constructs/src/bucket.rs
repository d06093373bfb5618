//! Object storage bucket.
//!
//! One versioned, encrypted bucket with all public access blocked. In `prod`
//! the bucket and its objects are retained on stack deletion; elsewhere the
//! bucket is destroyed and marked for auto-deletion of its objects first, so
//! teardown does not fail on a non-empty bucket.

use sanders_common::error::{InfraError, Result};
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::Reference;
use sanders_manifest::resource::{AUTO_DELETE_OBJECTS_KEY, ResourceKind};
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::json;

use crate::{Component, component_tags};

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBucketProps {
    /// Globally unique bucket name.
    pub bucket_name: String,
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBucket {
    /// Bucket name.
    pub bucket_name: Reference,
    /// Bucket ARN.
    pub bucket_arn: Reference,
}

/// Declares the bucket.
///
/// # Errors
///
/// Returns an error if the bucket name is not a valid bucket name.
pub fn declare(scope: &Scope, id: &str, props: &StorageBucketProps) -> Result<Component<StorageBucket>> {
    validate_bucket_name(&props.bucket_name)?;
    let scope = scope.child(id, &component_tags(props.environment));
    let policy = props.environment.removal_policy();
    tracing::info!(scope = %scope, bucket = %props.bucket_name, removal = %policy, "declaring storage bucket");

    let mut bucket = scope
        .declare("Bucket", ResourceKind::S3Bucket)
        .property("BucketName", json!(props.bucket_name))
        .property("VersioningConfiguration", json!({ "Status": "Enabled" }))
        .property(
            "BucketEncryption",
            json!({
                "ServerSideEncryptionConfiguration": [{
                    "ServerSideEncryptionByDefault": { "SSEAlgorithm": "AES256" }
                }]
            }),
        )
        .property(
            "PublicAccessBlockConfiguration",
            json!({
                "BlockPublicAcls": true,
                "BlockPublicPolicy": true,
                "IgnorePublicAcls": true,
                "RestrictPublicBuckets": true,
            }),
        )
        .removal_policy(policy);
    if policy.auto_empty() {
        bucket = bucket.metadata(AUTO_DELETE_OBJECTS_KEY, json!(true));
    }

    let logical_id = bucket.logical_id().to_owned();
    let mut resources = ResourceSet::new();
    resources.insert(bucket)?;

    Ok(Component {
        resources,
        accessors: StorageBucket {
            bucket_name: Reference::of(&logical_id),
            bucket_arn: Reference::attr(&logical_id, "Arn"),
        },
    })
}

fn validate_bucket_name(name: &str) -> Result<()> {
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.');
    let edges_ok = name.chars().next().is_some_and(|c| c.is_ascii_alphanumeric())
        && name.chars().last().is_some_and(|c| c.is_ascii_alphanumeric());
    if !(3..=63).contains(&name.len()) || !charset_ok || !edges_ok {
        return Err(InfraError::config(format!(
            "invalid bucket name \"{name}\": 3-63 lowercase letters, digits, dots or hyphens"
        )));
    }
    Ok(())
}
