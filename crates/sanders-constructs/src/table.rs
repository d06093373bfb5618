//! Keyed table with a composite string key and on-demand billing.

use sanders_common::error::{InfraError, Result};
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::Reference;
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::json;

use crate::{Component, component_tags, require_non_empty};

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableProps {
    /// Account-unique table name.
    pub table_name: String,
    /// Partition (`HASH`) key attribute.
    pub partition_key: String,
    /// Sort (`RANGE`) key attribute.
    pub sort_key: String,
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Table name.
    pub table_name: Reference,
    /// Table ARN.
    pub table_arn: Reference,
}

/// Declares the table.
///
/// Point-in-time recovery is enabled only in `prod`; retention mirrors the
/// bucket's.
///
/// # Errors
///
/// Returns an error if a name or key is empty or invalid, or if both keys
/// name the same attribute.
pub fn declare(scope: &Scope, id: &str, props: &TableProps) -> Result<Component<Table>> {
    validate(props)?;
    let scope = scope.child(id, &component_tags(props.environment));
    let policy = props.environment.removal_policy();
    let pitr = props.environment.is_production();
    tracing::info!(scope = %scope, table = %props.table_name, pitr, "declaring table");

    let table = scope
        .declare("Table", ResourceKind::DynamoDbTable)
        .property("TableName", json!(props.table_name))
        .property(
            "AttributeDefinitions",
            json!([
                { "AttributeName": props.partition_key, "AttributeType": "S" },
                { "AttributeName": props.sort_key, "AttributeType": "S" },
            ]),
        )
        .property(
            "KeySchema",
            json!([
                { "AttributeName": props.partition_key, "KeyType": "HASH" },
                { "AttributeName": props.sort_key, "KeyType": "RANGE" },
            ]),
        )
        .property("BillingMode", json!("PAY_PER_REQUEST"))
        .property(
            "PointInTimeRecoverySpecification",
            json!({ "PointInTimeRecoveryEnabled": pitr }),
        )
        .removal_policy(policy);

    let logical_id = table.logical_id().to_owned();
    let mut resources = ResourceSet::new();
    resources.insert(table)?;

    Ok(Component {
        resources,
        accessors: Table {
            table_name: Reference::of(&logical_id),
            table_arn: Reference::attr(&logical_id, "Arn"),
        },
    })
}

fn validate(props: &TableProps) -> Result<()> {
    require_non_empty("partition key", &props.partition_key)?;
    require_non_empty("sort key", &props.sort_key)?;
    if props.partition_key == props.sort_key {
        return Err(InfraError::config(format!(
            "partition and sort key must differ, both are \"{}\"",
            props.sort_key
        )));
    }
    let name = &props.table_name;
    let charset_ok = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if !(3..=255).contains(&name.len()) || !charset_ok {
        return Err(InfraError::config(format!(
            "invalid table name \"{name}\": 3-255 letters, digits, '_', '-' or '.'"
        )));
    }
    Ok(())
}
