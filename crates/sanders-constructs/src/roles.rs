//! Trust identities for the batch pipeline.
//!
//! - The service role lets the batch service manage compute on our behalf.
//! - The execution role lets container tasks pull images and publish logs.
//! - The job role is what the job code itself runs as: bucket objects, the
//!   one table, and log publishing.

use sanders_common::error::Result;
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::{self, Reference};
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::{Value, json};

use crate::policy::{
    BATCH_PRINCIPAL, ECS_TASKS_PRINCIPAL, PolicyDocument, PolicyStatement, trust_policy,
    warn_wildcards,
};
use crate::{Component, component_tags, physical_name};

/// Managed policy attached to the service role.
pub const BATCH_SERVICE_POLICY: &str = "service-role/AWSBatchServiceRole";
/// Managed policy attached to the execution role.
pub const TASK_EXECUTION_POLICY: &str = "service-role/AmazonECSTaskExecutionRolePolicy";

const S3_ACTIONS: [&str; 4] = [
    "s3:GetObject",
    "s3:PutObject",
    "s3:DeleteObject",
    "s3:ListBucket",
];

const DYNAMODB_ACTIONS: [&str; 8] = [
    "dynamodb:PutItem",
    "dynamodb:GetItem",
    "dynamodb:UpdateItem",
    "dynamodb:DeleteItem",
    "dynamodb:Query",
    "dynamodb:Scan",
    "dynamodb:BatchWriteItem",
    "dynamodb:BatchGetItem",
];

// Granted on "*", i.e. every log group in the account.
const LOGS_ACTIONS: [&str; 3] = [
    "logs:CreateLogGroup",
    "logs:CreateLogStream",
    "logs:PutLogEvents",
];

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRolesProps {
    /// ARN of the data bucket.
    pub storage_arn: Reference,
    /// ARN of the features table.
    pub table_arn: Reference,
    /// Deployment environment.
    pub environment: Environment,
}

/// ARNs of the three roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessRoles {
    /// Batch service role.
    pub service_role_arn: Reference,
    /// Container task execution role.
    pub execution_role_arn: Reference,
    /// Job role.
    pub job_role_arn: Reference,
}

/// Statements attached inline to the job role.
#[must_use]
pub fn job_role_statements(storage_arn: &Reference, table_arn: &Reference) -> Vec<PolicyStatement> {
    vec![
        PolicyStatement::allow(
            &S3_ACTIONS,
            vec![storage_arn.to_value(), storage_arn.suffixed("/*")],
        ),
        PolicyStatement::allow(&DYNAMODB_ACTIONS, vec![table_arn.to_value()]),
        PolicyStatement::allow(&LOGS_ACTIONS, vec![json!("*")]),
    ]
}

/// Declares the three roles.
///
/// # Errors
///
/// Returns an error if an upstream ARN is missing or a declaration collides.
pub fn declare(scope: &Scope, id: &str, props: &AccessRolesProps) -> Result<Component<AccessRoles>> {
    let _ = props.storage_arn.require("bucket ARN")?;
    let _ = props.table_arn.require("table ARN")?;
    let scope = scope.child(id, &component_tags(props.environment));
    tracing::info!(scope = %scope, "declaring access roles");

    let env = props.environment;
    let managed = |name: &str| json!([intrinsic::managed_policy_arn(name)]);

    let service_role = scope
        .declare("BatchServiceRole", ResourceKind::IamRole)
        .property("RoleName", json!(physical_name("batch-service-role", env)))
        .property("AssumeRolePolicyDocument", trust_policy(BATCH_PRINCIPAL))
        .property("ManagedPolicyArns", managed(BATCH_SERVICE_POLICY));

    let execution_role = scope
        .declare("EcsTaskExecutionRole", ResourceKind::IamRole)
        .property("RoleName", json!(physical_name("ecs-task-execution-role", env)))
        .property("AssumeRolePolicyDocument", trust_policy(ECS_TASKS_PRINCIPAL))
        .property("ManagedPolicyArns", managed(TASK_EXECUTION_POLICY));

    let job_policy = PolicyDocument::new(job_role_statements(&props.storage_arn, &props.table_arn));
    let job_role = scope
        .declare("BatchJobRole", ResourceKind::IamRole)
        .property("RoleName", json!(physical_name("batch-job-role", env)))
        .property("AssumeRolePolicyDocument", trust_policy(ECS_TASKS_PRINCIPAL))
        .property("Policies", inline_policy("BatchJobRoleDefaultPolicy", &job_policy)?);
    warn_wildcards(job_role.logical_id(), &job_policy);

    let accessors = AccessRoles {
        service_role_arn: Reference::attr(service_role.logical_id(), "Arn"),
        execution_role_arn: Reference::attr(execution_role.logical_id(), "Arn"),
        job_role_arn: Reference::attr(job_role.logical_id(), "Arn"),
    };

    let mut resources = ResourceSet::new();
    resources.insert(service_role)?;
    resources.insert(execution_role)?;
    resources.insert(job_role)?;

    Ok(Component {
        resources,
        accessors,
    })
}

/// `Policies` property value holding one named inline document.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn inline_policy(name: &str, document: &PolicyDocument) -> Result<Value> {
    Ok(json!([{ "PolicyName": name, "PolicyDocument": document.to_value()? }]))
}
