//! Root composition.
//!
//! [`synthesize`] builds the seven components leaf-first, threading each
//! component's accessors into the next, and publishes the cross-stack
//! outputs. The pass is pure: the same configuration always yields the same
//! template.

use sanders_common::config::PlatformConfig;
use sanders_common::constants::{PROJECT_NAME, SHORT_PREFIX};
use sanders_common::error::Result;
use sanders_common::types::Environment;
use sanders_constructs::bucket::{self, StorageBucketProps};
use sanders_constructs::compute::{self, ComputeProps};
use sanders_constructs::network::{self, NetworkProps};
use sanders_constructs::registry::{self, RegistryProps};
use sanders_constructs::roles::{self, AccessRolesProps};
use sanders_constructs::table::{self, TableProps};
use sanders_constructs::workflow::{self, WorkflowProps};
use sanders_manifest::intrinsic::Reference;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use sanders_manifest::template::{Output, Template};
use sanders_manifest::validate::validate;

use crate::stack::Stack;

/// Partition key of the features table.
pub const TABLE_PARTITION_KEY: &str = "customer_id";
/// Sort key of the features table.
pub const TABLE_SORT_KEY: &str = "date";

/// Scope ids of the components, in build order.
pub const COMPONENT_IDS: [&str; 7] = [
    "S3Bucket",
    "DynamoDBTable",
    "ECRRepository",
    "VPCNetwork",
    "BatchIAMRoles",
    "BatchEnvironment",
    "StepFunctions",
];

/// Name of the data bucket and the image repository.
#[must_use]
pub fn platform_name(environment: Environment) -> String {
    format!("{PROJECT_NAME}-{environment}")
}

/// Name of the features table.
#[must_use]
pub fn table_name(environment: Environment) -> String {
    format!("{SHORT_PREFIX}_daily_customer_features_{environment}")
}

/// Synthesizes the whole platform for `config`.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a component rejects its
/// parameters, or the assembled template fails validation. Nothing is
/// returned on failure; there is no partial stack.
pub fn synthesize(config: &PlatformConfig) -> Result<Stack> {
    config.validate()?;
    let env = config.environment;
    let _span = tracing::info_span!("synthesize", stack = %config.stack_name, environment = %env).entered();

    let root = Scope::root(config.stack_tags());
    let [bucket_id, table_id, registry_id, network_id, roles_id, compute_id, workflow_id] = COMPONENT_IDS;
    let mut resources = ResourceSet::new();

    let storage = bucket::declare(
        &root,
        bucket_id,
        &StorageBucketProps {
            bucket_name: platform_name(env),
            environment: env,
        },
    )?;
    resources.absorb(storage.resources)?;
    let storage = storage.accessors;

    let features = table::declare(
        &root,
        table_id,
        &TableProps {
            table_name: table_name(env),
            partition_key: TABLE_PARTITION_KEY.to_owned(),
            sort_key: TABLE_SORT_KEY.to_owned(),
            environment: env,
        },
    )?;
    resources.absorb(features.resources)?;
    let features = features.accessors;

    let images = registry::declare(
        &root,
        registry_id,
        &RegistryProps {
            repository_name: platform_name(env),
            environment: env,
        },
    )?;
    resources.absorb(images.resources)?;
    let images = images.accessors;

    let net = network::declare(&root, network_id, &NetworkProps { environment: env })?;
    resources.absorb(net.resources)?;
    let net = net.accessors;

    let access = roles::declare(
        &root,
        roles_id,
        &AccessRolesProps {
            storage_arn: storage.bucket_arn.clone(),
            table_arn: features.table_arn.clone(),
            environment: env,
        },
    )?;
    resources.absorb(access.resources)?;
    let access = access.accessors;

    let batch = compute::declare(
        &root,
        compute_id,
        &ComputeProps {
            private_subnet_ids: net.private_subnet_ids.clone(),
            security_group_id: net.security_group_id.clone(),
            service_role_arn: access.service_role_arn,
            execution_role_arn: access.execution_role_arn,
            job_role_arn: access.job_role_arn,
            repository_uri: images.repository_uri.clone(),
            environment: env,
        },
    )?;
    resources.absorb(batch.resources)?;
    let batch = batch.accessors;

    let orchestrator = workflow::declare(
        &root,
        workflow_id,
        &WorkflowProps {
            job_queue_arn: batch.queue_arn.clone(),
            job_definitions: batch.job_definitions.clone(),
            environment: env,
        },
    )?;
    resources.absorb(orchestrator.resources)?;
    let orchestrator = orchestrator.accessors;

    let mut template = Template::new(config.description.clone(), resources);
    let outputs = [
        ("S3BucketName", storage.bucket_name, "s3-bucket", "S3 Bucket for data storage"),
        (
            "DynamoDBTableName",
            features.table_name,
            "dynamodb-table",
            "DynamoDB table for customer features",
        ),
        (
            "ECRRepositoryURI",
            images.repository_uri,
            "ecr-uri",
            "ECR repository URI for Docker images",
        ),
        ("VPCId", net.vpc_id, "vpc-id", "VPC ID"),
        ("BatchJobQueueName", batch.queue_name, "batch-queue", "AWS Batch Job Queue"),
        (
            "StepFunctionsStateMachineARN",
            orchestrator.state_machine_arn,
            "stepfunctions-arn",
            "Step Functions State Machine ARN",
        ),
        (
            "StepFunctionsStateMachineName",
            orchestrator.state_machine_name,
            "stepfunctions-name",
            "Step Functions State Machine Name",
        ),
    ];
    for (logical_id, value, export, description) in outputs {
        template.add_output(output(logical_id, value, export, description, env))?;
    }

    validate(&template)?;
    tracing::info!(
        resources = template.resources().len(),
        outputs = template.outputs().len(),
        "platform synthesized"
    );
    Ok(Stack::new(config.clone(), template))
}

fn output(logical_id: &str, value: Reference, export: &str, description: &str, env: Environment) -> Output {
    Output {
        logical_id: logical_id.to_owned(),
        value,
        description: description.to_owned(),
        export_name: format!("{SHORT_PREFIX}-{export}-{env}"),
    }
}
