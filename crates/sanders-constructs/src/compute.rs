//! Batch compute: a serverless compute pool, one queue, and three job
//! definitions sized by memory.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use sanders_common::error::{InfraError, Result};
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::Reference;
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::{Value, json};

use crate::{Component, component_tags, physical_name};

/// Concurrency cap of the compute pool, in vCPUs.
pub const MAX_VCPUS: u32 = 16;
/// CPU units per whole vCPU.
pub const CPU_UNITS_PER_VCPU: u32 = 1024;
/// Image tag every job definition runs.
pub const IMAGE_TAG: &str = "latest";

/// Size class of a job definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum JobSize {
    /// 1 vCPU, 2 GiB.
    Small,
    /// 4 vCPU, 8 GiB.
    Medium,
    /// 8 vCPU, 16 GiB.
    Large,
}

impl JobSize {
    /// Every size, smallest first.
    pub const ALL: [Self; 3] = [Self::Small, Self::Medium, Self::Large];

    /// Label used in names and as the job-definition map key.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Small => "2g",
            Self::Medium => "8g",
            Self::Large => "16g",
        }
    }

    /// Whole vCPUs.
    ///
    /// The job definition's `VCPU` requirement is rendered in these whole
    /// units (`"1"`, `"4"`, `"8"`), not as the 1024-per-vCPU CPU units of
    /// the earlier container-properties form (`"1024"`, `"4096"`, `"8192"`);
    /// [`JobSize::cpu_units`] still gives that figure.
    #[must_use]
    pub const fn vcpus(self) -> u32 {
        match self {
            Self::Small => 1,
            Self::Medium => 4,
            Self::Large => 8,
        }
    }

    /// Memory in MiB.
    #[must_use]
    pub const fn memory_mib(self) -> u32 {
        match self {
            Self::Small => 2048,
            Self::Medium => 8192,
            Self::Large => 16384,
        }
    }

    /// CPU in the provider's 1/1024-vCPU units.
    #[must_use]
    pub const fn cpu_units(self) -> u32 {
        self.vcpus() * CPU_UNITS_PER_VCPU
    }

    fn logical_name(self) -> String {
        format!("JobDef{}", self.label().to_uppercase())
    }
}

impl fmt::Display for JobSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for JobSize {
    type Err = InfraError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|size| size.label() == s)
            .ok_or_else(|| InfraError::config(format!("unknown job size \"{s}\"")))
    }
}

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeProps {
    /// Subnets the compute pool runs in.
    pub private_subnet_ids: Vec<Reference>,
    /// Security group attached to every task.
    pub security_group_id: Reference,
    /// Batch service role ARN.
    pub service_role_arn: Reference,
    /// Task execution role ARN.
    pub execution_role_arn: Reference,
    /// Job role ARN.
    pub job_role_arn: Reference,
    /// Repository URI, without tag.
    pub repository_uri: Reference,
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the compute environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeEnvironment {
    /// Queue ARN.
    pub queue_arn: Reference,
    /// Queue name.
    pub queue_name: Reference,
    /// Job definition ARN per size.
    pub job_definitions: BTreeMap<JobSize, Reference>,
}

/// Declares the compute pool, queue and job definitions.
///
/// # Errors
///
/// Returns an error if no subnet is given, an upstream reference is missing,
/// or a declaration collides.
pub fn declare(scope: &Scope, id: &str, props: &ComputeProps) -> Result<Component<ComputeEnvironment>> {
    if props.private_subnet_ids.is_empty() {
        return Err(InfraError::NotFound {
            kind: "private subnet",
            id: "compute environment needs at least one subnet".into(),
        });
    }
    for subnet in &props.private_subnet_ids {
        let _ = subnet.require("private subnet")?;
    }
    let _ = props.security_group_id.require("security group")?;
    let _ = props.service_role_arn.require("service role ARN")?;
    let _ = props.execution_role_arn.require("execution role ARN")?;
    let _ = props.job_role_arn.require("job role ARN")?;
    let _ = props.repository_uri.require("repository URI")?;

    let env = props.environment;
    let scope = scope.child(id, &component_tags(env));
    tracing::info!(scope = %scope, max_vcpus = MAX_VCPUS, "declaring batch compute");

    let mut resources = ResourceSet::new();

    let subnets: Vec<Value> = props.private_subnet_ids.iter().map(Reference::to_value).collect();
    let compute = scope
        .declare("ComputeEnvironment", ResourceKind::BatchComputeEnvironment)
        .property("ComputeEnvironmentName", json!(physical_name("batch-compute", env)))
        .property("Type", json!("MANAGED"))
        .property("State", json!("ENABLED"))
        .property("ServiceRole", props.service_role_arn.to_value())
        .property(
            "ComputeResources",
            json!({
                "Type": "FARGATE",
                "MaxvCpus": MAX_VCPUS,
                "Subnets": subnets,
                "SecurityGroupIds": [props.security_group_id.to_value()],
            }),
        );
    let compute_arn = Reference::of(compute.logical_id());
    resources.insert(compute)?;

    let queue_name = physical_name("batch-queue", env);
    let queue = scope
        .declare("JobQueue", ResourceKind::BatchJobQueue)
        .property("JobQueueName", json!(queue_name))
        .property("Priority", json!(1))
        .property("State", json!("ENABLED"))
        .property(
            "ComputeEnvironmentOrder",
            json!([{ "ComputeEnvironment": compute_arn.to_value(), "Order": 1 }]),
        );
    let queue_arn = Reference::of(queue.logical_id());
    resources.insert(queue)?;

    let image = props.repository_uri.suffixed(&format!(":{IMAGE_TAG}"));
    let mut job_definitions = BTreeMap::new();
    for size in JobSize::ALL {
        let definition = scope
            .declare(&size.logical_name(), ResourceKind::BatchJobDefinition)
            .property(
                "JobDefinitionName",
                json!(physical_name(&format!("job-{}", size.label()), env)),
            )
            .property("Type", json!("container"))
            .property("PlatformCapabilities", json!(["FARGATE"]))
            .property(
                "ContainerProperties",
                json!({
                    "Image": image,
                    "ExecutionRoleArn": props.execution_role_arn.to_value(),
                    "JobRoleArn": props.job_role_arn.to_value(),
                    "FargatePlatformConfiguration": { "PlatformVersion": "LATEST" },
                    "ResourceRequirements": [
                        { "Type": "VCPU", "Value": size.vcpus().to_string() },
                        { "Type": "MEMORY", "Value": size.memory_mib().to_string() },
                    ],
                    "LogConfiguration": { "LogDriver": "awslogs" },
                }),
            );
        tracing::debug!(size = %size, vcpus = size.vcpus(), memory_mib = size.memory_mib(), "job definition");
        let _ = job_definitions.insert(size, Reference::of(definition.logical_id()));
        resources.insert(definition)?;
    }

    Ok(Component {
        resources,
        accessors: ComputeEnvironment {
            queue_arn,
            queue_name: Reference::literal(queue_name),
            job_definitions,
        },
    })
}
