//! End-to-end synthesis tests for the Sanders customer platform.
//!
//! These tests drive the full pipeline from configuration to template:
//! 1. Resource counts per environment
//! 2. Table key schema and billing
//! 3. Retention of stateful resources
//! 4. Job definition sizing
//! 5. Workflow shape
//! 6. Tags on every declaration
//! 7. Idempotence of the emitted manifest
//! 8. Registry deletion flags
//! 9. Outputs, dependency order and reference integrity

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use sanders_common::config::{ConfigOverrides, PlatformConfig};
use sanders_common::types::{AccountId, Environment, Region};
use sanders_manifest::resource::ResourceKind;
use sanders_platform::platform::synthesize;
use sanders_platform::stack::Stack;
use serde_json::{Value, json};

fn config(environment: Environment) -> PlatformConfig {
    PlatformConfig::new(
        environment,
        AccountId::parse("123456789012").expect("account"),
        Region::default(),
    )
}

fn stack(environment: Environment) -> Stack {
    synthesize(&config(environment)).expect("synthesis should succeed")
}

fn rendered(environment: Environment) -> Value {
    stack(environment).template().to_value()
}

fn of_type<'a>(template: &'a Value, type_name: &str) -> Vec<(&'a String, &'a Value)> {
    template["Resources"]
        .as_object()
        .expect("resources")
        .iter()
        .filter(|(_, r)| r["Type"] == type_name)
        .collect()
}

fn single<'a>(template: &'a Value, type_name: &str) -> &'a Value {
    let found = of_type(template, type_name);
    assert_eq!(found.len(), 1, "expected exactly one {type_name}");
    found[0].1
}

// ── Resource counts ──────────────────────────────────────────────────

#[test]
fn synthesis_declares_expected_resource_counts() {
    for environment in Environment::ALL {
        let stack = stack(environment);
        let r = stack.template().resources();
        assert_eq!(r.count_of(ResourceKind::S3Bucket), 1);
        assert_eq!(r.count_of(ResourceKind::DynamoDbTable), 1);
        assert_eq!(r.count_of(ResourceKind::EcrRepository), 1);
        assert_eq!(r.count_of(ResourceKind::Vpc), 1);
        assert_eq!(r.count_of(ResourceKind::BatchComputeEnvironment), 1);
        assert_eq!(r.count_of(ResourceKind::BatchJobQueue), 1);
        assert_eq!(r.count_of(ResourceKind::BatchJobDefinition), 3);
        assert_eq!(r.count_of(ResourceKind::StateMachine), 1);
        assert_eq!(r.count_of(ResourceKind::IamRole), 4, "{environment}");
    }
}

// ── Table ────────────────────────────────────────────────────────────

#[test]
fn table_has_composite_string_key_and_on_demand_billing() {
    for environment in Environment::ALL {
        let template = rendered(environment);
        let table = single(&template, "AWS::DynamoDB::Table");
        assert_eq!(
            table["Properties"]["KeySchema"],
            json!([
                { "AttributeName": "customer_id", "KeyType": "HASH" },
                { "AttributeName": "date", "KeyType": "RANGE" },
            ])
        );
        assert_eq!(
            table["Properties"]["AttributeDefinitions"],
            json!([
                { "AttributeName": "customer_id", "AttributeType": "S" },
                { "AttributeName": "date", "AttributeType": "S" },
            ])
        );
        assert_eq!(table["Properties"]["BillingMode"], "PAY_PER_REQUEST");
        assert_eq!(
            table["Properties"]["TableName"],
            format!("sanders_daily_customer_features_{environment}")
        );
    }
}

// ── Retention ────────────────────────────────────────────────────────

#[test]
fn prod_retains_stateful_resources() {
    let template = rendered(Environment::Prod);
    for type_name in ["AWS::S3::Bucket", "AWS::DynamoDB::Table", "AWS::ECR::Repository"] {
        let resource = single(&template, type_name);
        assert_eq!(resource["DeletionPolicy"], "Retain", "{type_name}");
        assert_eq!(resource["UpdateReplacePolicy"], "Retain", "{type_name}");
    }
    let bucket = single(&template, "AWS::S3::Bucket");
    assert!(bucket.get("Metadata").is_none());
    let table = single(&template, "AWS::DynamoDB::Table");
    assert_eq!(
        table["Properties"]["PointInTimeRecoverySpecification"]["PointInTimeRecoveryEnabled"],
        true
    );
}

#[test]
fn dev_destroys_and_empties_stateful_resources() {
    let template = rendered(Environment::Dev);
    for type_name in ["AWS::S3::Bucket", "AWS::DynamoDB::Table", "AWS::ECR::Repository"] {
        let resource = single(&template, type_name);
        assert_eq!(resource["DeletionPolicy"], "Delete", "{type_name}");
    }
    let bucket = single(&template, "AWS::S3::Bucket");
    assert_eq!(bucket["Metadata"]["sanders:auto-delete-objects"], true);
    let table = single(&template, "AWS::DynamoDB::Table");
    assert_eq!(
        table["Properties"]["PointInTimeRecoverySpecification"]["PointInTimeRecoveryEnabled"],
        false
    );
}

// ── Job sizing ───────────────────────────────────────────────────────

#[test]
fn job_definitions_are_sized_independent_of_environment() {
    for environment in Environment::ALL {
        let template = rendered(environment);
        let mut sizes: Vec<(String, String, String)> = of_type(&template, "AWS::Batch::JobDefinition")
            .into_iter()
            .map(|(_, def)| {
                let requirements = &def["Properties"]["ContainerProperties"]["ResourceRequirements"];
                let value = |kind: &str| {
                    requirements
                        .as_array()
                        .expect("requirements")
                        .iter()
                        .find(|r| r["Type"] == kind)
                        .and_then(|r| r["Value"].as_str())
                        .expect(kind)
                        .to_owned()
                };
                (
                    def["Properties"]["JobDefinitionName"]
                        .as_str()
                        .expect("name")
                        .to_owned(),
                    value("VCPU"),
                    value("MEMORY"),
                )
            })
            .collect();
        sizes.sort_by_key(|(_, _, memory)| memory.parse::<u32>().expect("memory"));
        assert_eq!(
            sizes,
            vec![
                (format!("sanders-job-2g-{environment}"), "1".into(), "2048".into()),
                (format!("sanders-job-8g-{environment}"), "4".into(), "8192".into()),
                (format!("sanders-job-16g-{environment}"), "8".into(), "16384".into()),
            ]
        );
    }
}

// ── Workflow ─────────────────────────────────────────────────────────

#[test]
fn workflow_runs_parallel_then_training_with_single_failure_state() {
    let template = rendered(Environment::Dev);
    let machine = single(&template, "AWS::StepFunctions::StateMachine");
    let definition = &machine["Properties"]["Definition"];
    assert_eq!(definition["StartAt"], "ParallelJobs");
    assert_eq!(definition["TimeoutSeconds"], 86_400);

    let states = definition["States"].as_object().expect("states");
    let terminal: Vec<(&String, &Value)> = states
        .iter()
        .filter(|(_, s)| s["Type"] == "Succeed" || s["Type"] == "Fail")
        .collect();
    assert_eq!(terminal.len(), 2);

    let parallel = &states["ParallelJobs"];
    assert_eq!(parallel["Type"], "Parallel");
    assert_eq!(parallel["Next"], "ModelTrainingJob");
    assert_eq!(parallel["Catch"][0]["ErrorEquals"], json!(["States.ALL"]));
    assert_eq!(parallel["Catch"][0]["Next"], "FailState");
    let branch_definitions: Vec<&Value> = parallel["Branches"]
        .as_array()
        .expect("branches")
        .iter()
        .map(|b| {
            let start = b["StartAt"].as_str().expect("start");
            &b["States"][start]["Parameters"]["JobDefinition"]
        })
        .collect();
    assert_eq!(
        branch_definitions,
        vec![&json!("${JobDefinition8g}"), &json!("${JobDefinition2g}")]
    );

    let training = &states["ModelTrainingJob"];
    assert_eq!(training["Parameters"]["JobDefinition"], "${JobDefinition16g}");
    assert_eq!(training["Next"], "SuccessState");
    assert_eq!(training["Catch"][0]["Next"], "FailState");
    assert_eq!(states["FailState"]["Error"], "JobFailed");

    let substitutions = &machine["Properties"]["DefinitionSubstitutions"];
    assert_eq!(
        substitutions["JobDefinition16g"],
        json!({ "Ref": "BatchEnvironmentJobDef16G" })
    );
    assert_eq!(substitutions["JobQueueArn"], json!({ "Ref": "BatchEnvironmentJobQueue" }));
}

// ── Tags ─────────────────────────────────────────────────────────────

#[test]
fn every_declaration_carries_mandatory_tags() {
    for environment in Environment::ALL {
        let stack = stack(environment);
        for declaration in stack.template().resources().iter() {
            let tags = declaration.tags();
            let id = declaration.logical_id();
            assert_eq!(tags.get("Environment"), Some(environment.as_str()), "{id}");
            assert_eq!(tags.get("Service"), Some("sanders-customer-platform"), "{id}");
            assert_eq!(tags.get("Project"), Some("sanders-customer-platform"), "{id}");
            assert_eq!(tags.get("ManagedBy"), Some("sanders-infra"), "{id}");
        }
    }
}

#[test]
fn taggable_kinds_emit_tags() {
    let template = rendered(Environment::Prod);
    let bucket = single(&template, "AWS::S3::Bucket");
    assert!(
        bucket["Properties"]["Tags"]
            .as_array()
            .expect("tag list")
            .contains(&json!({ "Key": "Environment", "Value": "prod" }))
    );
    let queue = single(&template, "AWS::Batch::JobQueue");
    assert_eq!(queue["Properties"]["Tags"]["Environment"], "prod");
    for (id, association) in of_type(&template, "AWS::EC2::SubnetRouteTableAssociation") {
        assert!(association["Properties"].get("Tags").is_none(), "{id}");
    }
}

// ── Idempotence ──────────────────────────────────────────────────────

#[test]
fn synthesis_is_byte_identical_across_runs() {
    for environment in Environment::ALL {
        let first = stack(environment);
        let second = stack(environment);
        assert_eq!(
            first.template().to_json_pretty().expect("json"),
            second.template().to_json_pretty().expect("json")
        );
        assert_eq!(first.digest().expect("digest"), second.digest().expect("digest"));
    }
    assert_ne!(
        stack(Environment::Dev).digest().expect("digest"),
        stack(Environment::Prod).digest().expect("digest")
    );
}

// ── Registry ─────────────────────────────────────────────────────────

#[test]
fn registry_flags_follow_environment() {
    let dev = rendered(Environment::Dev);
    let repo = single(&dev, "AWS::ECR::Repository");
    assert_eq!(repo["Properties"]["EmptyOnDelete"], true);
    assert_eq!(repo["DeletionPolicy"], "Delete");

    let prod = rendered(Environment::Prod);
    let repo = single(&prod, "AWS::ECR::Repository");
    assert_eq!(repo["Properties"]["EmptyOnDelete"], false);
    assert_eq!(repo["DeletionPolicy"], "Retain");
    assert_eq!(repo["Properties"]["ImageScanningConfiguration"]["ScanOnPush"], true);
}

// ── Outputs, ordering, integrity ─────────────────────────────────────

#[test]
fn outputs_are_exported_per_environment() {
    let template = rendered(Environment::Prod);
    let outputs = template["Outputs"].as_object().expect("outputs");
    let exports: Vec<(&str, &str)> = outputs
        .iter()
        .map(|(id, o)| (id.as_str(), o["Export"]["Name"].as_str().expect("export")))
        .collect();
    assert_eq!(
        exports,
        vec![
            ("BatchJobQueueName", "sanders-batch-queue-prod"),
            ("DynamoDBTableName", "sanders-dynamodb-table-prod"),
            ("ECRRepositoryURI", "sanders-ecr-uri-prod"),
            ("S3BucketName", "sanders-s3-bucket-prod"),
            ("StepFunctionsStateMachineARN", "sanders-stepfunctions-arn-prod"),
            ("StepFunctionsStateMachineName", "sanders-stepfunctions-name-prod"),
            ("VPCId", "sanders-vpc-id-prod"),
        ]
    );
    assert_eq!(outputs["BatchJobQueueName"]["Value"], "sanders-batch-queue-prod");
    assert_eq!(outputs["S3BucketName"]["Value"], json!({ "Ref": "S3BucketBucket" }));
    assert_eq!(outputs["VPCId"]["Description"], "VPC ID");
    assert_eq!(template["Description"], "Sanders Customer Platform Infrastructure - prod");
}

#[test]
fn plan_orders_dependencies_first() {
    let stack = stack(Environment::Dev);
    let plan = stack.plan().expect("plan");
    assert_eq!(plan.len(), stack.template().resources().len());
    let position = |id: &str| {
        plan.iter()
            .position(|e| e.logical_id == id)
            .unwrap_or_else(|| panic!("{id} missing from plan"))
    };
    assert!(position("S3BucketBucket") < position("BatchIAMRolesBatchJobRole"));
    assert!(position("BatchIAMRolesBatchJobRole") < position("BatchEnvironmentJobDef8G"));
    assert!(position("BatchEnvironmentJobQueue") < position("StepFunctionsStateMachine"));
    assert!(position("VPCNetworkPublicSubnet1DefaultRoute") < position("VPCNetworkPublicSubnet1NatGateway"));

    let machine = plan
        .iter()
        .find(|e| e.logical_id == "StepFunctionsStateMachine")
        .expect("machine");
    assert!(machine.depends_on.contains(&"StepFunctionsStateMachineRole".to_owned()));
}

#[test]
fn every_reference_resolves_to_a_declaration() {
    let stack = stack(Environment::Prod);
    let resources = stack.template().resources();
    for declaration in resources.iter() {
        for target in declaration.references() {
            assert!(
                resources.contains(&target),
                "{} references missing {target}",
                declaration.logical_id()
            );
        }
    }
}

#[test]
fn wildcard_grants_are_reported() {
    for environment in [Environment::Dev, Environment::Prod] {
        let grants = stack(environment).wildcard_grants();
        let summary: Vec<(&str, &str, &str)> = grants
            .iter()
            .map(|g| (g.role.as_str(), g.policy.as_str(), g.actions[0].as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("BatchIAMRolesBatchJobRole", "BatchJobRoleDefaultPolicy", "logs:CreateLogGroup"),
                ("StepFunctionsStateMachineRole", "StateMachineRoleDefaultPolicy", "batch:SubmitJob"),
                ("StepFunctionsStateMachineRole", "StateMachineRoleDefaultPolicy", "events:PutTargets"),
            ]
        );
        assert!(grants.iter().all(|g| g.actions.len() == 3));
    }
}

// ── Configuration ────────────────────────────────────────────────────

#[test]
fn layered_yaml_configuration_drives_synthesis() {
    let file = ConfigOverrides::from_yaml_str(
        "environment: prod\naccount: \"123456789012\"\ntags:\n  CostCenter: analytics\n",
    )
    .expect("yaml");
    let flags = ConfigOverrides {
        region: Some("us-west-2".into()),
        ..ConfigOverrides::default()
    };
    let config = file.layer(flags).resolve().expect("resolve");
    let stack = synthesize(&config).expect("synthesize");
    assert_eq!(stack.name(), "SandersCustomerPlatformStack-prod");
    assert_eq!(stack.target(), "aws://123456789012/us-west-2");
    assert!(
        stack
            .template()
            .resources()
            .iter()
            .all(|r| r.tags().get("CostCenter") == Some("analytics"))
    );
}

#[test]
fn unknown_environment_is_rejected() {
    let overrides = ConfigOverrides {
        environment: Some("staging".into()),
        account: Some("123456789012".into()),
        ..ConfigOverrides::default()
    };
    let err = overrides.resolve().unwrap_err();
    assert!(err.to_string().contains("staging"), "got: {err}");
}
