//! Orchestrator for the batch pipeline.
//!
//! Feature extraction (8g) and data processing (2g) run in parallel; model
//! training (16g) follows once both succeed. Any failure routes to a single
//! fail state. No retry is declared: a failed job fails the execution.
//!
//! Cross-resource values enter the definition through
//! `DefinitionSubstitutions`, so the definition itself holds only `${Name}`
//! placeholders.

pub mod definition;

use std::collections::{BTreeMap, BTreeSet};

use sanders_common::error::{InfraError, Result};
use sanders_common::types::Environment;
use sanders_manifest::intrinsic::{self, Reference};
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::scope::Scope;
use sanders_manifest::set::ResourceSet;
use serde_json::{Map, Value, json};

use self::definition::{
    Branch, Catcher, FailState, ParallelState, State, StateMachineDefinition, SucceedState,
    TaskState, Transition, validate_definition,
};
use crate::compute::JobSize;
use crate::policy::{
    PolicyDocument, PolicyStatement, STATES_PRINCIPAL, trust_policy, warn_wildcards,
};
use crate::roles::inline_policy;
use crate::{Component, component_tags, physical_name};

/// Upper bound on one execution: 24 hours.
pub const TIMEOUT_SECONDS: u32 = 86_400;

const PARALLEL_STATE: &str = "ParallelJobs";
const SUCCESS_STATE: &str = "SuccessState";
const FAIL_STATE: &str = "FailState";
const ERROR_PATH: &str = "$.error";

const PARTITION_KEY: &str = "Partition";
const QUEUE_KEY: &str = "JobQueueArn";

const SUBMIT_JOB_SYNC: &str = "arn:${Partition}:states:::batch:submitJob.sync";

const BATCH_ACTIONS: [&str; 3] = ["batch:SubmitJob", "batch:DescribeJobs", "batch:TerminateJob"];
const EVENTS_ACTIONS: [&str; 3] = ["events:PutTargets", "events:PutRule", "events:DescribeRule"];

/// One batch job submitted by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobStep {
    /// State name.
    pub state: &'static str,
    /// Job definition size.
    pub size: JobSize,
    /// Submitted job name.
    pub job_name: &'static str,
    /// Where the job result is placed.
    pub result_path: &'static str,
}

/// Branches of the parallel stage.
pub const PARALLEL_STEPS: [JobStep; 2] = [
    JobStep {
        state: "FeatureExtractionJob",
        size: JobSize::Medium,
        job_name: "feature-extraction",
        result_path: "$.featureJob",
    },
    JobStep {
        state: "DataProcessingJob",
        size: JobSize::Small,
        job_name: "data-processing",
        result_path: "$.processingJob",
    },
];

/// Step run after the parallel stage.
pub const TRAINING_STEP: JobStep = JobStep {
    state: "ModelTrainingJob",
    size: JobSize::Large,
    job_name: "model-training",
    result_path: "$.trainingJob",
};

/// Parameters of [`declare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowProps {
    /// ARN of the queue jobs are submitted to.
    pub job_queue_arn: Reference,
    /// Job definition per size; every [`JobSize`] is required.
    pub job_definitions: BTreeMap<JobSize, Reference>,
    /// Deployment environment.
    pub environment: Environment,
}

/// Values exposed by the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workflow {
    /// State machine ARN.
    pub state_machine_arn: Reference,
    /// State machine name.
    pub state_machine_name: Reference,
}

fn job_definition_key(size: JobSize) -> String {
    format!("JobDefinition{}", size.label())
}

fn submit_job(step: JobStep, transition: Transition, catch: Vec<Catcher>) -> State {
    State::Task(TaskState {
        resource: SUBMIT_JOB_SYNC.to_owned(),
        parameters: json!({
            "JobDefinition": format!("${{{}}}", job_definition_key(step.size)),
            "JobName": step.job_name,
            "JobQueue": format!("${{{QUEUE_KEY}}}"),
            "ContainerOverrides": { "Command.$": "$.command" },
            "Parameters": { "command.$": "$.command" },
        }),
        result_path: Some(step.result_path.to_owned()),
        transition,
        catch,
    })
}

/// The orchestration graph, with placeholders for every external value.
#[must_use]
pub fn build_definition() -> StateMachineDefinition {
    let branches = PARALLEL_STEPS
        .iter()
        .map(|step| Branch::single(step.state, submit_job(*step, Transition::end(), Vec::new())))
        .collect();

    let states = BTreeMap::from([
        (
            PARALLEL_STATE.to_owned(),
            State::Parallel(ParallelState {
                branches,
                result_path: Some("$.parallelResults".to_owned()),
                transition: Transition::next(TRAINING_STEP.state),
                catch: vec![Catcher::all(FAIL_STATE, ERROR_PATH)],
            }),
        ),
        (
            TRAINING_STEP.state.to_owned(),
            submit_job(
                TRAINING_STEP,
                Transition::next(SUCCESS_STATE),
                vec![Catcher::all(FAIL_STATE, ERROR_PATH)],
            ),
        ),
        (
            SUCCESS_STATE.to_owned(),
            State::Succeed(SucceedState {
                comment: Some("All jobs completed successfully".to_owned()),
            }),
        ),
        (
            FAIL_STATE.to_owned(),
            State::Fail(FailState {
                error: "JobFailed".to_owned(),
                cause: "Job execution failed".to_owned(),
            }),
        ),
    ]);

    StateMachineDefinition {
        comment: None,
        start_at: PARALLEL_STATE.to_owned(),
        states,
        timeout_seconds: Some(TIMEOUT_SECONDS),
    }
}

fn substitutions(props: &WorkflowProps) -> Result<Map<String, Value>> {
    let mut map = Map::new();
    let _ = map.insert(PARTITION_KEY.to_owned(), intrinsic::pseudo(intrinsic::PARTITION));
    let _ = map.insert(QUEUE_KEY.to_owned(), props.job_queue_arn.to_value());
    for size in JobSize::ALL {
        let definition = props
            .job_definitions
            .get(&size)
            .ok_or_else(|| InfraError::NotFound {
                kind: "job definition",
                id: size.label().to_owned(),
            })?;
        let _ = definition.require("job definition")?;
        let _ = map.insert(job_definition_key(size), definition.to_value());
    }
    Ok(map)
}

/// Declares the orchestrator role and state machine.
///
/// # Errors
///
/// Returns an error if the queue or any job definition is missing, or the
/// definition fails validation.
pub fn declare(scope: &Scope, id: &str, props: &WorkflowProps) -> Result<Component<Workflow>> {
    let _ = props.job_queue_arn.require("job queue ARN")?;
    let substitutions = substitutions(props)?;

    let definition = build_definition();
    let bound: BTreeSet<String> = substitutions.keys().cloned().collect();
    validate_definition(&definition, &bound)?;

    let env = props.environment;
    let scope = scope.child(id, &component_tags(env));
    let name = physical_name("orchestrator", env);
    tracing::info!(scope = %scope, state_machine = %name, states = definition.states.len(), "declaring workflow");

    let policy = PolicyDocument::new(vec![
        PolicyStatement::allow(&BATCH_ACTIONS, vec![json!("*")]),
        PolicyStatement::allow(&EVENTS_ACTIONS, vec![json!("*")]),
    ]);
    let role = scope
        .declare("StateMachineRole", ResourceKind::IamRole)
        .property("RoleName", json!(physical_name("stepfunctions-role", env)))
        .property("AssumeRolePolicyDocument", trust_policy(STATES_PRINCIPAL))
        .property("Policies", inline_policy("StateMachineRoleDefaultPolicy", &policy)?);
    warn_wildcards(role.logical_id(), &policy);
    let role_arn = Reference::attr(role.logical_id(), "Arn");

    let machine = scope
        .declare("StateMachine", ResourceKind::StateMachine)
        .property("StateMachineName", json!(name))
        .property("StateMachineType", json!("STANDARD"))
        .property("RoleArn", role_arn.to_value())
        .property("Definition", serde_json::to_value(&definition)?)
        .property("DefinitionSubstitutions", Value::Object(substitutions))
        .depends_on(role.logical_id());
    let machine_id = machine.logical_id().to_owned();

    let mut resources = ResourceSet::new();
    resources.insert(role)?;
    resources.insert(machine)?;

    Ok(Component {
        resources,
        accessors: Workflow {
            state_machine_arn: Reference::of(&machine_id),
            state_machine_name: Reference::attr(&machine_id, "Name"),
        },
    })
}
