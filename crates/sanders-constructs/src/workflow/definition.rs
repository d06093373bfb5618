//! Typed model of a state machine definition.
//!
//! The definition is serialized with serde into the States Language JSON the
//! provisioning engine expects. [`validate_definition`] checks it is a
//! well-formed, acyclic state graph before it is embedded.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use sanders_common::error::{InfraError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error matcher covering every failure.
pub const ALL_ERRORS: &str = "States.ALL";

/// Root of a state machine definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StateMachineDefinition {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Name of the first state.
    pub start_at: String,
    /// States by name.
    pub states: BTreeMap<String, State>,
    /// Upper bound on one execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,
}

/// One state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "Type")]
pub enum State {
    /// Invokes a service integration.
    Task(TaskState),
    /// Runs branches concurrently and waits for all of them.
    Parallel(ParallelState),
    /// Terminal success.
    Succeed(SucceedState),
    /// Terminal failure.
    Fail(FailState),
}

/// How a non-terminal state hands over control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Transition {
    /// Following state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Set when the state ends its branch or the execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<bool>,
}

impl Transition {
    /// Continue with `state`.
    #[must_use]
    pub fn next(state: impl Into<String>) -> Self {
        Self {
            next: Some(state.into()),
            end: None,
        }
    }

    /// End the enclosing branch or execution.
    #[must_use]
    pub const fn end() -> Self {
        Self {
            next: None,
            end: Some(true),
        }
    }
}

/// Routes matching errors to a recovery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Catcher {
    /// Error names matched, e.g. [`ALL_ERRORS`].
    pub error_equals: Vec<String>,
    /// Recovery state.
    pub next: String,
    /// Where the error output is placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
}

impl Catcher {
    /// Catches every error into `next`, keeping the error at `result_path`.
    #[must_use]
    pub fn all(next: impl Into<String>, result_path: impl Into<String>) -> Self {
        Self {
            error_equals: vec![ALL_ERRORS.to_owned()],
            next: next.into(),
            result_path: Some(result_path.into()),
        }
    }
}

/// A `Task` state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskState {
    /// Integration ARN.
    pub resource: String,
    /// Request parameters.
    pub parameters: Value,
    /// Where the task result is placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Next state or end.
    #[serde(flatten)]
    pub transition: Transition,
    /// Error routing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
}

/// A `Parallel` state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParallelState {
    /// Concurrent branches.
    pub branches: Vec<Branch>,
    /// Where the array of branch results is placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_path: Option<String>,
    /// Next state or end.
    #[serde(flatten)]
    pub transition: Transition,
    /// Error routing.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catch: Vec<Catcher>,
}

/// A `Succeed` state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SucceedState {
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A `Fail` state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FailState {
    /// Error name.
    pub error: String,
    /// Human-readable cause.
    pub cause: String,
}

/// One branch of a [`ParallelState`]; its own state namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Branch {
    /// Name of the branch's first state.
    pub start_at: String,
    /// States by name.
    pub states: BTreeMap<String, State>,
}

impl Branch {
    /// A branch made of one terminal state.
    #[must_use]
    pub fn single(name: impl Into<String>, state: State) -> Self {
        let name = name.into();
        Self {
            start_at: name.clone(),
            states: BTreeMap::from([(name, state)]),
        }
    }
}

impl State {
    /// Whether the state ends its branch or execution.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Succeed(_) | Self::Fail(_) => true,
            Self::Task(TaskState { transition, .. }) | Self::Parallel(ParallelState { transition, .. }) => {
                matches!(transition.end, Some(true))
            }
        }
    }

    /// Every state this one can hand control to.
    #[must_use]
    pub fn successors(&self) -> Vec<&str> {
        let (transition, catch) = match self {
            Self::Task(t) => (&t.transition, &t.catch),
            Self::Parallel(p) => (&p.transition, &p.catch),
            Self::Succeed(_) | Self::Fail(_) => return Vec::new(),
        };
        transition
            .next
            .iter()
            .map(String::as_str)
            .chain(catch.iter().map(|c| c.next.as_str()))
            .collect()
    }

    fn transition(&self) -> Option<&Transition> {
        match self {
            Self::Task(t) => Some(&t.transition),
            Self::Parallel(p) => Some(&p.transition),
            Self::Succeed(_) | Self::Fail(_) => None,
        }
    }
}

impl StateMachineDefinition {
    /// Counts states of the top level matching `predicate`.
    pub fn count_states(&self, predicate: impl Fn(&State) -> bool) -> usize {
        self.states.values().filter(|s| predicate(s)).count()
    }
}

/// Validates a definition before it is embedded.
///
/// # Checks performed
///
/// 1. `StartAt` and every `Next`/`Catch` target name a state in the same
///    namespace.
/// 2. Every non-terminal state has exactly one of `Next` or `End`.
/// 3. Every state is reachable from `StartAt`.
/// 4. The state graph is acyclic.
/// 5. Every `${Name}` placeholder is listed in `substitutions`.
///
/// Branches of a `Parallel` state are checked the same way, recursively.
///
/// # Errors
///
/// Returns an error on the first failed check.
pub fn validate_definition(
    definition: &StateMachineDefinition,
    substitutions: &BTreeSet<String>,
) -> Result<()> {
    if definition.timeout_seconds == Some(0) {
        return Err(InfraError::config("state machine timeout must be positive"));
    }
    check_namespace(&definition.start_at, &definition.states)?;

    let rendered = serde_json::to_value(definition)?;
    let mut placeholders = BTreeSet::new();
    collect_placeholders(&rendered, &mut placeholders);
    for name in placeholders {
        if !substitutions.contains(&name) {
            return Err(InfraError::DanglingReference {
                from: "state machine definition".into(),
                target: format!("${{{name}}}"),
            });
        }
    }
    Ok(())
}

fn check_namespace(start_at: &str, states: &BTreeMap<String, State>) -> Result<()> {
    if !states.contains_key(start_at) {
        return Err(InfraError::NotFound {
            kind: "state",
            id: start_at.to_owned(),
        });
    }

    let mut graph: DiGraph<&str, ()> = DiGraph::new();
    let nodes: HashMap<&str, NodeIndex> = states
        .keys()
        .map(|name| (name.as_str(), graph.add_node(name.as_str())))
        .collect();

    for (name, state) in states {
        if let Some(transition) = state.transition() {
            let has_next = transition.next.is_some();
            let ends = matches!(transition.end, Some(true));
            if has_next == ends {
                return Err(InfraError::config(format!(
                    "state \"{name}\" must have exactly one of Next or End"
                )));
            }
        }
        if let State::Parallel(parallel) = state {
            if parallel.branches.is_empty() {
                return Err(InfraError::config(format!(
                    "parallel state \"{name}\" has no branches"
                )));
            }
            for branch in &parallel.branches {
                check_namespace(&branch.start_at, &branch.states)?;
            }
        }
        for target in state.successors() {
            let Some(&to) = nodes.get(target) else {
                return Err(InfraError::NotFound {
                    kind: "state",
                    id: format!("{target} (from {name})"),
                });
            };
            let _ = graph.update_edge(nodes[name.as_str()], to, ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        return Err(InfraError::Cycle {
            logical_id: graph[cycle.node_id()].to_owned(),
        });
    }

    let mut reached = BTreeSet::new();
    let mut dfs = Dfs::new(&graph, nodes[start_at]);
    while let Some(idx) = dfs.next(&graph) {
        let _ = reached.insert(graph[idx]);
    }
    if let Some(orphan) = states.keys().find(|name| !reached.contains(name.as_str())) {
        return Err(InfraError::config(format!(
            "state \"{orphan}\" is unreachable from \"{start_at}\""
        )));
    }
    Ok(())
}

fn collect_placeholders(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::String(s) => {
            let mut rest = s.as_str();
            while let Some(start) = rest.find("${") {
                let after = &rest[start + 2..];
                let Some(end) = after.find('}') else { break };
                let _ = found.insert(after[..end].to_owned());
                rest = &after[end + 1..];
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_placeholders(v, found)),
        Value::Object(map) => map.values().for_each(|v| collect_placeholders(v, found)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn task(transition: Transition) -> State {
        State::Task(TaskState {
            resource: "arn:${Partition}:states:::batch:submitJob.sync".into(),
            parameters: json!({ "JobQueue": "${Queue}" }),
            result_path: None,
            transition,
            catch: Vec::new(),
        })
    }

    fn subs(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| (*s).to_owned()).collect()
    }

    fn linear() -> StateMachineDefinition {
        StateMachineDefinition {
            comment: None,
            start_at: "A".into(),
            states: BTreeMap::from([
                ("A".to_owned(), task(Transition::next("Done"))),
                ("Done".to_owned(), State::Succeed(SucceedState::default())),
            ]),
            timeout_seconds: Some(60),
        }
    }

    #[test]
    fn valid_linear_definition_passes() {
        assert!(validate_definition(&linear(), &subs(&["Partition", "Queue"])).is_ok());
    }

    #[test]
    fn serializes_type_tag_and_pascal_case() {
        let value = serde_json::to_value(linear()).expect("serialize");
        assert_eq!(value["StartAt"], "A");
        assert_eq!(value["TimeoutSeconds"], 60);
        assert_eq!(value["States"]["A"]["Type"], "Task");
        assert_eq!(value["States"]["A"]["Next"], "Done");
        assert!(value["States"]["A"].get("End").is_none());
        assert!(value["States"]["A"].get("Catch").is_none());
        assert_eq!(value["States"]["Done"], json!({ "Type": "Succeed" }));
    }

    #[test]
    fn unknown_start_fails() {
        let mut def = linear();
        def.start_at = "Missing".into();
        let err = validate_definition(&def, &subs(&["Partition", "Queue"])).unwrap_err();
        assert!(err.to_string().contains("Missing"), "got: {err}");
    }

    #[test]
    fn dangling_next_fails() {
        let mut def = linear();
        let _ = def.states.insert("A".into(), task(Transition::next("Nowhere")));
        assert!(validate_definition(&def, &subs(&["Partition", "Queue"])).is_err());
    }

    #[test]
    fn cycle_is_detected() {
        let mut def = linear();
        let _ = def.states.insert("A".into(), task(Transition::next("B")));
        let _ = def.states.insert("B".into(), task(Transition::next("A")));
        let err = validate_definition(&def, &subs(&["Partition", "Queue"])).unwrap_err();
        assert!(matches!(err, InfraError::Cycle { .. }), "got: {err}");
    }

    #[test]
    fn unreachable_state_fails() {
        let mut def = linear();
        let _ = def.states.insert(
            "Orphan".into(),
            State::Fail(FailState {
                error: "E".into(),
                cause: "c".into(),
            }),
        );
        let err = validate_definition(&def, &subs(&["Partition", "Queue"])).unwrap_err();
        assert!(err.to_string().contains("unreachable"), "got: {err}");
    }

    #[test]
    fn next_and_end_together_fail() {
        let mut def = linear();
        let _ = def.states.insert(
            "A".into(),
            task(Transition {
                next: Some("Done".into()),
                end: Some(true),
            }),
        );
        assert!(validate_definition(&def, &subs(&["Partition", "Queue"])).is_err());
    }

    #[test]
    fn unbound_placeholder_fails() {
        let err = validate_definition(&linear(), &subs(&["Partition"])).unwrap_err();
        assert!(err.to_string().contains("${Queue}"), "got: {err}");
    }

    #[test]
    fn branches_are_checked_recursively() {
        let broken = Branch {
            start_at: "Inner".into(),
            states: BTreeMap::from([("Inner".to_owned(), task(Transition::next("Gone")))]),
        };
        let mut def = linear();
        let _ = def.states.insert(
            "A".into(),
            State::Parallel(ParallelState {
                branches: vec![broken],
                result_path: None,
                transition: Transition::next("Done"),
                catch: Vec::new(),
            }),
        );
        assert!(validate_definition(&def, &subs(&["Partition", "Queue"])).is_err());
    }

    #[test]
    fn round_trips_through_json() {
        let def = linear();
        let text = serde_json::to_string(&def).expect("serialize");
        let back: StateMachineDefinition = serde_json::from_str(&text).expect("parse");
        assert_eq!(back, def);
    }
}
