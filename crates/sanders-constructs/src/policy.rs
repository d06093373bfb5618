//! IAM policy documents.

use serde::Serialize;
use serde_json::Value;

const POLICY_VERSION: &str = "2012-10-17";

/// Principal trusted by the batch service.
pub const BATCH_PRINCIPAL: &str = "batch.amazonaws.com";
/// Principal trusted by container tasks.
pub const ECS_TASKS_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";
/// Principal trusted by the workflow service.
pub const STATES_PRINCIPAL: &str = "states.amazonaws.com";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Effect {
    /// Grant.
    Allow,
}

/// One permission statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    /// Allow or deny.
    pub effect: Effect,
    /// Actions the statement covers.
    #[serde(rename = "Action")]
    pub actions: Vec<String>,
    /// Resources the statement covers; intrinsics allowed.
    #[serde(rename = "Resource")]
    pub resources: Vec<Value>,
}

impl PolicyStatement {
    /// An `Allow` statement.
    #[must_use]
    pub fn allow(actions: &[&str], resources: Vec<Value>) -> Self {
        Self {
            effect: Effect::Allow,
            actions: actions.iter().map(|a| (*a).to_owned()).collect(),
            resources,
        }
    }

    /// Whether the statement applies to every resource.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.resources.iter().any(|r| r == "*")
    }
}

/// A permission document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    version: &'static str,
    #[serde(rename = "Statement")]
    statements: Vec<PolicyStatement>,
}

impl PolicyDocument {
    /// Wraps statements in a versioned document.
    #[must_use]
    pub const fn new(statements: Vec<PolicyStatement>) -> Self {
        Self {
            version: POLICY_VERSION,
            statements,
        }
    }

    /// The statements, in declaration order.
    #[must_use]
    pub fn statements(&self) -> &[PolicyStatement] {
        &self.statements
    }

    /// Renders the document as a property value.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A statement granted on every resource of its actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WildcardGrant {
    /// Logical id of the role carrying the grant.
    pub role: String,
    /// Inline policy name.
    pub policy: String,
    /// Granted actions.
    pub actions: Vec<String>,
}

/// Logs every wildcard statement of `document` attached to `role`.
pub fn warn_wildcards(role: &str, document: &PolicyDocument) {
    for statement in document.statements().iter().filter(|s| s.is_wildcard()) {
        tracing::warn!(role, actions = ?statement.actions, "grant uses wildcard resource scope");
    }
}

/// Wildcard statements in a rendered `Policies` property.
#[must_use]
pub fn wildcard_grants(role: &str, policies: &Value) -> Vec<WildcardGrant> {
    let Some(policies) = policies.as_array() else {
        return Vec::new();
    };
    let mut grants = Vec::new();
    for policy in policies {
        let name = policy["PolicyName"].as_str().unwrap_or_default();
        let Some(statements) = policy["PolicyDocument"]["Statement"].as_array() else {
            continue;
        };
        for statement in statements {
            let wildcard = statement["Resource"]
                .as_array()
                .is_some_and(|resources| resources.iter().any(|r| r == "*"));
            if !wildcard {
                continue;
            }
            grants.push(WildcardGrant {
                role: role.to_owned(),
                policy: name.to_owned(),
                actions: statement["Action"]
                    .as_array()
                    .map(|actions| {
                        actions
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_owned)
                            .collect()
                    })
                    .unwrap_or_default(),
            });
        }
    }
    grants
}

/// Trust policy letting `service` assume a role.
#[must_use]
pub fn trust_policy(service: &str) -> Value {
    serde_json::json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": service },
            "Action": "sts:AssumeRole",
        }],
    })
}
