//! Build-time references between declarations.
//!
//! A [`Reference`] is the accessor value one component hands to another: it
//! names a logical id (and optionally an attribute) and is embedded verbatim
//! into dependent declarations as a `Ref` or `Fn::GetAtt` intrinsic. Nothing
//! is looked up at run time; the provisioning engine resolves the intrinsic.

use std::collections::BTreeSet;
use std::fmt;

use sanders_common::error::{InfraError, Result};
use serde_json::{Value, json};

const PSEUDO_PREFIX: &str = "AWS::";

/// Pseudo parameter resolving to the partition (`aws`, `aws-cn`, ...).
pub const PARTITION: &str = "AWS::Partition";
/// Pseudo parameter resolving to the deployment region.
pub const REGION: &str = "AWS::Region";
/// Pseudo parameter resolving to the deployment account.
pub const ACCOUNT_ID: &str = "AWS::AccountId";

/// A value exposed by one declaration for others to consume.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    value: Value,
    target: Option<String>,
}

impl Reference {
    /// `{"Ref": logical_id}`: the declaration's primary identifier.
    #[must_use]
    pub fn of(logical_id: impl Into<String>) -> Self {
        let id = logical_id.into();
        Self {
            value: json!({ "Ref": id }),
            target: Some(id),
        }
    }

    /// `{"Fn::GetAtt": [logical_id, attribute]}`.
    #[must_use]
    pub fn attr(logical_id: impl Into<String>, attribute: &str) -> Self {
        let id = logical_id.into();
        Self {
            value: json!({ "Fn::GetAtt": [id, attribute] }),
            target: Some(id),
        }
    }

    /// A plain string known at build time.
    #[must_use]
    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            value: Value::String(value.into()),
            target: None,
        }
    }

    /// Logical id this reference points at, if any.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// The intrinsic expression to embed in a property.
    #[must_use]
    pub fn to_value(&self) -> Value {
        self.value.clone()
    }

    /// `{"Fn::Join": ["", [self, suffix]]}`, e.g. `arn/*` or `uri:latest`.
    #[must_use]
    pub fn suffixed(&self, suffix: &str) -> Value {
        join("", vec![self.to_value(), Value::String(suffix.to_owned())])
    }

    /// Checks that the reference names something before it is embedded.
    ///
    /// # Errors
    ///
    /// Returns [`InfraError::NotFound`] if the target logical id or literal
    /// value is blank.
    pub fn require(&self, what: &'static str) -> Result<&Self> {
        let blank = match (&self.target, &self.value) {
            (Some(id), _) => id.trim().is_empty(),
            (None, Value::String(s)) => s.trim().is_empty(),
            (None, _) => false,
        };
        if blank {
            return Err(InfraError::NotFound {
                kind: what,
                id: "upstream identifier is empty".into(),
            });
        }
        Ok(self)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::String(s) => f.write_str(s),
            other => write!(f, "{other}"),
        }
    }
}

/// `{"Ref": name}` for a pseudo parameter such as [`PARTITION`].
#[must_use]
pub fn pseudo(name: &str) -> Value {
    json!({ "Ref": name })
}

/// `{"Fn::Join": [separator, parts]}`.
#[must_use]
pub fn join(separator: &str, parts: Vec<Value>) -> Value {
    json!({ "Fn::Join": [separator, parts] })
}

/// `{"Fn::Select": [index, list]}`.
#[must_use]
pub fn select(index: usize, list: Value) -> Value {
    json!({ "Fn::Select": [index, list] })
}

/// `{"Fn::GetAZs": ""}`: availability zones of the deployment region.
#[must_use]
pub fn get_azs() -> Value {
    json!({ "Fn::GetAZs": "" })
}

/// ARN of a provider-managed policy, partition-qualified.
#[must_use]
pub fn managed_policy_arn(name: &str) -> Value {
    join(
        "",
        vec![
            Value::String("arn:".into()),
            pseudo(PARTITION),
            Value::String(format!(":iam::aws:policy/{name}")),
        ],
    )
}

/// Collects every logical id referenced by `Ref` or `Fn::GetAtt` inside
/// `value`, skipping pseudo parameters.
#[must_use]
pub fn collect_references(value: &Value) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    walk(value, &mut found);
    found
}

fn walk(value: &Value, found: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(id)) = map.get("Ref") {
                if !id.starts_with(PSEUDO_PREFIX) {
                    let _ = found.insert(id.clone());
                }
            }
            if let Some(Value::Array(parts)) = map.get("Fn::GetAtt") {
                if let Some(Value::String(id)) = parts.first() {
                    let _ = found.insert(id.clone());
                }
            }
            for nested in map.values() {
                walk(nested, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, found);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_and_attr_shapes() {
        assert_eq!(Reference::of("Queue").to_value(), json!({ "Ref": "Queue" }));
        assert_eq!(
            Reference::attr("Bucket", "Arn").to_value(),
            json!({ "Fn::GetAtt": ["Bucket", "Arn"] })
        );
        assert_eq!(Reference::attr("Bucket", "Arn").target(), Some("Bucket"));
        assert_eq!(Reference::literal("x").target(), None);
    }

    #[test]
    fn suffixed_joins_without_separator() {
        let uri = Reference::attr("Repo", "RepositoryUri").suffixed(":latest");
        assert_eq!(
            uri,
            json!({ "Fn::Join": ["", [{ "Fn::GetAtt": ["Repo", "RepositoryUri"] }, ":latest"]] })
        );
    }

    #[test]
    fn require_rejects_blank_targets() {
        assert!(Reference::of("").require("bucket").is_err());
        assert!(Reference::literal("  ").require("bucket").is_err());
        assert!(Reference::of("Bucket").require("bucket").is_ok());
    }

    #[test]
    fn collect_skips_pseudo_parameters() {
        let value = json!({
            "A": { "Ref": "Vpc" },
            "B": [{ "Fn::GetAtt": ["Role", "Arn"] }, managed_policy_arn("x")],
            "C": { "Ref": "AWS::Region" }
        });
        let refs = collect_references(&value);
        assert_eq!(
            refs.into_iter().collect::<Vec<_>>(),
            vec!["Role".to_string(), "Vpc".to_string()]
        );
    }
}
