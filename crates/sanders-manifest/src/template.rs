//! The emitted manifest.
//!
//! A [`Template`] is the full declarative description handed to the
//! provisioning engine. Every map is ordered, so rendering the same
//! template twice produces byte-identical output and the same
//! [`Template::digest`].

use std::collections::BTreeMap;

use sanders_common::constants::TEMPLATE_FORMAT_VERSION;
use sanders_common::error::{InfraError, Result};
use serde_json::{Map, Value, json};
use sha2::{Digest, Sha256};

use crate::intrinsic::Reference;
use crate::set::ResourceSet;

/// A named cross-stack output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Output {
    /// Logical id of the output.
    pub logical_id: String,
    /// Exported value.
    pub value: Reference,
    /// Human-readable description.
    pub description: String,
    /// Name other stacks import the value under.
    pub export_name: String,
}

impl Output {
    fn to_template_value(&self) -> Value {
        json!({
            "Description": self.description,
            "Value": self.value.to_value(),
            "Export": { "Name": self.export_name },
        })
    }
}

/// A complete resource manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    description: String,
    resources: ResourceSet,
    outputs: BTreeMap<String, Output>,
}

impl Template {
    /// Wraps a finished set of declarations.
    #[must_use]
    pub fn new(description: impl Into<String>, resources: ResourceSet) -> Self {
        Self {
            description: description.into(),
            resources,
            outputs: BTreeMap::new(),
        }
    }

    /// Publishes an output.
    ///
    /// # Errors
    ///
    /// Returns an error if the output id or export name is already used.
    pub fn add_output(&mut self, output: Output) -> Result<()> {
        if self.outputs.contains_key(&output.logical_id) {
            return Err(InfraError::DuplicateResource {
                logical_id: output.logical_id,
            });
        }
        if self
            .outputs
            .values()
            .any(|o| o.export_name == output.export_name)
        {
            return Err(InfraError::config(format!(
                "export name \"{}\" is published twice",
                output.export_name
            )));
        }
        let _ = self.outputs.insert(output.logical_id.clone(), output);
        Ok(())
    }

    /// Stack description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Declared resources.
    #[must_use]
    pub const fn resources(&self) -> &ResourceSet {
        &self.resources
    }

    /// Published outputs, keyed by logical id.
    #[must_use]
    pub const fn outputs(&self) -> &BTreeMap<String, Output> {
        &self.outputs
    }

    /// Renders the template document.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let resources: Map<String, Value> = self
            .resources
            .iter()
            .map(|r| (r.logical_id().to_owned(), r.to_template_value()))
            .collect();
        let outputs: Map<String, Value> = self
            .outputs
            .iter()
            .map(|(id, o)| (id.clone(), o.to_template_value()))
            .collect();

        let mut doc = Map::new();
        let _ = doc.insert(
            "AWSTemplateFormatVersion".into(),
            json!(TEMPLATE_FORMAT_VERSION),
        );
        let _ = doc.insert("Description".into(), json!(self.description));
        let _ = doc.insert("Resources".into(), Value::Object(resources));
        if !outputs.is_empty() {
            let _ = doc.insert("Outputs".into(), Value::Object(outputs));
        }
        Value::Object(doc)
    }

    /// Pretty-printed JSON with a trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        let mut rendered = serde_json::to_string_pretty(&self.to_value())?;
        rendered.push('\n');
        Ok(rendered)
    }

    /// YAML rendering of the same document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.to_value())?)
    }

    /// SHA-256 of the pretty JSON rendering, hex-encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn digest(&self) -> Result<String> {
        let rendered = self.to_json_pretty()?;
        let mut hasher = Sha256::new();
        hasher.update(rendered.as_bytes());
        Ok(format!("{:x}", hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use sanders_common::tags::TagSet;

    use super::*;
    use crate::resource::{ResourceDeclaration, ResourceKind};

    fn template() -> Template {
        let mut set = ResourceSet::new();
        set.insert(
            ResourceDeclaration::new("Bucket", ResourceKind::S3Bucket, TagSet::new())
                .property("BucketName", json!("b")),
        )
        .expect("insert");
        let mut template = Template::new("desc", set);
        template
            .add_output(Output {
                logical_id: "BucketName".into(),
                value: Reference::of("Bucket"),
                description: "the bucket".into(),
                export_name: "x-bucket".into(),
            })
            .expect("output");
        template
    }

    #[test]
    fn document_shape() {
        let doc = template().to_value();
        assert_eq!(doc["AWSTemplateFormatVersion"], "2010-09-09");
        assert_eq!(doc["Description"], "desc");
        assert_eq!(doc["Resources"]["Bucket"]["Type"], "AWS::S3::Bucket");
        assert_eq!(doc["Outputs"]["BucketName"]["Export"]["Name"], "x-bucket");
        assert_eq!(doc["Outputs"]["BucketName"]["Value"], json!({ "Ref": "Bucket" }));
    }

    #[test]
    fn rendering_is_stable() {
        let a = template();
        let b = template();
        assert_eq!(a.to_json_pretty().expect("a"), b.to_json_pretty().expect("b"));
        assert_eq!(a.digest().expect("a"), b.digest().expect("b"));
        assert_eq!(a.digest().expect("digest").len(), 64);
    }

    #[test]
    fn duplicate_exports_are_rejected() {
        let mut t = template();
        let err = t
            .add_output(Output {
                logical_id: "Other".into(),
                value: Reference::of("Bucket"),
                description: String::new(),
                export_name: "x-bucket".into(),
            })
            .unwrap_err();
        assert!(err.to_string().contains("x-bucket"), "got: {err}");
    }

    #[test]
    fn yaml_rendering_contains_resources() {
        let yaml = template().to_yaml().expect("yaml");
        assert!(yaml.contains("AWS::S3::Bucket"), "{yaml}");
    }
}
