//! Typed resource declarations.
//!
//! A [`ResourceDeclaration`] is one record in the manifest: a logical id, a
//! provider resource kind, its properties, and the environment-derived
//! deletion policy. Declarations are assembled once per synthesis pass and
//! never change afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use sanders_common::tags::TagSet;
use sanders_common::types::RemovalPolicy;
use serde_json::{Map, Value, json};

/// Metadata key marking a bucket whose objects are removed before deletion.
pub const AUTO_DELETE_OBJECTS_KEY: &str = "sanders:auto-delete-objects";

/// How a resource kind carries tags in its properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagStyle {
    /// `Tags: [{"Key": .., "Value": ..}, ..]`.
    List,
    /// `Tags: {"key": "value", ..}`.
    Map,
    /// The provider cannot tag this kind.
    Untaggable,
}

/// Every provider resource kind the platform declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// Object storage bucket.
    S3Bucket,
    /// Keyed table.
    DynamoDbTable,
    /// Container image repository.
    EcrRepository,
    /// Isolated network.
    Vpc,
    /// Network subnet.
    Subnet,
    /// Subnet route table.
    RouteTable,
    /// Route table to subnet binding.
    SubnetRouteTableAssociation,
    /// Single route entry.
    Route,
    /// Internet gateway.
    InternetGateway,
    /// Internet gateway to network binding.
    VpcGatewayAttachment,
    /// Elastic IP for the NAT gateway.
    ElasticIp,
    /// NAT egress point.
    NatGateway,
    /// Security boundary.
    SecurityGroup,
    /// Trust identity.
    IamRole,
    /// Managed compute pool.
    BatchComputeEnvironment,
    /// Execution queue.
    BatchJobQueue,
    /// Job template.
    BatchJobDefinition,
    /// Execution graph.
    StateMachine,
}

impl ResourceKind {
    /// Provider type name, e.g. `AWS::S3::Bucket`.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::S3Bucket => "AWS::S3::Bucket",
            Self::DynamoDbTable => "AWS::DynamoDB::Table",
            Self::EcrRepository => "AWS::ECR::Repository",
            Self::Vpc => "AWS::EC2::VPC",
            Self::Subnet => "AWS::EC2::Subnet",
            Self::RouteTable => "AWS::EC2::RouteTable",
            Self::SubnetRouteTableAssociation => "AWS::EC2::SubnetRouteTableAssociation",
            Self::Route => "AWS::EC2::Route",
            Self::InternetGateway => "AWS::EC2::InternetGateway",
            Self::VpcGatewayAttachment => "AWS::EC2::VPCGatewayAttachment",
            Self::ElasticIp => "AWS::EC2::EIP",
            Self::NatGateway => "AWS::EC2::NatGateway",
            Self::SecurityGroup => "AWS::EC2::SecurityGroup",
            Self::IamRole => "AWS::IAM::Role",
            Self::BatchComputeEnvironment => "AWS::Batch::ComputeEnvironment",
            Self::BatchJobQueue => "AWS::Batch::JobQueue",
            Self::BatchJobDefinition => "AWS::Batch::JobDefinition",
            Self::StateMachine => "AWS::StepFunctions::StateMachine",
        }
    }

    /// How this kind accepts tags.
    #[must_use]
    pub const fn tag_style(self) -> TagStyle {
        match self {
            Self::SubnetRouteTableAssociation | Self::Route | Self::VpcGatewayAttachment => {
                TagStyle::Untaggable
            }
            Self::BatchComputeEnvironment | Self::BatchJobQueue | Self::BatchJobDefinition => {
                TagStyle::Map
            }
            _ => TagStyle::List,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDeclaration {
    logical_id: String,
    kind: ResourceKind,
    properties: BTreeMap<String, Value>,
    removal_policy: Option<RemovalPolicy>,
    depends_on: BTreeSet<String>,
    metadata: BTreeMap<String, Value>,
    tags: TagSet,
}

impl ResourceDeclaration {
    /// Starts a declaration carrying the scope's tags.
    #[must_use]
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind, tags: TagSet) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            properties: BTreeMap::new(),
            removal_policy: None,
            depends_on: BTreeSet::new(),
            metadata: BTreeMap::new(),
            tags,
        }
    }

    /// Sets one property.
    #[must_use]
    pub fn property(mut self, name: &str, value: Value) -> Self {
        let _ = self.properties.insert(name.to_owned(), value);
        self
    }

    /// Sets the deletion and update-replace policy.
    #[must_use]
    pub const fn removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }

    /// Adds an explicit ordering dependency on another declaration.
    #[must_use]
    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        let _ = self.depends_on.insert(logical_id.into());
        self
    }

    /// Sets one metadata entry.
    #[must_use]
    pub fn metadata(mut self, key: &str, value: Value) -> Self {
        let _ = self.metadata.insert(key.to_owned(), value);
        self
    }

    /// Adds or replaces a tag on this declaration only.
    #[must_use]
    pub fn tag(mut self, key: &str, value: &str) -> Self {
        self.tags = self.tags.with(key, value);
        self
    }

    /// Logical id, unique within the manifest.
    #[must_use]
    pub fn logical_id(&self) -> &str {
        &self.logical_id
    }

    /// Provider resource kind.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Looks up a property.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    /// Deletion policy, when the declaration is stateful.
    #[must_use]
    pub const fn removal(&self) -> Option<RemovalPolicy> {
        self.removal_policy
    }

    /// Explicit ordering dependencies.
    #[must_use]
    pub const fn dependencies(&self) -> &BTreeSet<String> {
        &self.depends_on
    }

    /// Tags declared on this resource, whether or not the kind can carry them.
    #[must_use]
    pub const fn tags(&self) -> &TagSet {
        &self.tags
    }

    /// Every logical id this declaration points at, through property
    /// intrinsics or `DependsOn`.
    #[must_use]
    pub fn references(&self) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        for value in self.properties.values() {
            refs.extend(crate::intrinsic::collect_references(value));
        }
        refs.extend(self.depends_on.iter().cloned());
        refs
    }

    /// Renders the template entry for this declaration.
    #[must_use]
    pub fn to_template_value(&self) -> Value {
        let mut properties: Map<String, Value> = self
            .properties
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if let Some(tags) = self.rendered_tags() {
            let _ = properties.insert("Tags".into(), tags);
        }

        let mut entry = Map::new();
        let _ = entry.insert("Type".into(), json!(self.kind.type_name()));
        if !properties.is_empty() {
            let _ = entry.insert("Properties".into(), Value::Object(properties));
        }
        if let Some(policy) = self.removal_policy {
            let _ = entry.insert("DeletionPolicy".into(), json!(policy.deletion_policy()));
            let _ = entry.insert(
                "UpdateReplacePolicy".into(),
                json!(policy.deletion_policy()),
            );
        }
        if !self.depends_on.is_empty() {
            let _ = entry.insert("DependsOn".into(), json!(self.depends_on));
        }
        if !self.metadata.is_empty() {
            let _ = entry.insert("Metadata".into(), json!(self.metadata));
        }
        Value::Object(entry)
    }

    fn rendered_tags(&self) -> Option<Value> {
        if self.tags.is_empty() {
            return None;
        }
        match self.kind.tag_style() {
            TagStyle::List => Some(Value::Array(
                self.tags
                    .iter()
                    .map(|(k, v)| json!({ "Key": k, "Value": v }))
                    .collect(),
            )),
            TagStyle::Map => Some(Value::Object(
                self.tags
                    .iter()
                    .map(|(k, v)| (k.to_owned(), json!(v)))
                    .collect(),
            )),
            TagStyle::Untaggable => None,
        }
    }
}
