//! A synthesized stack: the configuration it was built from plus its
//! template.

use sanders_common::config::PlatformConfig;
use sanders_common::error::Result;
use sanders_common::types::RemovalPolicy;
use sanders_constructs::policy::{WildcardGrant, wildcard_grants};
use sanders_manifest::graph::DependencyGraph;
use sanders_manifest::resource::ResourceKind;
use sanders_manifest::template::Template;

/// One line of a deployment plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    /// Logical id.
    pub logical_id: String,
    /// Resource kind.
    pub kind: ResourceKind,
    /// Retention on stack deletion, for stateful resources.
    pub removal: Option<RemovalPolicy>,
    /// Logical ids this resource waits for.
    pub depends_on: Vec<String>,
}

/// The result of one synthesis pass.
#[derive(Debug, Clone)]
pub struct Stack {
    config: PlatformConfig,
    template: Template,
}

impl Stack {
    pub(crate) const fn new(config: PlatformConfig, template: Template) -> Self {
        Self { config, template }
    }

    /// Deployed stack name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.config.stack_name
    }

    /// Configuration the stack was synthesized from.
    #[must_use]
    pub const fn config(&self) -> &PlatformConfig {
        &self.config
    }

    /// The emitted template.
    #[must_use]
    pub const fn template(&self) -> &Template {
        &self.template
    }

    /// `aws://{account}/{region}`.
    #[must_use]
    pub fn target(&self) -> String {
        format!(
            "aws://{}/{}",
            self.config.account.as_str(),
            self.config.region.as_str()
        )
    }

    /// Every resource in the order a provisioning engine would create it.
    ///
    /// # Errors
    ///
    /// Returns an error if the dependency graph contains a cycle.
    pub fn plan(&self) -> Result<Vec<PlanEntry>> {
        let resources = self.template.resources();
        let graph = DependencyGraph::from_resources(resources);
        let order = graph.resolve_order()?;
        Ok(order
            .into_iter()
            .filter_map(|id| {
                let declaration = resources.get(&id)?;
                Some(PlanEntry {
                    depends_on: graph.dependencies_of(&id),
                    kind: declaration.kind(),
                    removal: declaration.removal(),
                    logical_id: id,
                })
            })
            .collect())
    }

    /// Inline grants scoped to every resource, in role logical-id order.
    #[must_use]
    pub fn wildcard_grants(&self) -> Vec<WildcardGrant> {
        self.template
            .resources()
            .of_kind(ResourceKind::IamRole)
            .filter_map(|role| {
                role.get("Policies")
                    .map(|policies| wildcard_grants(role.logical_id(), policies))
            })
            .flatten()
            .collect()
    }

    /// Content digest of the template.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be serialized.
    pub fn digest(&self) -> Result<String> {
        self.template.digest()
    }
}
