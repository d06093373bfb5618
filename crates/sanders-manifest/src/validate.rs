//! Static validation of an assembled template.
//!
//! Checks for dangling references, missing mandatory tags, and dependency
//! cycles before the manifest is emitted.

use sanders_common::error::{InfraError, Result};

use crate::graph::DependencyGraph;
use crate::template::Template;

/// Validates a template for referential and structural correctness.
///
/// # Checks performed
///
/// 1. Every `Ref`, `Fn::GetAtt` and `DependsOn` target is declared.
/// 2. Every output references a declared resource and has an export name.
/// 3. Every declaration carries the `Environment` and `Service` tags.
/// 4. The dependency graph is acyclic.
///
/// # Errors
///
/// Returns an error if any check fails.
pub fn validate(template: &Template) -> Result<()> {
    tracing::info!(
        resources = template.resources().len(),
        outputs = template.outputs().len(),
        "validating manifest"
    );
    check_resource_references(template)?;
    check_output_references(template)?;
    check_mandatory_tags(template)?;
    check_acyclic(template)?;
    Ok(())
}

fn check_resource_references(template: &Template) -> Result<()> {
    let resources = template.resources();
    for declaration in resources.iter() {
        for target in declaration.references() {
            if !resources.contains(&target) {
                return Err(InfraError::DanglingReference {
                    from: declaration.logical_id().to_owned(),
                    target,
                });
            }
        }
    }
    Ok(())
}

fn check_output_references(template: &Template) -> Result<()> {
    for (id, output) in template.outputs() {
        if output.export_name.trim().is_empty() {
            return Err(InfraError::config(format!(
                "output \"{id}\" has no export name"
            )));
        }
        for target in crate::intrinsic::collect_references(&output.value.to_value()) {
            if !template.resources().contains(&target) {
                return Err(InfraError::DanglingReference {
                    from: id.clone(),
                    target,
                });
            }
        }
    }
    Ok(())
}

fn check_mandatory_tags(template: &Template) -> Result<()> {
    for declaration in template.resources().iter() {
        if !declaration.tags().has_mandatory() {
            return Err(InfraError::config(format!(
                "resource \"{}\" is missing the Environment or Service tag",
                declaration.logical_id()
            )));
        }
    }
    Ok(())
}

fn check_acyclic(template: &Template) -> Result<()> {
    let _ = DependencyGraph::from_resources(template.resources()).resolve_order()?;
    Ok(())
}
