//! `sanders plan`: Display resources in creation order.

use clap::Args;
use sanders_common::config::PlatformConfig;
use sanders_platform::platform::synthesize;

use crate::output::{format_removal, pad, rule};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Also list each resource's direct dependencies.
    #[arg(long)]
    pub dependencies: bool,
}

/// Executes the `plan` command.
///
/// Synthesizes the stack, builds its dependency graph, and prints every
/// resource in topological order with its kind and retention, then any grant scoped to every resource.
///
/// # Errors
///
/// Returns an error if synthesis or graph resolution fails.
pub fn execute(args: PlanArgs, config: &PlatformConfig) -> anyhow::Result<()> {
    let stack = synthesize(config)?;
    let plan = stack.plan()?;
    let width = plan.iter().map(|e| e.logical_id.len()).max().unwrap_or(0);

    println!("Deployment Plan for: {} ({})", stack.name(), stack.target());
    println!("{}", rule(35));
    println!();

    for entry in &plan {
        println!(
            "  + {}  {}  [{}]",
            pad(&entry.logical_id, width),
            entry.kind.type_name(),
            format_removal(entry.removal)
        );
        if args.dependencies && !entry.depends_on.is_empty() {
            println!("      after: {}", entry.depends_on.join(", "));
        }
    }

    let grants = stack.wildcard_grants();
    if !grants.is_empty() {
        println!();
        println!("  wildcard grants:");
        for grant in &grants {
            println!("    ! {} ({}): {}", grant.role, grant.policy, grant.actions.join(", "));
        }
    }

    println!();
    println!("  {} resource(s) will be declared.", plan.len());
    println!("  {} output(s) will be exported.", stack.template().outputs().len());
    Ok(())
}
