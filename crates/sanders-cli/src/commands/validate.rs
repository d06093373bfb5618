//! `sanders validate`: Validate configuration and manifest.

use clap::Args;
use sanders_common::config::PlatformConfig;
use sanders_platform::platform::synthesize;

/// Arguments for the `validate` command.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also check that a second synthesis pass yields the same digest.
    #[arg(long)]
    pub idempotence: bool,
}

/// Executes the `validate` command.
///
/// Synthesis already validates the configuration, every reference, the
/// mandatory tags and the dependency graph; nothing is written.
///
/// # Errors
///
/// Returns an error if any check fails.
pub fn execute(args: ValidateArgs, config: &PlatformConfig) -> anyhow::Result<()> {
    let stack = synthesize(config)?;
    let digest = stack.digest()?;
    if args.idempotence {
        let again = synthesize(config)?.digest()?;
        if again != digest {
            anyhow::bail!("synthesis is not deterministic: {digest} != {again}");
        }
    }
    println!(
        "{}: valid ({} resources, {} outputs)",
        stack.name(),
        stack.template().resources().len(),
        stack.template().outputs().len()
    );
    println!("digest: sha256:{digest}");
    Ok(())
}
