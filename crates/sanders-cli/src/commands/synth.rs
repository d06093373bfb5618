//! `sanders synth`: Synthesize the cloud assembly.

use std::path::PathBuf;

use clap::Args;
use sanders_common::config::PlatformConfig;
use sanders_common::constants::DEFAULT_OUTPUT_DIR;
use sanders_platform::assembly::{TemplateFormat, write_assembly};
use sanders_platform::platform::synthesize;

/// Arguments for the `synth` command.
#[derive(Args, Debug)]
pub struct SynthArgs {
    /// Assembly output directory.
    #[arg(short, long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Print the template to stdout instead of writing the assembly.
    #[arg(long)]
    pub stdout: bool,

    /// Template format (json or yaml).
    #[arg(long, default_value = "json")]
    pub format: TemplateFormat,
}

/// Executes the `synth` command.
///
/// The assembly is only written once synthesis and validation have both
/// succeeded.
///
/// # Errors
///
/// Returns an error if synthesis fails or the assembly cannot be written.
pub fn execute(args: SynthArgs, config: &PlatformConfig) -> anyhow::Result<()> {
    tracing::info!(stack = %config.stack_name, format = %args.format, "synthesizing");
    let stack = synthesize(config)?;

    if args.stdout {
        print!("{}", args.format.render(&stack)?);
        return Ok(());
    }

    let assembly = write_assembly(&stack, &args.output, args.format)?;
    println!("Synthesized {} ({})", stack.name(), stack.target());
    println!("  template: {}", assembly.template_path.display());
    println!("  manifest: {}", assembly.manifest_path.display());
    println!("  resources: {}", stack.template().resources().len());
    println!("  digest: sha256:{}", assembly.digest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use sanders_common::types::{AccountId, Environment, Region};

    use super::*;

    #[test]
    fn writes_assembly_into_output_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = PlatformConfig::new(
            Environment::Dev,
            AccountId::parse("123456789012").expect("account"),
            Region::default(),
        );
        let args = SynthArgs {
            output: dir.path().join("out"),
            stdout: false,
            format: TemplateFormat::Json,
        };
        execute(args, &config).expect("synth");
        assert!(dir.path().join("out/manifest.json").is_file());
        assert!(
            dir.path()
                .join("out/SandersCustomerPlatformStack-dev.template.json")
                .is_file()
        );
    }
}
