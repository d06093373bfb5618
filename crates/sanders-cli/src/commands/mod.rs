//! CLI command definitions and dispatch.

pub mod outputs;
pub mod plan;
pub mod synth;
pub mod validate;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sanders_common::config::{ConfigOverrides, PlatformConfig};
use sanders_common::constants::{BIN_NAME, ENV_ACCOUNT, ENV_ENVIRONMENT, ENV_REGION};

/// Sanders: infrastructure manifest for the customer platform.
#[derive(Parser, Debug)]
#[command(name = BIN_NAME, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// Deployment context shared by every subcommand.
    #[command(flatten)]
    pub context: ContextArgs,
}

/// Deployment context. Flags win over environment variables, which win over
/// the configuration file.
#[derive(Args, Debug, Default)]
pub struct ContextArgs {
    /// YAML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Deployment environment (dev or prod).
    #[arg(short, long, global = true, env = ENV_ENVIRONMENT)]
    pub environment: Option<String>,

    /// Target account id.
    #[arg(long, global = true, env = ENV_ACCOUNT)]
    pub account: Option<String>,

    /// Target region.
    #[arg(long, global = true, env = ENV_REGION)]
    pub region: Option<String>,

    /// Override the stack name.
    #[arg(long, global = true)]
    pub stack_name: Option<String>,

    /// Extra tag applied to every resource, as KEY=VALUE. Repeatable.
    #[arg(long = "tag", global = true, value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,
}

impl ContextArgs {
    /// Layers the configuration file under the flags and resolves the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be loaded or the configuration is
    /// invalid.
    pub fn resolve(&self) -> anyhow::Result<PlatformConfig> {
        let file = match &self.config {
            Some(path) => ConfigOverrides::load(path)?,
            None => ConfigOverrides::default(),
        };
        let flags = ConfigOverrides {
            environment: self.environment.clone(),
            account: self.account.clone(),
            region: self.region.clone(),
            stack_name: self.stack_name.clone(),
            description: None,
            tags: self.tags.iter().cloned().collect(),
        };
        let config = file.layer(flags).resolve()?;
        tracing::debug!(
            environment = %config.environment,
            account = config.account.as_str(),
            region = config.region.as_str(),
            "resolved deployment context"
        );
        Ok(config)
    }
}

fn parse_tag(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got \"{raw}\""))?;
    if key.trim().is_empty() {
        return Err(format!("empty tag key in \"{raw}\""));
    }
    Ok((key.trim().to_owned(), value.to_owned()))
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize the cloud assembly (template plus manifest).
    Synth(synth::SynthArgs),
    /// List resources in the order they would be created.
    Plan(plan::PlanArgs),
    /// List the cross-stack outputs and their export names.
    Outputs(outputs::OutputsArgs),
    /// Validate configuration and manifest without writing anything.
    Validate(validate::ValidateArgs),
}

/// Dispatches the parsed CLI command to its handler.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn execute(cli: Cli) -> anyhow::Result<()> {
    let config = cli.context.resolve()?;
    match cli.command {
        Command::Synth(args) => synth::execute(args, &config),
        Command::Plan(args) => plan::execute(args, &config),
        Command::Outputs(args) => outputs::execute(args, &config),
        Command::Validate(args) => validate::execute(args, &config),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use sanders_common::types::Environment;

    use super::*;

    #[test]
    fn command_is_named_after_the_binary() {
        use clap::CommandFactory;

        let command = Cli::command();
        assert_eq!(command.get_name(), BIN_NAME);
        command.debug_assert();
    }

    #[test]
    fn parse_tag_splits_on_first_equals() {
        assert_eq!(
            parse_tag("Owner=data=team"),
            Ok(("Owner".to_owned(), "data=team".to_owned()))
        );
        assert!(parse_tag("novalue").is_err());
        assert!(parse_tag("=x").is_err());
    }

    #[test]
    fn cli_parses_global_context_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sanders",
            "plan",
            "--environment",
            "prod",
            "--account",
            "123456789012",
            "--tag",
            "Team=data",
        ])
        .expect("parse");
        assert!(matches!(cli.command, Command::Plan(_)));
        let config = cli.context.resolve().expect("resolve");
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.extra_tags.get("Team"), Some("data"));
    }

    #[test]
    fn flags_win_over_config_file() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        writeln!(file, "environment: prod\naccount: \"111111111111\"\nregion: us-east-1").expect("write");
        let context = ContextArgs {
            config: Some(file.path().to_path_buf()),
            account: Some("222222222222".into()),
            ..ContextArgs::default()
        };
        let config = context.resolve().expect("resolve");
        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.account.as_str(), "222222222222");
        assert_eq!(config.region.as_str(), "us-east-1");
    }
}
